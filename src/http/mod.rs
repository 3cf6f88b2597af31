//! HTTP surface: map catalogue, health and the WebSocket upgrade

pub mod routes;

pub use routes::build_router;
