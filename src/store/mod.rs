//! Data stores

pub mod maps;

pub use maps::{MapCatalog, MapError, MapListing};
