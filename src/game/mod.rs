//! Game simulation modules

pub mod combat;
pub mod map;
pub mod physics;
pub mod player;
pub mod registry;
pub mod room;
pub mod scheduler;
pub mod snapshot;

pub use registry::{RoomError, RoomRegistry};
pub use scheduler::Scheduler;
