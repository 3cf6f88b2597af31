//! Application state shared across routes, sessions and the scheduler

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::game::RoomRegistry;
use crate::store::MapCatalog;
use crate::ws::hub::ConnectionHub;

/// Shared application state. Everything the server mutates lives here and is passed
/// explicitly; there are no process globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RoomRegistry>,
    pub hub: Arc<ConnectionHub>,
    pub maps: Arc<MapCatalog>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(RoomRegistry::new(config.max_players_per_room));
        let maps = Arc::new(MapCatalog::new(config.maps_dir.clone()));

        Self {
            config: Arc::new(config),
            registry,
            hub: Arc::new(ConnectionHub::new()),
            maps,
            started_at: Instant::now(),
        }
    }
}
