//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::rooms::RoomManager;
use crate::util::rate_limit::RateLimitConfig;
use crate::util::time::{SharedClock, SystemClock};
use crate::ws::ConnectionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomManager>,
    pub connections: Arc<ConnectionRegistry>,
    pub rate_limit: RateLimitConfig,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, SystemClock::shared())
    }

    pub fn with_clock(config: Config, clock: SharedClock) -> Self {
        let rooms = Arc::new(RoomManager::new(config.room_settings(), clock));
        let rate_limit = config.rate_limit();

        Self {
            config: Arc::new(config),
            rooms,
            connections: Arc::new(ConnectionRegistry::new()),
            rate_limit,
        }
    }
}
