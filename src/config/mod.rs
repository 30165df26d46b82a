//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::rooms::RoomSettings;
use crate::util::rate_limit::{RateLimitConfig, DEFAULT_MESSAGES_PER_SECOND};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Origins allowed to open a WebSocket; empty or `*` allows any
    pub allowed_origins: Vec<String>,
    /// Inbound messages per connection per second (0 disables)
    pub rate_limit_per_sec: u32,
    pub room_max_age: Duration,
    pub heartbeat_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let rooms = RoomSettings::default();
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            allowed_origins: Vec::new(),
            rate_limit_per_sec: DEFAULT_MESSAGES_PER_SECOND,
            room_max_age: rooms.max_room_age,
            heartbeat_timeout: rooms.heartbeat_timeout,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match env::var("PORT") {
            Ok(port) => format!("0.0.0.0:{}", port),
            Err(_) => env::var("SERVER_ADDR").unwrap_or_else(|_| defaults.server_addr.to_string()),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),

            rate_limit_per_sec: parse_var("RATE_LIMIT_PER_SEC")?
                .unwrap_or(defaults.rate_limit_per_sec),

            room_max_age: parse_var("ROOM_MAX_AGE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.room_max_age),
            heartbeat_timeout: parse_var("HEARTBEAT_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_timeout),
            sweep_interval: parse_var::<u64>("SWEEP_INTERVAL_SECS")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        })
    }

    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            max_room_age: self.room_max_age,
            heartbeat_timeout: self.heartbeat_timeout,
            ..RoomSettings::default()
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            messages_per_second: self.rate_limit_per_sec,
        }
    }

    /// Browser upgrades carry an Origin; other clients may omit it
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return true;
        };
        self.allowed_origins.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_origins(origins: &[&str]) -> Config {
        Config {
            allowed_origins: origins.iter().map(|s| s.to_string()).collect(),
            ..Config::default()
        }
    }

    #[test]
    fn empty_or_wildcard_list_allows_any_origin() {
        assert!(Config::default().origin_allowed(Some("https://evil.example")));
        assert!(with_origins(&["*"]).origin_allowed(Some("https://evil.example")));
    }

    #[test]
    fn listed_origins_only() {
        let config = with_origins(&["https://hockey.example", "http://localhost:5173"]);
        assert!(config.origin_allowed(Some("https://hockey.example")));
        assert!(config.origin_allowed(Some("http://localhost:5173")));
        assert!(!config.origin_allowed(Some("https://other.example")));
        assert!(config.origin_allowed(None));
    }

    #[test]
    fn origin_list_parsing_trims_entries() {
        assert_eq!(
            parse_origins(" https://a.example/ ,,http://b.example "),
            vec!["https://a.example", "http://b.example"]
        );
    }

    #[test]
    fn projects_component_settings() {
        let config = Config {
            rate_limit_per_sec: 5,
            heartbeat_timeout: Duration::from_secs(10),
            ..Config::default()
        };
        assert_eq!(config.rate_limit().messages_per_second, 5);
        let rooms = config.room_settings();
        assert_eq!(rooms.heartbeat_timeout, Duration::from_secs(10));
        assert_eq!(rooms.max_room_age, Duration::from_secs(3600));
        assert_eq!(rooms.default_score_target, 7);
    }
}
