//! Server configuration
//!
//! Configuration is loaded from environment variables; per-request connection
//! settings arrive inside each operation's payload instead.

use std::env;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Session registry configuration
    pub session: SessionSettings,
}

/// Session-registry configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// TTL applied when a request asks for a timeout of zero or less
    pub default_timeout: Duration,
    /// Interval between expired-session sweeps
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            session: SessionSettings::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(300), // 5 minutes
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }
        if let Ok(val) = env::var("SESSION_DEFAULT_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.session.default_timeout = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("SESSION_SWEEP_INTERVAL_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.session.sweep_interval = Duration::from_secs(secs);
        }

        config
    }
}
