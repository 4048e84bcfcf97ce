//! Configuration module for fleetwatch.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

use chrono_tz::Tz;

/// Zone used for uptime day boundaries unless overridden. The deployment
/// this tool reports on runs on GMT+7 wall clocks.
const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Bangkok;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "fleetwatch.db")
    pub db_path: String,
    /// TTL for cached list pages (default: 30s)
    pub cache_ttl: Duration,
    /// Zone in which uptime day boundaries are interpreted
    pub timezone: Tz,
    /// Interval between health sweeps (default: 10s)
    pub check_interval: Duration,
    /// Per-probe timeout within a sweep (default: 5s)
    pub probe_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "fleetwatch.db".to_string(),
            cache_ttl: Duration::from_secs(30),
            timezone: DEFAULT_TIMEZONE,
            check_interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FLEETWATCH_HTTP_PORT`: HTTP port (default: 8080)
    /// - `FLEETWATCH_DB_PATH`: Database file path (default: "fleetwatch.db")
    /// - `FLEETWATCH_CACHE_TTL_SECS`: List cache TTL in seconds (default: 30)
    /// - `FLEETWATCH_TIMEZONE`: IANA zone for uptime days (default: "Asia/Bangkok")
    /// - `FLEETWATCH_CHECK_INTERVAL_SECS`: Health sweep interval (default: 10)
    /// - `FLEETWATCH_PROBE_TIMEOUT_SECS`: Per-probe timeout (default: 5)
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("FLEETWATCH_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(db_path) = env::var("FLEETWATCH_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Ok(ttl_str) = env::var("FLEETWATCH_CACHE_TTL_SECS") {
            if let Ok(secs) = ttl_str.parse() {
                cfg.cache_ttl = Duration::from_secs(secs);
            }
        }

        if let Ok(tz_str) = env::var("FLEETWATCH_TIMEZONE") {
            match tz_str.parse() {
                Ok(tz) => cfg.timezone = tz,
                Err(_) => tracing::warn!(zone = %tz_str, "unknown timezone; keeping default"),
            }
        }

        if let Ok(interval_str) = env::var("FLEETWATCH_CHECK_INTERVAL_SECS") {
            if let Ok(secs) = interval_str.parse() {
                cfg.check_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(timeout_str) = env::var("FLEETWATCH_PROBE_TIMEOUT_SECS") {
            if let Ok(secs) = timeout_str.parse() {
                cfg.probe_timeout = Duration::from_secs(secs);
            }
        }

        cfg
    }
}
