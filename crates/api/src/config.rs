use std::time::Duration;

use sensorboard_core::placement::{GridSpec, DEFAULT_COLS, DEFAULT_MAX_SCAN_ROWS};
use sensorboard_sync::persistence::DEFAULT_AUTOSAVE_DELAY;
use sensorboard_sync::session::DEFAULT_SESSION_IDLE;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on the post-shutdown flush of open dashboards (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Quiet period before an edited dashboard is written back.
    pub autosave_delay: Duration,
    /// Open dashboards untouched this long with no live viewer are flushed
    /// and closed.
    pub session_idle: Duration,
    /// Grid used for widget placement.
    pub grid: GridSpec,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    /// | `AUTOSAVE_DELAY_MS`     | `1000`                  |
    /// | `SESSION_IDLE_SECS`     | `300`                   |
    /// | `GRID_COLS`             | `12`                    |
    /// | `GRID_MAX_SCAN_ROWS`    | `20`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let autosave_delay_ms: u64 = std::env::var("AUTOSAVE_DELAY_MS")
            .map(|v| v.parse().expect("AUTOSAVE_DELAY_MS must be a valid u64"))
            .unwrap_or(DEFAULT_AUTOSAVE_DELAY.as_millis() as u64);

        let session_idle_secs: u64 = std::env::var("SESSION_IDLE_SECS")
            .map(|v| v.parse().expect("SESSION_IDLE_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_SESSION_IDLE.as_secs());

        let cols: u32 = std::env::var("GRID_COLS")
            .map(|v| v.parse().expect("GRID_COLS must be a valid u32"))
            .unwrap_or(DEFAULT_COLS);
        assert!(cols > 0, "GRID_COLS must be positive");

        let max_scan_rows: u32 = std::env::var("GRID_MAX_SCAN_ROWS")
            .map(|v| v.parse().expect("GRID_MAX_SCAN_ROWS must be a valid u32"))
            .unwrap_or(DEFAULT_MAX_SCAN_ROWS);

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            autosave_delay: Duration::from_millis(autosave_delay_ms),
            session_idle: Duration::from_secs(session_idle_secs),
            grid: GridSpec { cols, max_scan_rows },
            jwt,
        }
    }
}
