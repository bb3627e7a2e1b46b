use wordloop_core::sync_plan::DEFAULT_SYNC_TOLERANCE_MINUTES;

/// Default period of the background sync sweep, in seconds.
pub const DEFAULT_SYNC_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background jobs, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Drift tolerance for explicit folder syncs, in minutes (default: `60`).
    /// Auto-sync and sweeps use each user's own setting instead.
    pub sync_tolerance_minutes: i64,
    /// Period of the background sync sweep; `0` disables it.
    pub sync_sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `3000`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                       |
    /// | `SYNC_TOLERANCE_MINUTES`   | `60`                       |
    /// | `SYNC_SWEEP_INTERVAL_SECS` | `3600`                     |
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

        let sync_tolerance_minutes: i64 = std::env::var("SYNC_TOLERANCE_MINUTES")
            .map(|v| v.parse().expect("SYNC_TOLERANCE_MINUTES must be a valid i64"))
            .unwrap_or(DEFAULT_SYNC_TOLERANCE_MINUTES);
        assert!(
            sync_tolerance_minutes > 0,
            "SYNC_TOLERANCE_MINUTES must be positive"
        );

        let sync_sweep_interval_secs: u64 = std::env::var("SYNC_SWEEP_INTERVAL_SECS")
            .map(|v| v.parse().expect("SYNC_SWEEP_INTERVAL_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_SYNC_SWEEP_INTERVAL_SECS);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            sync_tolerance_minutes,
            sync_sweep_interval_secs,
        }
    }
}
