//! Server configuration loaded from environment variables.

use std::time::Duration;

use domain::DEFAULT_LEASE;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
const DEFAULT_REDIS_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3_600;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `REDIS_URL`: key-value store URL (default: `"redis://127.0.0.1:6379/0"`)
/// - `REDIS_TIMEOUT_MS`: per-operation timeout (default: `5000`)
/// - `CART_CLEANUP_INTERVAL_SECS`: period of the expiry sweep (default: `3600`)
/// - `CART_LEASE_SECS`: lease given to a cart on every save (default: 30 days)
///
/// Unparseable or zero numeric values fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub redis_url: String,
    pub redis_timeout: Duration,
    pub cleanup_interval: Duration,
    pub cart_lease: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |name: &str, default: u64| {
            lookup(name)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };

        Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            redis_timeout: Duration::from_millis(secs(
                "REDIS_TIMEOUT_MS",
                DEFAULT_REDIS_TIMEOUT_MS,
            )),
            cleanup_interval: Duration::from_secs(secs(
                "CART_CLEANUP_INTERVAL_SECS",
                DEFAULT_CLEANUP_INTERVAL_SECS,
            )),
            cart_lease: Duration::from_secs(secs("CART_LEASE_SECS", DEFAULT_LEASE.as_secs())),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
