use std::env;
use std::num::NonZeroU32;
use std::time::Duration;
use governor::Quota;

use crate::models::status::DEFAULT_PORT;

#[derive(Clone, Debug)]
pub struct Config {
    // HTTP listener
    pub bind_address: String,
    pub port: u16,

    // Probe target
    pub mc_server_host: String,
    pub mc_server_port: u16,
    pub probe_timeout_ms: u64,
    pub allow_target_override: bool,

    // Caching and rate limiting
    pub status_cache_secs: u64,
    pub status_period_secs: u64,
    pub status_burst_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            mc_server_host: "localhost".to_string(),
            mc_server_port: DEFAULT_PORT,
            probe_timeout_ms: 3000,
            allow_target_override: false,
            status_cache_secs: 10,
            status_period_secs: 1,
            status_burst_limit: 30,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: env_or("PORT", defaults.port),

            mc_server_host: env::var("MC_SERVER_HOST").unwrap_or(defaults.mc_server_host),
            mc_server_port: env_or("MC_SERVER_PORT", defaults.mc_server_port),
            probe_timeout_ms: env_or("PROBE_TIMEOUT_MS", defaults.probe_timeout_ms),
            allow_target_override: env_or("ALLOW_TARGET_OVERRIDE", defaults.allow_target_override),

            status_cache_secs: env_or("STATUS_CACHE_SECS", defaults.status_cache_secs),
            status_period_secs: env_or("STATUS_PERIOD_SECS", defaults.status_period_secs),
            status_burst_limit: env_or("STATUS_BURST_LIMIT", defaults.status_burst_limit),
        }
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(1))
    }

    pub fn status_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.status_cache_secs)
    }

    pub fn status_quota(&self) -> Quota {
        let period = Duration::from_secs(self.status_period_secs.max(1));
        let burst = NonZeroU32::new(self.status_burst_limit).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst)
    }
}
