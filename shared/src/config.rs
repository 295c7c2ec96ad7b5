use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::TtlMs;

pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub data_dir: String,
    pub cache: CacheSettings,
}

/// Tunables for the two-tier API cache and the batch resolver
#[derive(Clone, Debug)]
pub struct CacheSettings {
    pub memory_items: usize,
    pub default_ttl: TtlMs,
    pub cleanup_interval: Duration,
    pub batch_max_in_flight: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            memory_items: CacheSettings::DEFAULT_MEMORY_ITEMS,
            default_ttl: TtlMs(CacheSettings::DEFAULT_TTL_MS),
            cleanup_interval: Duration::from_secs(CacheSettings::DEFAULT_CLEANUP_INTERVAL_SECS),
            batch_max_in_flight: None,
        }
    }
}

impl CacheSettings {
    pub const DEFAULT_MEMORY_ITEMS: usize = 100;
    pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
    pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 10 * 60;

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_items: env_or("AGORA_CACHE_MEMORY_ITEMS", defaults.memory_items),
            default_ttl: TtlMs(env_or("AGORA_CACHE_DEFAULT_TTL_MS", defaults.default_ttl.0)),
            cleanup_interval: Duration::from_secs(env_or(
                "AGORA_CACHE_CLEANUP_INTERVAL_SECS",
                Self::DEFAULT_CLEANUP_INTERVAL_SECS,
            )),
            batch_max_in_flight: std::env::var("AGORA_BATCH_MAX_IN_FLIGHT")
                .ok()
                .and_then(|raw| match raw.parse::<usize>() {
                    Ok(0) | Err(_) => {
                        warn!("Ignoring invalid AGORA_BATCH_MAX_IN_FLIGHT={:?}", raw);
                        None
                    }
                    Ok(n) => Some(n),
                }),
        }
    }
}

impl Config {
    const DEFAULT_HOST: &str = "localhost";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_DATA_DIR: &str = "./data";

    pub fn from_env() -> Self {
        Self {
            host: std::env::var("AGORA_HOST").unwrap_or_else(|_| Self::DEFAULT_HOST.to_string()),
            http_port: env_or("AGORA_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            data_dir: std::env::var("AGORA_DATA_DIR")
                .unwrap_or_else(|_| Self::DEFAULT_DATA_DIR.to_string()),
            cache: CacheSettings::from_env(),
        }
    }

    /// Location of the durable cache tier
    pub fn cache_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("api_cache.sled")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Invalid value {:?} for {}, using default {:?}", raw, name, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_settings_defaults() {
        let settings = CacheSettings::default();
        assert_eq!(settings.memory_items, 100);
        assert_eq!(settings.default_ttl, TtlMs(300_000));
        assert_eq!(settings.cleanup_interval, Duration::from_secs(600));
        assert!(settings.batch_max_in_flight.is_none());
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        // Unique names so parallel tests never race on the same variable
        unsafe {
            std::env::set_var("AGORA_TEST_ENV_OR_GARBAGE", "not-a-number");
            std::env::set_var("AGORA_TEST_ENV_OR_VALID", " 42 ");
        }
        assert_eq!(env_or("AGORA_TEST_ENV_OR_GARBAGE", 7u64), 7);
        assert_eq!(env_or("AGORA_TEST_ENV_OR_VALID", 7u64), 42);
        assert_eq!(env_or("AGORA_TEST_ENV_OR_MISSING", 9usize), 9);
    }

    #[test]
    fn test_cache_db_path_is_under_data_dir() {
        let config = Config {
            host: "localhost".into(),
            http_port: 8080,
            data_dir: "/tmp/agora".into(),
            cache: CacheSettings::default(),
        };
        assert_eq!(config.cache_db_path(), PathBuf::from("/tmp/agora/api_cache.sled"));
        assert_eq!(config.bind_addr(), "localhost:8080");
    }
}
