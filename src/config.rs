// config.rs
use std::{str::FromStr, time::Duration};

use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreBackendKind {
    Memory,
    Postgres,
    Redis,
}

impl FromStr for StoreBackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackendKind::Memory),
            "postgres" | "postgresql" => Ok(StoreBackendKind::Postgres),
            "redis" => Ok(StoreBackendKind::Redis),
            other => Err(format!("unknown STORE_BACKEND `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store_backend: StoreBackendKind,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub store_namespace: String,
    // Fee settings
    pub siwes_fee: i64,
    pub payment_delay: Duration,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8000,
            store_backend: StoreBackendKind::Memory,
            database_url: None,
            redis_url: None,
            store_namespace: "siwes".to_string(),
            siwes_fee: 7000,
            payment_delay: Duration::from_millis(2000),
            log_level: LevelFilter::DEBUG,
        }
    }
}

impl Config {
    pub fn init() -> Config {
        let defaults = Config::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);

        let store_backend = std::env::var("STORE_BACKEND")
            .ok()
            .and_then(|raw| match raw.parse::<StoreBackendKind>() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    tracing::warn!("{}; falling back to the memory backend", e);
                    None
                }
            })
            .unwrap_or(defaults.store_backend);

        let database_url = std::env::var("DATABASE_URL").ok();
        let redis_url = std::env::var("REDIS_URL").ok();
        let store_namespace = std::env::var("STORE_NAMESPACE")
            .unwrap_or_else(|_| defaults.store_namespace.clone());

        let siwes_fee = env_parse("SIWES_FEE").unwrap_or(defaults.siwes_fee);
        let payment_delay = env_parse::<u64>("PAYMENT_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.payment_delay);

        let log_level = env_parse::<LevelFilter>("LOG_LEVEL").unwrap_or(defaults.log_level);

        Config {
            port,
            store_backend,
            database_url,
            redis_url,
            store_namespace,
            siwes_fee,
            payment_delay,
            log_level,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<T>().ok())
}
