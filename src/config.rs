use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::Semaphore;

/// Server settings, read from `HOTELBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub catalog_path: PathBuf,
    pub max_connections: usize,
    pub metrics_port: Option<u16>,
    pub drain_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
            catalog_path: PathBuf::from("mock-data/hotels-data.json"),
            max_connections: 256,
            metrics_port: None,
            drain_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.var, self.value)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let parsed = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            match lookup(var) {
                None => Ok(None),
                Some(value) => value
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| ConfigError { var, value }),
            }
        };
        let port = |var: &'static str| -> Result<Option<u16>, ConfigError> {
            match parsed(var)? {
                None => Ok(None),
                Some(p) => u16::try_from(p).map(Some).map_err(|_| ConfigError {
                    var,
                    value: p.to_string(),
                }),
            }
        };

        Ok(Self {
            bind: lookup("HOTELBOOK_BIND").unwrap_or(defaults.bind),
            port: port("HOTELBOOK_PORT")?.unwrap_or(defaults.port),
            catalog_path: lookup("HOTELBOOK_CATALOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_path),
            max_connections: match parsed("HOTELBOOK_MAX_CONNECTIONS")? {
                None => defaults.max_connections,
                Some(n) => usize::try_from(n)
                    .ok()
                    .filter(|n| (1..=Semaphore::MAX_PERMITS).contains(n))
                    .ok_or_else(|| ConfigError {
                        var: "HOTELBOOK_MAX_CONNECTIONS",
                        value: n.to_string(),
                    })?,
            },
            metrics_port: port("HOTELBOOK_METRICS_PORT")?,
            drain_timeout: parsed("HOTELBOOK_DRAIN_TIMEOUT_SECS")?
                .map_or(defaults.drain_timeout, Duration::from_secs),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
