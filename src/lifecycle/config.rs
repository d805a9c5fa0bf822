//! Process configuration from environment variables.
//!
//! | Variable             | Required | Default | Meaning                         |
//! |----------------------|----------|---------|---------------------------------|
//! | `PORT`               | yes      |         | Listen port on `0.0.0.0`        |
//! | `REQUEST_TIMEOUT_MS` | no       | `10000` | Per-request store deadline      |
//! | `STORE_BUFFER`       | no       | `64`    | Store actor mailbox size        |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_STORE_BUFFER: usize = 64;

/// Errors raised while reading the environment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Every required variable that is unset or empty, reported together.
    #[error("missing environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A variable is set but does not parse.
    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub request_timeout: Duration,
    pub store_buffer: usize,
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, so tests need not touch the real environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let port = get("PORT");
        if port.is_none() {
            missing.push("PORT".to_string());
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let port = parse("PORT", port)?.unwrap_or_default();
        let request_timeout = parse::<u64>("REQUEST_TIMEOUT_MS", get("REQUEST_TIMEOUT_MS"))?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let store_buffer = match parse::<usize>("STORE_BUFFER", get("STORE_BUFFER"))? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BUFFER".into(),
                    value: "0".into(),
                })
            }
            Some(n) => n,
            None => DEFAULT_STORE_BUFFER,
        };

        Ok(Self {
            port,
            request_timeout,
            store_buffer,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse<T: FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value.trim().parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value,
        })
    })
    .transpose()
}
