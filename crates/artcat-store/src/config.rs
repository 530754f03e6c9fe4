//! # Catalog Configuration
//!
//! Settings for opening a durable catalog. Values come from the environment
//! (`ARTCAT_*` variables) with defaults for everything, so a bare
//! `CatalogConfig::from_env()` always yields a usable configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `ARTCAT_DATABASE_URL` | `sqlite://artcat.db` |
//! | `ARTCAT_MAX_CONNECTIONS` | `8` |
//! | `ARTCAT_ACQUIRE_TIMEOUT_SECS` | `5` |
//! | `ARTCAT_BUSY_TIMEOUT_SECS` | `5` |
//! | `ARTCAT_PAGE_SIZE` | `100` |

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://artcat.db";

/// Default number of records fetched per name-listing page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Error in catalog configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// How to reach and size the durable store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// A `sqlite:` URL or a plain filesystem path.
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long a caller may wait for a pooled connection.
    pub acquire_timeout: Duration,
    /// How long SQLite waits on a lock held by another connection.
    pub busy_timeout: Duration,
    /// Records per name-listing page.
    pub page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 8,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CatalogConfig {
    /// Defaults, pointed at a database file.
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: path.as_ref().display().to_string(),
            ..Self::default()
        }
    }

    /// Defaults, pointed at a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }

    /// Read `ARTCAT_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup("ARTCAT_DATABASE_URL") {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    var: "ARTCAT_DATABASE_URL",
                    value: url,
                    reason: "must not be empty".into(),
                });
            }
            config.database_url = url;
        }
        if let Some(n) = parse_var::<u32>(&lookup, "ARTCAT_MAX_CONNECTIONS")? {
            config.max_connections = n;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "ARTCAT_ACQUIRE_TIMEOUT_SECS")? {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "ARTCAT_BUSY_TIMEOUT_SECS")? {
            config.busy_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var::<usize>(&lookup, "ARTCAT_PAGE_SIZE")? {
            config.page_size = n;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the catalog unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "ARTCAT_MAX_CONNECTIONS",
                value: self.max_connections.to_string(),
                reason: "at least one connection is required".into(),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                var: "ARTCAT_PAGE_SIZE",
                value: self.page_size.to_string(),
                reason: "pages must hold at least one record".into(),
            });
        }
        Ok(())
    }

    /// Whether the database lives only in this process's memory.
    pub fn is_in_memory(&self) -> bool {
        let url = self.database_url.trim();
        url == ":memory:" || url == "sqlite::memory:" || url.contains("mode=memory")
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: value.clone(),
                reason: e.to_string(),
            }),
    }
}
