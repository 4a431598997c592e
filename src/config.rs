//! Server configuration from the environment.
//!
//! | Variable | Meaning |
//! |---|---|
//! | `NOTEDECK_PORT` | HTTP port, default 3000 |
//! | `NOTEDECK_DB` | SQLite file, default under the platform data dir |
//! | `NOTEDECK_API_KEY` | Bearer key required on every request when set |
//! | `NOTEDECK_CORS_ORIGINS` | Comma-separated allowed origins; permissive when unset |
//!
//! Command line flags override these values.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;

/// Where documents are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageTarget {
    /// SQLite at the given path, or the default path when `None`.
    Sqlite(Option<PathBuf>),
    /// Non-persistent, for demos and tests.
    Memory,
}

/// Authentication and CORS settings for the HTTP API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityConfig {
    pub api_key: Option<String>,
    pub cors_origins: Option<Vec<String>>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_var("NOTEDECK_API_KEY"),
            cors_origins: non_empty_var("NOTEDECK_CORS_ORIGINS").map(|s| parse_origins(&s)),
        }
    }

    /// No authentication, permissive CORS.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            cors_origins: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub storage: StorageTarget,
    pub security: SecurityConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = non_empty_var("NOTEDECK_PORT")
            .and_then(|p| match p.parse() {
                Ok(port) => Some(port),
                Err(_) => {
                    tracing::warn!("Ignoring invalid NOTEDECK_PORT {:?}", p);
                    None
                }
            })
            .unwrap_or(DEFAULT_PORT);

        Self {
            port,
            storage: StorageTarget::Sqlite(non_empty_var("NOTEDECK_DB").map(PathBuf::from)),
            security: SecurityConfig::from_env(),
        }
    }

    /// Applies command line overrides. `memory` wins over any path.
    pub fn with_overrides(mut self, port: Option<u16>, db: Option<PathBuf>, memory: bool) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        if memory {
            self.storage = StorageTarget::Memory;
        } else if let Some(path) = db {
            self.storage = StorageTarget::Sqlite(Some(path));
        }
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            storage: StorageTarget::Sqlite(None),
            security: SecurityConfig::default(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(
            parse_origins(" http://a.test, ,http://b.test "),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn memory_flag_overrides_db_path() {
        let config = ServerConfig::default().with_overrides(
            Some(8080),
            Some(PathBuf::from("/tmp/x.db")),
            true,
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage, StorageTarget::Memory);
    }

    #[test]
    fn db_flag_replaces_default_path() {
        let config = ServerConfig::default().with_overrides(None, Some(PathBuf::from("a.db")), false);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.storage, StorageTarget::Sqlite(Some(PathBuf::from("a.db"))));
    }

    #[test]
    fn disabled_security_has_no_key() {
        let config = SecurityConfig::disabled();
        assert!(config.api_key.is_none());
        assert!(config.cors_origins.is_none());
    }
}
