//! Runtime configuration for registry hosts.
//!
//! # Responsibility
//! - Resolve database path and logging settings from the environment.
//! - Keep defaults in one place for the CLI and request boundary.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - File logging is enabled only when a log directory is configured.

use crate::logging::default_log_level;
use std::path::PathBuf;

/// Environment variable holding the SQLite database path.
pub const ENV_DB_PATH: &str = "OFFICE_REGISTRY_DB_PATH";
/// Environment variable holding the log level (`trace|debug|info|warn|error`).
pub const ENV_LOG_LEVEL: &str = "OFFICE_REGISTRY_LOG_LEVEL";
/// Environment variable holding the absolute log directory.
pub const ENV_LOG_DIR: &str = "OFFICE_REGISTRY_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "office_registry.sqlite3";

/// Resolved registry host settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl RegistryConfig {
    /// Resolves settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: read(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RegistryConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| values.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = RegistryConfig::from_lookup(|_| None);
        assert_eq!(config, RegistryConfig::default());
        assert!(config.db_path.ends_with("office_registry.sqlite3"));
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn environment_values_override_defaults() {
        let config = RegistryConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, "/var/lib/offices/registry.db"),
            (ENV_LOG_LEVEL, "warn"),
            (ENV_LOG_DIR, " /var/log/offices "),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/var/lib/offices/registry.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/offices")));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config =
            RegistryConfig::from_lookup(lookup_from(&[(ENV_DB_PATH, "   "), (ENV_LOG_DIR, "")]));
        assert_eq!(config.db_path, RegistryConfig::default().db_path);
        assert_eq!(config.log_dir, None);
    }
}
