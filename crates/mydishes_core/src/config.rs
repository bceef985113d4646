//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve where the store file and logs live before anything is opened.
//!
//! # Invariants
//! - Blank environment values behave as unset.
//! - Resolution never fails; bad values surface when they are used.

use crate::logging::default_log_level;
use std::path::{Path, PathBuf};

pub const DB_PATH_ENV: &str = "MYDISHES_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "MYDISHES_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "MYDISHES_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "mydishes.sqlite3";

/// Store and logging settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads `MYDISHES_DB_PATH`, `MYDISHES_LOG_LEVEL` and `MYDISHES_LOG_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(db_path) = non_blank(DB_PATH_ENV) {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(level) = non_blank(LOG_LEVEL_ENV) {
            config.log_level = level;
        }
        config.log_dir = non_blank(LOG_DIR_ENV).map(PathBuf::from);
        config
    }

    pub fn with_db_path(mut self, db_path: impl AsRef<Path>) -> Self {
        self.db_path = db_path.as_ref().to_path_buf();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl AsRef<Path>) -> Self {
        self.log_dir = Some(log_dir.as_ref().to_path_buf());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, DB_PATH_ENV, LOG_DIR_ENV, LOG_LEVEL_ENV};
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(vars: &[(&str, &str)]) -> CoreConfig {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        CoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn unset_values_fall_back_to_defaults() {
        let config = config_from(&[]);
        assert_eq!(
            config.db_path,
            std::env::temp_dir().join("mydishes.sqlite3")
        );
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn blank_values_behave_as_unset() {
        let config = config_from(&[(DB_PATH_ENV, "   "), (LOG_DIR_ENV, "")]);
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn set_values_are_trimmed_and_used() {
        let config = config_from(&[
            (DB_PATH_ENV, " /data/dishes.db "),
            (LOG_LEVEL_ENV, "warn"),
            (LOG_DIR_ENV, "/var/log/mydishes"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/data/dishes.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/mydishes")));
    }

    #[test]
    fn setters_override_fields() {
        let config = CoreConfig::default()
            .with_db_path("/tmp/x.db")
            .with_log_level("trace")
            .with_log_dir("/tmp/logs");
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
    }
}
