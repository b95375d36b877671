//! Configuration module for Skyfold.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Skyfold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub transfers: TransfersConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Remote store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Directory backing the directory remote store.
    pub root: PathBuf,
    /// Number of entries per listing page.
    pub page_size: u32,
}

/// Transfer pool sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransfersConfig {
    /// Uploads allowed in flight at once, system-wide.
    pub max_parallel_uploads: u32,
    /// Downloads allowed in flight at once, system-wide.
    pub max_parallel_downloads: u32,
}

/// Local cache and database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root of the materialized file cache.
    pub dir: PathBuf,
    /// SQLite database holding metadata and task records.
    pub database: PathBuf,
    /// Cache size above which `cache prune` evicts.
    pub max_size_mb: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/skyfold/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("skyfold")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("skyfold")
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            root: data_dir().join("remote"),
            page_size: 200,
        }
    }
}

impl Default for TransfersConfig {
    fn default() -> Self {
        Self {
            max_parallel_uploads: 2,
            max_parallel_downloads: 4,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            dir: data_dir.join("cache"),
            database: data_dir.join("skyfold.db"),
            max_size_mb: 2048,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transfers.max_parallel_uploads"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const MAX_PARALLEL_TRANSFERS: u32 = 64;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        if self.remote.root.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "remote.root".into(),
                message: "must not be empty".into(),
            });
        }
        if self.remote.page_size == 0 {
            errors.push(ValidationError {
                field: "remote.page_size".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- transfers ---
        for (field, value) in [
            (
                "transfers.max_parallel_uploads",
                self.transfers.max_parallel_uploads,
            ),
            (
                "transfers.max_parallel_downloads",
                self.transfers.max_parallel_downloads,
            ),
        ] {
            if value == 0 || value > MAX_PARALLEL_TRANSFERS {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("must be in range 1..={MAX_PARALLEL_TRANSFERS}"),
                });
            }
        }

        // --- cache ---
        if self.cache.dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "cache.dir".into(),
                message: "must not be empty".into(),
            });
        }
        if self.cache.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "cache.database".into(),
                message: "must not be empty".into(),
            });
        }
        if self.cache.max_size_mb == 0 {
            errors.push(ValidationError {
                field: "cache.max_size_mb".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use skyfold_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .remote_root(PathBuf::from("/srv/skyfold"))
///     .max_parallel_uploads(4)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- remote ---

    pub fn remote_root(mut self, root: PathBuf) -> Self {
        self.config.remote.root = root;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.remote.page_size = page_size;
        self
    }

    // --- transfers ---

    pub fn max_parallel_uploads(mut self, n: u32) -> Self {
        self.config.transfers.max_parallel_uploads = n;
        self
    }

    pub fn max_parallel_downloads(mut self, n: u32) -> Self {
        self.config.transfers.max_parallel_downloads = n;
        self
    }

    // --- cache ---

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache.dir = dir;
        self
    }

    pub fn cache_database(mut self, database: PathBuf) -> Self {
        self.config.cache.database = database;
        self
    }

    pub fn cache_max_size_mb(mut self, mb: u64) -> Self {
        self.config.cache.max_size_mb = mb;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.remote.page_size, 200);
        assert_eq!(cfg.transfers.max_parallel_uploads, 2);
        assert_eq!(cfg.transfers.max_parallel_downloads, 4);
        assert_eq!(cfg.cache.max_size_mb, 2048);
        assert!(cfg.cache.database.to_string_lossy().ends_with("skyfold.db"));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn default_path_ends_with_skyfold_config() {
        let path = Config::default_path();
        assert!(path.ends_with("skyfold/config.yaml"));
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
remote:
  root: /srv/remote
  page_size: 50
transfers:
  max_parallel_uploads: 3
  max_parallel_downloads: 6
cache:
  dir: /tmp/skyfold-cache
  database: /tmp/skyfold.db
  max_size_mb: 100
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.remote.root, PathBuf::from("/srv/remote"));
        assert_eq!(cfg.remote.page_size, 50);
        assert_eq!(cfg.transfers.max_parallel_uploads, 3);
        assert_eq!(cfg.transfers.max_parallel_downloads, 6);
        assert_eq!(cfg.cache.dir, PathBuf::from("/tmp/skyfold-cache"));
        assert_eq!(cfg.cache.database, PathBuf::from("/tmp/skyfold.db"));
        assert_eq!(cfg.cache.max_size_mb, 100);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"transfers:\n  max_parallel_uploads: 7\n")
            .unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.transfers.max_parallel_uploads, 7);
        assert_eq!(cfg.transfers.max_parallel_downloads, 4);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.remote.page_size, 200);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_bad_transfer_limits() {
        let mut cfg = Config::default();
        cfg.transfers.max_parallel_uploads = 0;
        cfg.transfers.max_parallel_downloads = 1000;
        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"transfers.max_parallel_uploads".to_string()));
        assert!(fields.contains(&"transfers.max_parallel_downloads".to_string()));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".into();
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "logging.level" && e.message.contains("verbose")));
    }

    #[test]
    fn validate_reports_all_errors() {
        let mut cfg = Config::default();
        cfg.remote.page_size = 0;
        cfg.cache.max_size_mb = 0;
        cfg.cache.dir = PathBuf::new();
        assert_eq!(cfg.validate().len(), 3);
    }

    // -- Builder --

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .remote_root(PathBuf::from("/r"))
            .page_size(10)
            .max_parallel_uploads(5)
            .max_parallel_downloads(9)
            .cache_dir(PathBuf::from("/c"))
            .cache_database(PathBuf::from("/c/db"))
            .cache_max_size_mb(1)
            .logging_level("warn")
            .build();
        assert_eq!(cfg.remote.root, PathBuf::from("/r"));
        assert_eq!(cfg.remote.page_size, 10);
        assert_eq!(cfg.transfers.max_parallel_uploads, 5);
        assert_eq!(cfg.transfers.max_parallel_downloads, 9);
        assert_eq!(cfg.cache.database, PathBuf::from("/c/db"));
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn build_validated_rejects_invalid_config() {
        let result = ConfigBuilder::new().page_size(0).build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors[0].field, "remote.page_size");
        assert_eq!(errors[0].to_string(), "remote.page_size: must be greater than 0");
    }
}
