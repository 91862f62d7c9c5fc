//! Validator configuration.
//!
//! Locations and naming conventions are fixed at startup and never mutated.
//! Defaults follow the simulator's layout (`Utilities/JsonSchemas` under the
//! simulator root). Override via environment variables or explicit
//! construction.

use std::path::{Path, PathBuf};

/// Default name of the entry-point schema.
pub const DEFAULT_ROOT_SCHEMA: &str = "Simulation.schema.json";

/// Default URI prefix under which schema files are registered.
pub const DEFAULT_BASE_URI: &str = "file://./";

/// File name suffix identifying schema files.
pub const DEFAULT_SCHEMA_SUFFIX: &str = ".schema.json";

/// Schema directory used when neither `BATTMO_SCHEMA_DIR` nor `BATTMO_DIR` is set.
pub const DEFAULT_SCHEMA_DIR: &str = "schemas";

/// How many violations a failed validation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Stop at the first violation.
    First,
    /// Collect every violation.
    #[default]
    All,
}

/// Read-only configuration for a [`SchemaValidator`](crate::SchemaValidator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Directory walked for `*.schema.json` files.
    pub schema_dir: PathBuf,
    /// Simulator root, used to resolve relative instance and include paths.
    pub battmo_dir: Option<PathBuf>,
    /// File name of the entry-point schema inside `schema_dir`.
    pub root_schema: String,
    /// URI prefix prepended to each schema's relative path.
    pub base_uri: String,
    /// File name suffix selecting schema files.
    pub schema_suffix: String,
    /// First or all violations.
    pub report: ReportMode,
}

impl ValidatorConfig {
    /// Configuration with defaults for everything but the schema directory.
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            battmo_dir: None,
            root_schema: DEFAULT_ROOT_SCHEMA.to_string(),
            base_uri: DEFAULT_BASE_URI.to_string(),
            schema_suffix: DEFAULT_SCHEMA_SUFFIX.to_string(),
            report: ReportMode::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `BATTMO_DIR`: simulator root (optional)
    /// - `BATTMO_SCHEMA_DIR` (default: `$BATTMO_DIR/Utilities/JsonSchemas`, else `schemas`)
    /// - `BATTMO_ROOT_SCHEMA` (default: `Simulation.schema.json`)
    /// - `BATTMO_SCHEMA_BASE_URI` (default: `file://./`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let battmo_dir = lookup("BATTMO_DIR").map(PathBuf::from);
        let schema_dir = match lookup("BATTMO_SCHEMA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => match &battmo_dir {
                Some(root) => default_schema_dir(root),
                None => PathBuf::from(DEFAULT_SCHEMA_DIR),
            },
        };

        let mut config = Self::new(schema_dir);
        config.battmo_dir = battmo_dir;
        if let Some(root_schema) = lookup("BATTMO_ROOT_SCHEMA") {
            config = config.with_root_schema(root_schema);
        }
        if let Some(base_uri) = lookup("BATTMO_SCHEMA_BASE_URI") {
            config = config.with_base_uri(base_uri)?;
        }
        Ok(config)
    }

    pub fn with_battmo_dir(mut self, battmo_dir: impl Into<PathBuf>) -> Self {
        self.battmo_dir = Some(battmo_dir.into());
        self
    }

    pub fn with_root_schema(mut self, root_schema: impl Into<String>) -> Self {
        self.root_schema = root_schema.into();
        self
    }

    /// Set the registration prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUri`] unless the value starts with a
    /// URI scheme and ends with `/`.
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Result<Self, ConfigError> {
        let base_uri = base_uri.into();
        check_base_uri(&base_uri)?;
        self.base_uri = base_uri;
        Ok(self)
    }

    pub fn with_report(mut self, report: ReportMode) -> Self {
        self.report = report;
        self
    }

    /// Full path of the root schema file.
    pub fn root_schema_path(&self) -> PathBuf {
        self.schema_dir.join(&self.root_schema)
    }
}

/// Schema directory inside a simulator checkout.
pub fn default_schema_dir(battmo_dir: &Path) -> PathBuf {
    battmo_dir.join("Utilities").join("JsonSchemas")
}

fn check_base_uri(base_uri: &str) -> Result<(), ConfigError> {
    let scheme_ok = base_uri
        .split_once(':')
        .is_some_and(|(scheme, _)| {
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        });
    if scheme_ok && base_uri.ends_with('/') {
        Ok(())
    } else {
        Err(ConfigError::InvalidBaseUri(base_uri.to_string()))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid schema base URI {0:?}: expected a scheme and a trailing '/'")]
    InvalidBaseUri(String),
}
