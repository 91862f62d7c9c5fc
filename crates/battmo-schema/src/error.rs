//! # Error Types
//!
//! Every failure of a validation call maps to one [`SchemaValidationError`]
//! variant. Schema violations carry the JSON Pointer into the instance, the
//! JSON Pointer of the failing schema keyword, and the validator's message.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Errors returned by schema loading, instance loading, and validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// A schema directory, schema file, or instance file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A schema or instance file is not well-formed JSON (or YAML).
    #[error("failed to parse {}: {reason}", path.display())]
    ParseError {
        /// The file that failed to parse.
        path: PathBuf,
        /// Parser message, including line and column.
        reason: String,
    },

    /// A `$ref` could not be resolved against the schema registry.
    #[error("unresolved reference in schema {schema}: {reason}")]
    SchemaResolution {
        /// The schema being compiled.
        schema: String,
        /// Resolver message naming the reference.
        reason: String,
    },

    /// The root schema is not a valid Draft 2020-12 schema.
    #[error("failed to compile schema {schema}: {reason}")]
    SchemaCompile {
        /// The schema being compiled.
        schema: String,
        /// Compiler message.
        reason: String,
    },

    /// The instance does not satisfy the schema.
    #[error("validation failed against schema {schema}:\n{violations}")]
    ValidationFailed {
        /// The root schema the instance was checked against.
        schema: String,
        /// The violations found, first only or all depending on configuration.
        violations: ValidationViolations,
    },

    /// A chain of `isFile` inclusions leads back to a file already being loaded.
    #[error("file inclusion cycle at {}", path.display())]
    IncludeCycle {
        /// The file that was included twice.
        path: PathBuf,
    },

    /// Any other I/O failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl SchemaValidationError {
    /// Map an I/O error on `path` to `FileNotFound` or `Io`.
    pub(crate) fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Returns the violations if this is a validation failure.
    pub fn violations(&self) -> Option<&ValidationViolations> {
        match self {
            Self::ValidationFailed { violations, .. } => Some(violations),
            _ => None,
        }
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON Pointer to the violating value in the instance.
    pub instance_path: String,
    /// JSON Pointer to the schema keyword that failed.
    pub schema_path: String,
    /// Human-readable description produced by the validator.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {} [{}]", self.message, self.schema_path)
        } else {
            write!(
                f,
                "  {}: {} [{}]",
                self.instance_path, self.message, self.schema_path
            )
        }
    }
}

/// Ordered collection of violations, in the order the validator reported them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// The first reported violation.
    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
