//! # Instance Loading
//!
//! The validator does not read instance files itself. It asks an
//! [`InstanceLoader`] for a parsed value, so callers embedding the validator
//! can supply their own loading rules.
//!
//! [`BattmoInputLoader`] implements the simulator's input conventions:
//! relative paths fall back to the simulator root, and any object of the form
//! `{"isFile": true, "filename": "..."}` is replaced by the contents of the
//! named file.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::SchemaValidationError;

/// Produces the JSON value to validate from a path.
pub trait InstanceLoader {
    /// Load and parse the document at `path`.
    fn load(&self, path: &Path) -> Result<Value, SchemaValidationError>;
}

/// Reads a single JSON (or YAML, by extension) file with no preprocessing.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileLoader;

impl InstanceLoader for JsonFileLoader {
    fn load(&self, path: &Path) -> Result<Value, SchemaValidationError> {
        read_document(path)
    }
}

/// Loader for simulator input files.
#[derive(Debug, Clone, Default)]
pub struct BattmoInputLoader {
    battmo_dir: Option<PathBuf>,
}

impl BattmoInputLoader {
    pub fn new(battmo_dir: Option<PathBuf>) -> Self {
        Self { battmo_dir }
    }

    pub fn battmo_dir(&self) -> Option<&Path> {
        self.battmo_dir.as_deref()
    }

    /// Resolve a possibly relative input path.
    ///
    /// Absolute paths are returned as is. An included file (`including_dir`
    /// set) is looked up next to the including file first, then in the
    /// current directory, then under the simulator root. A top-level input is
    /// looked up in the current directory, then under the simulator root.
    /// If none exists, the path is returned unchanged so the read reports it.
    pub fn resolve_path(&self, path: &Path, including_dir: Option<&Path>) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let candidates = including_dir
            .into_iter()
            .chain(Some(Path::new("")))
            .chain(self.battmo_dir.as_deref());
        for base in candidates {
            let candidate = base.join(path);
            if candidate.exists() {
                return candidate;
            }
        }
        path.to_path_buf()
    }

    fn load_file(
        &self,
        path: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Value, SchemaValidationError> {
        let identity = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if stack.contains(&identity) {
            return Err(SchemaValidationError::IncludeCycle {
                path: path.to_path_buf(),
            });
        }

        let value = read_document(path)?;
        tracing::trace!(path = %path.display(), "loaded input file");

        stack.push(identity);
        let expanded = self.expand(value, path, stack);
        stack.pop();
        expanded
    }

    /// Expand inclusions inside `value`, which was read from `source`.
    fn expand(
        &self,
        value: Value,
        source: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Value, SchemaValidationError> {
        match value {
            Value::Object(map) => match file_reference(&map).map(PathBuf::from) {
                Some(filename) => {
                    let target = self.resolve_path(&filename, source.parent());
                    let included = self.load_file(&target, stack)?;
                    let overrides = self.expand_members(map, source, stack, true)?;
                    merge_overrides(included, overrides).map_err(|included| {
                        SchemaValidationError::ParseError {
                            path: source.to_path_buf(),
                            reason: format!(
                                "{} is included with sibling keys but holds {}, not an object",
                                target.display(),
                                json_kind(&included)
                            ),
                        }
                    })
                }
                None => Ok(Value::Object(self.expand_members(map, source, stack, false)?)),
            },
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.expand(item, source, stack))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other),
        }
    }

    fn expand_members(
        &self,
        map: Map<String, Value>,
        source: &Path,
        stack: &mut Vec<PathBuf>,
        skip_reference_keys: bool,
    ) -> Result<Map<String, Value>, SchemaValidationError> {
        let mut out = Map::new();
        for (key, member) in map {
            if skip_reference_keys && (key == "isFile" || key == "filename") {
                continue;
            }
            out.insert(key, self.expand(member, source, stack)?);
        }
        Ok(out)
    }
}

impl InstanceLoader for BattmoInputLoader {
    fn load(&self, path: &Path) -> Result<Value, SchemaValidationError> {
        let resolved = self.resolve_path(path, None);
        let mut stack = Vec::new();
        self.load_file(&resolved, &mut stack)
    }
}

/// The `filename` of an `{"isFile": true, ...}` object.
fn file_reference(map: &Map<String, Value>) -> Option<&str> {
    match map.get("isFile") {
        Some(Value::Bool(true)) => map.get("filename").and_then(Value::as_str),
        _ => None,
    }
}

/// Keys set next to `isFile` take precedence over the included object.
///
/// Overrides cannot apply to a non-object document; it is handed back as the error.
fn merge_overrides(included: Value, overrides: Map<String, Value>) -> Result<Value, Value> {
    match included {
        Value::Object(mut base) => {
            base.extend(overrides);
            Ok(Value::Object(base))
        }
        other if overrides.is_empty() => Ok(other),
        other => Err(other),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read and parse a JSON document, or YAML when the extension says so.
pub(crate) fn read_document(path: &Path) -> Result<Value, SchemaValidationError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| SchemaValidationError::from_io(path, e))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yaml" | "yml" => {
            serde_yaml::from_str(&content).map_err(|e| SchemaValidationError::ParseError {
                path: path.to_path_buf(),
                reason: format!("YAML parse error: {e}"),
            })
        }
        _ => serde_json::from_str(&content).map_err(|e| SchemaValidationError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}
