//! # Schema Registry
//!
//! In-memory map from schema URI to parsed schema document.
//!
//! ## Registration
//!
//! Each `*.schema.json` file found under the schema directory is registered
//! as `<base_uri><relative path>`, e.g. `file://./Geometry.schema.json` or
//! `file://./Components/Electrolyte.schema.json`, and additionally under its
//! own `$id` when it declares one.
//!
//! When two files claim the same URI, the one visited later in sorted path
//! order wins and a warning is logged.
//!
//! ## Resolution
//!
//! The registry is handed to `jsonschema` as its [`Retrieve`] implementation.
//! A reference is looked up by exact URI first. References under the base
//! URI or under `jsonschema`'s default base `json-schema:///` are then tried
//! as a relative path, and a bare file name (no directory part) resolves when
//! exactly one registered file carries that name. Anything else is an error;
//! nothing is fetched from the network.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use jsonschema::{Retrieve, Uri};
use serde_json::Value;

use crate::config::ValidatorConfig;
use crate::error::SchemaValidationError;
use crate::loader::read_document;

/// Base URI `jsonschema` assigns to a root schema without `$id`.
const DEFAULT_RESOLUTION_BASE: &str = "json-schema:///";

/// Parsed schema set indexed by URI.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    base_uri: String,
    /// URI -> schema document.
    schemas: BTreeMap<String, Value>,
    /// Bare file name -> URIs of every file with that name.
    file_names: HashMap<String, Vec<String>>,
}

impl SchemaRegistry {
    /// Empty registry registering documents under `base_uri`.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            ..Self::default()
        }
    }

    /// Walk `config.schema_dir` and register every schema file.
    ///
    /// # Errors
    ///
    /// - [`SchemaValidationError::FileNotFound`] if the directory is missing.
    /// - [`SchemaValidationError::ParseError`] for the first malformed file.
    /// - [`SchemaValidationError::Io`] for any other read failure.
    pub fn load(config: &ValidatorConfig) -> Result<Self, SchemaValidationError> {
        let dir = &config.schema_dir;
        if !dir.is_dir() {
            return Err(SchemaValidationError::FileNotFound { path: dir.clone() });
        }

        let mut paths = Vec::new();
        let mut visited = HashSet::new();
        walk_for_schemas(dir, &config.schema_suffix, &mut visited, &mut paths)?;
        paths.sort();

        let mut registry = Self::new(config.base_uri.clone());
        for path in &paths {
            let schema = read_document(path)?;
            let relative = relative_uri_path(dir, path);
            registry.insert(&relative, schema);
        }

        tracing::info!(
            schema_dir = %dir.display(),
            schema_count = paths.len(),
            "loaded schema registry"
        );
        Ok(registry)
    }

    /// Register `schema` under `<base_uri><relative>` and its `$id`.
    pub fn insert(&mut self, relative: &str, schema: Value) {
        let uri = format!("{}{relative}", self.base_uri);
        let declared_id = schema
            .get("$id")
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(file_name) = relative.rsplit('/').next() {
            let uris = self.file_names.entry(file_name.to_string()).or_default();
            if !uris.contains(&uri) {
                uris.push(uri.clone());
            }
        }
        if let Some(id) = declared_id.filter(|id| *id != uri) {
            self.put(id, schema.clone());
        }
        tracing::debug!(%uri, "registered schema");
        self.put(uri, schema);
    }

    fn put(&mut self, uri: String, schema: Value) {
        if self.schemas.insert(uri.clone(), schema).is_some() {
            tracing::warn!(%uri, "schema URI registered twice; keeping the later file");
        }
    }

    /// Number of registered URIs (a schema with a distinct `$id` counts twice).
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered URIs, sorted.
    pub fn uris(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Look up a schema by exact URI.
    pub fn get(&self, uri: &str) -> Option<&Value> {
        self.schemas.get(uri)
    }

    /// Resolve a reference URI with the fallbacks described in the module docs.
    pub fn resolve(&self, uri: &str) -> Option<&Value> {
        let uri = uri.split('#').next().unwrap_or(uri);
        if let Some(schema) = self.schemas.get(uri) {
            return Some(schema);
        }

        let path = uri
            .strip_prefix(self.base_uri.as_str())
            .or_else(|| uri.strip_prefix(DEFAULT_RESOLUTION_BASE))?;
        if let Some(schema) = self.schemas.get(&format!("{}{path}", self.base_uri)) {
            return Some(schema);
        }
        if path.contains('/') {
            return None;
        }

        match self.file_names.get(path).map(Vec::as_slice) {
            Some([only]) => self.schemas.get(only),
            Some(candidates) if candidates.len() > 1 => {
                tracing::warn!(%uri, ?candidates, "ambiguous schema file name in reference");
                None
            }
            _ => None,
        }
    }
}

impl Retrieve for SchemaRegistry {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        self.resolve(uri_str)
            .cloned()
            .ok_or_else(|| format!("schema not found in registry for URI: {uri_str}").into())
    }
}

/// Relative path of `path` under `dir`, with `/` separators.
fn relative_uri_path(dir: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(dir).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Recursive walk following symlinks; each canonical directory is entered once.
fn walk_for_schemas(
    dir: &Path,
    suffix: &str,
    visited: &mut HashSet<PathBuf>,
    acc: &mut Vec<PathBuf>,
) -> Result<(), SchemaValidationError> {
    let canonical = std::fs::canonicalize(dir).map_err(|e| SchemaValidationError::from_io(dir, e))?;
    if !visited.insert(canonical) {
        tracing::debug!(dir = %dir.display(), "skipping directory already walked");
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| SchemaValidationError::from_io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| SchemaValidationError::from_io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            walk_for_schemas(&path, suffix, visited, acc)?;
        } else if path
            .file_name()
            .and_then(|f| f.to_str())
            .is_some_and(|name| name.ends_with(suffix))
        {
            acc.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_load_registers_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Simulation.schema.json", r#"{"type": "object"}"#);
        write(dir.path(), "Components/Electrolyte.schema.json", r#"{"type": "object"}"#);
        write(dir.path(), "notes.json", "not json at all");

        let registry = SchemaRegistry::load(&ValidatorConfig::new(dir.path())).unwrap();
        assert_eq!(
            registry.uris(),
            vec![
                "file://./Components/Electrolyte.schema.json",
                "file://./Simulation.schema.json",
            ]
        );
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = ValidatorConfig::new(dir.path().join("absent"));
        let err = SchemaRegistry::load(&config).unwrap_err();
        assert!(matches!(err, SchemaValidationError::FileNotFound { .. }));
    }

    #[test]
    fn test_load_malformed_schema_names_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Good.schema.json", "{}");
        write(dir.path(), "Bad.schema.json", "{ \"type\": ");

        let err = SchemaRegistry::load(&ValidatorConfig::new(dir.path())).unwrap_err();
        match err {
            SchemaValidationError::ParseError { path, .. } => {
                assert!(path.ends_with("Bad.schema.json"));
            }
            other => panic!("Expected ParseError, got: {other}"),
        }
    }

    #[test]
    fn test_empty_directory_gives_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::load(&ValidatorConfig::new(dir.path())).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_declared_id_is_also_registered() {
        let mut registry = SchemaRegistry::new("file://./");
        registry.insert(
            "Geometry.schema.json",
            json!({"$id": "https://battmo.org/Geometry", "type": "object"}),
        );
        assert_eq!(registry.len(), 2);
        assert!(registry.get("https://battmo.org/Geometry").is_some());
        assert!(registry.get("file://./Geometry.schema.json").is_some());
    }

    #[test]
    fn test_duplicate_uri_last_write_wins() {
        let mut registry = SchemaRegistry::new("file://./");
        registry.insert("A.schema.json", json!({"title": "first"}));
        registry.insert("A.schema.json", json!({"title": "second"}));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("file://./A.schema.json").unwrap()["title"],
            "second"
        );
    }

    #[test]
    fn test_resolve_fallbacks() {
        let mut registry = SchemaRegistry::new("file://./");
        registry.insert("Components/Electrolyte.schema.json", json!({"title": "e"}));

        assert!(registry.resolve("file://./Components/Electrolyte.schema.json").is_some());
        assert!(registry
            .resolve("file://./Components/Electrolyte.schema.json#/properties")
            .is_some());
        assert!(registry
            .resolve("json-schema:///Components/Electrolyte.schema.json")
            .is_some());
        // Flat reference to a uniquely named nested file.
        assert!(registry.resolve("file://./Electrolyte.schema.json").is_some());
        assert!(registry.resolve("json-schema:///Electrolyte.schema.json").is_some());
        assert!(registry.resolve("file://./Missing.schema.json").is_none());
    }

    #[test]
    fn test_resolve_ignores_foreign_hosts() {
        let mut registry = SchemaRegistry::new("file://./");
        registry.insert("Geometry.schema.json", json!({"type": "string"}));

        assert!(registry
            .resolve("https://elsewhere.example/x/Geometry.schema.json")
            .is_none());
        assert!(registry.resolve("file:///elsewhere/Geometry.schema.json").is_none());
    }

    #[test]
    fn test_resolve_nested_reference_does_not_match_other_directory() {
        let mut registry = SchemaRegistry::new("file://./");
        registry.insert("Geometry.schema.json", json!({"type": "object"}));

        assert!(registry
            .resolve("file://./Components/Geometry.schema.json")
            .is_none());
    }

    #[test]
    fn test_resolve_ambiguous_file_name_is_a_miss() {
        let mut registry = SchemaRegistry::new("file://./");
        registry.insert("Anode/Coating.schema.json", json!({"title": "anode"}));
        registry.insert("Cathode/Coating.schema.json", json!({"title": "cathode"}));

        assert!(registry.resolve("file://./Coating.schema.json").is_none());
        assert!(registry.resolve("file://./Anode/Coating.schema.json").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_load_survives_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Nested/Geometry.schema.json", "{}");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("Nested/loop")).unwrap();

        let registry = SchemaRegistry::load(&ValidatorConfig::new(dir.path())).unwrap();
        assert_eq!(registry.uris(), vec!["file://./Nested/Geometry.schema.json"]);
    }
}
