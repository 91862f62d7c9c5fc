//! # Schema Validation
//!
//! Runtime validation of simulation input documents against the root
//! schema (Draft 2020-12).
//!
//! A [`SchemaValidator`] holds configuration only. Each validation call
//! rebuilds the registry, reloads the root schema, and recompiles the
//! validator, so edits to the schema directory are picked up between calls
//! and two calls with the same inputs always agree.

use std::path::Path;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, Validator};
use serde_json::Value;

use crate::config::{ReportMode, ValidatorConfig};
use crate::error::{SchemaValidationError, ValidationViolations, Violation};
use crate::loader::{read_document, BattmoInputLoader, InstanceLoader};
use crate::registry::SchemaRegistry;

/// Validates instances against the configured schema directory.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    config: ValidatorConfig,
}

impl SchemaValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Walk the schema directory and register every schema file.
    pub fn load_schema_set(&self) -> Result<SchemaRegistry, SchemaValidationError> {
        SchemaRegistry::load(&self.config)
    }

    /// Read the root schema from the schema directory.
    ///
    /// # Errors
    ///
    /// [`SchemaValidationError::FileNotFound`] or
    /// [`SchemaValidationError::ParseError`].
    pub fn load_root_schema(&self) -> Result<Value, SchemaValidationError> {
        read_document(&self.config.root_schema_path())
    }

    /// Compile the root schema with the full registry behind `$ref`s.
    ///
    /// The registry is loaded first, so a malformed schema anywhere in the
    /// directory fails the call before the root schema is touched.
    ///
    /// # Errors
    ///
    /// Registry and root schema load errors, plus
    /// [`SchemaValidationError::SchemaResolution`] for an unresolvable `$ref`
    /// and [`SchemaValidationError::SchemaCompile`] for an invalid schema.
    pub fn build_validator(&self) -> Result<Validator, SchemaValidationError> {
        let registry = self.load_schema_set()?;
        let root = self.load_root_schema()?;

        jsonschema::options()
            .with_draft(Draft::Draft202012)
            .with_retriever(registry)
            .build(&root)
            .map_err(|e| self.compile_error(&e))
    }

    /// Validate the file at `instance_path`, loaded with [`BattmoInputLoader`].
    ///
    /// Returns `Ok(true)` when the instance satisfies the root schema.
    pub fn validate(&self, instance_path: &Path) -> Result<bool, SchemaValidationError> {
        let loader = BattmoInputLoader::new(self.config.battmo_dir.clone());
        self.validate_with(instance_path, &loader)
    }

    /// Validate the file at `instance_path`, loaded with `loader`.
    pub fn validate_with(
        &self,
        instance_path: &Path,
        loader: &dyn InstanceLoader,
    ) -> Result<bool, SchemaValidationError> {
        let validator = self.build_validator()?;
        let instance = loader.load(instance_path)?;
        tracing::debug!(instance = %instance_path.display(), "validating input file");
        self.check(&validator, &instance)
    }

    /// Validate an already parsed instance.
    pub fn validate_value(&self, instance: &Value) -> Result<bool, SchemaValidationError> {
        let validator = self.build_validator()?;
        self.check(&validator, instance)
    }

    fn check(&self, validator: &Validator, instance: &Value) -> Result<bool, SchemaValidationError> {
        let limit = match self.config.report {
            ReportMode::First => 1,
            ReportMode::All => usize::MAX,
        };

        let mut violations = Vec::new();
        for err in validator.iter_errors(instance).take(limit) {
            if let ValidationErrorKind::Referencing(_) = &err.kind {
                return Err(SchemaValidationError::SchemaResolution {
                    schema: self.config.root_schema.clone(),
                    reason: err.to_string(),
                });
            }
            violations.push(Violation {
                instance_path: err.instance_path.to_string(),
                schema_path: err.schema_path.to_string(),
                message: err.to_string(),
            });
        }

        if violations.is_empty() {
            tracing::info!(schema = %self.config.root_schema, "instance is valid");
            Ok(true)
        } else {
            tracing::info!(
                schema = %self.config.root_schema,
                violation_count = violations.len(),
                "instance failed validation"
            );
            Err(SchemaValidationError::ValidationFailed {
                schema: self.config.root_schema.clone(),
                violations: ValidationViolations::new(violations),
            })
        }
    }

    fn compile_error(&self, err: &jsonschema::ValidationError<'_>) -> SchemaValidationError {
        let schema = self.config.root_schema.clone();
        let reason = err.to_string();
        match &err.kind {
            ValidationErrorKind::Referencing(_) => {
                SchemaValidationError::SchemaResolution { schema, reason }
            }
            _ => SchemaValidationError::SchemaCompile { schema, reason },
        }
    }
}

/// Validate `instance_path` against the schema set described by `config`.
pub fn validate(
    config: &ValidatorConfig,
    instance_path: impl AsRef<Path>,
) -> Result<bool, SchemaValidationError> {
    SchemaValidator::new(config.clone()).validate(instance_path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    const SIMULATION: &str = r#"{
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "Geometry": {"$ref": "file://./Geometry.schema.json"}
        },
        "required": ["Geometry"]
    }"#;

    const GEOMETRY: &str = r#"{
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "case": {"type": "string", "enum": ["1D", "2D", "3D"]},
            "faceArea": {"type": "number", "exclusiveMinimum": 0}
        },
        "required": ["case"]
    }"#;

    fn fixture() -> (tempfile::TempDir, SchemaValidator) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Simulation.schema.json"), SIMULATION).unwrap();
        std::fs::write(dir.path().join("Geometry.schema.json"), GEOMETRY).unwrap();
        let validator = SchemaValidator::new(ValidatorConfig::new(dir.path()));
        (dir, validator)
    }

    fn write_instance(dir: &Path, value: &Value) -> PathBuf {
        let path = dir.join("input.json");
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_valid_instance() {
        let (dir, validator) = fixture();
        let path = write_instance(dir.path(), &json!({"Geometry": {"case": "1D"}}));
        assert!(validator.validate(&path).unwrap());
    }

    #[test]
    fn test_missing_required_property() {
        let (_dir, validator) = fixture();
        let err = validator.validate_value(&json!({})).unwrap_err();
        let violations = err.violations().expect("expected ValidationFailed");
        assert_eq!(violations.len(), 1);
        let first = violations.first().unwrap();
        assert_eq!(first.instance_path, "");
        assert_eq!(first.schema_path, "/required");
        assert!(first.message.contains("Geometry"), "got: {}", first.message);
    }

    #[test]
    fn test_violation_inside_referenced_schema() {
        let (_dir, validator) = fixture();
        let err = validator
            .validate_value(&json!({"Geometry": {"case": "4D"}}))
            .unwrap_err();
        let violations = err.violations().expect("expected ValidationFailed");
        assert_eq!(violations.first().unwrap().instance_path, "/Geometry/case");
    }

    #[test]
    fn test_report_first_only() {
        let (dir, _) = fixture();
        let validator = SchemaValidator::new(
            ValidatorConfig::new(dir.path()).with_report(ReportMode::First),
        );
        let instance = json!({"Geometry": {"case": "4D", "faceArea": -1}});
        let err = validator.validate_value(&instance).unwrap_err();
        assert_eq!(err.violations().unwrap().len(), 1);

        let all = SchemaValidator::new(ValidatorConfig::new(dir.path()));
        let err = all.validate_value(&instance).unwrap_err();
        assert_eq!(err.violations().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_schema_fails_before_instance_is_read() {
        let (dir, validator) = fixture();
        std::fs::write(dir.path().join("Broken.schema.json"), "{").unwrap();
        let err = validator
            .validate(&dir.path().join("never-created.json"))
            .unwrap_err();
        assert!(
            matches!(err, SchemaValidationError::ParseError { .. }),
            "Expected ParseError, got: {err}"
        );
    }

    #[test]
    fn test_missing_root_schema() {
        let (dir, validator) = fixture();
        std::fs::remove_file(dir.path().join("Simulation.schema.json")).unwrap();
        let err = validator.validate_value(&json!({})).unwrap_err();
        assert!(matches!(err, SchemaValidationError::FileNotFound { .. }));
    }

    #[test]
    fn test_missing_referenced_schema() {
        let (dir, validator) = fixture();
        std::fs::remove_file(dir.path().join("Geometry.schema.json")).unwrap();
        let err = validator
            .validate_value(&json!({"Geometry": {"case": "1D"}}))
            .unwrap_err();
        assert!(
            matches!(err, SchemaValidationError::SchemaResolution { .. }),
            "Expected SchemaResolution, got: {err}"
        );
    }

    #[test]
    fn test_reference_into_missing_subdirectory_is_unresolved() {
        let (dir, validator) = fixture();
        let nested = SIMULATION.replace(
            "file://./Geometry.schema.json",
            "file://./Components/Geometry.schema.json",
        );
        std::fs::write(dir.path().join("Simulation.schema.json"), nested).unwrap();
        let err = validator
            .validate_value(&json!({"Geometry": {"case": "1D"}}))
            .unwrap_err();
        assert!(
            matches!(err, SchemaValidationError::SchemaResolution { .. }),
            "Expected SchemaResolution, got: {err}"
        );
    }

    #[test]
    fn test_reference_to_foreign_host_is_unresolved() {
        let (dir, validator) = fixture();
        let foreign = SIMULATION.replace(
            "file://./Geometry.schema.json",
            "https://elsewhere.example/x/Geometry.schema.json",
        );
        std::fs::write(dir.path().join("Simulation.schema.json"), foreign).unwrap();
        let err = validator
            .validate_value(&json!({"Geometry": {"case": "1D"}}))
            .unwrap_err();
        assert!(
            matches!(err, SchemaValidationError::SchemaResolution { .. }),
            "Expected SchemaResolution, got: {err}"
        );
    }

    #[test]
    fn test_invalid_root_schema() {
        let (dir, validator) = fixture();
        std::fs::write(
            dir.path().join("Simulation.schema.json"),
            r#"{"type": "not-a-type"}"#,
        )
        .unwrap();
        let err = validator.validate_value(&json!({})).unwrap_err();
        assert!(
            matches!(err, SchemaValidationError::SchemaCompile { .. }),
            "Expected SchemaCompile, got: {err}"
        );
    }

    #[test]
    fn test_missing_instance_file() {
        let (dir, validator) = fixture();
        let err = validator
            .validate(&dir.path().join("absent.json"))
            .unwrap_err();
        assert!(matches!(err, SchemaValidationError::FileNotFound { .. }));
    }

    #[test]
    fn test_free_function_matches_method() {
        let (dir, validator) = fixture();
        let path = write_instance(dir.path(), &json!({"Geometry": {"case": "2D"}}));
        assert!(validate(validator.config(), &path).unwrap());
    }

    #[test]
    fn test_schema_edits_are_seen_by_next_call() {
        let (dir, validator) = fixture();
        let instance = json!({"Geometry": {"case": "1D"}});
        assert!(validator.validate_value(&instance).unwrap());

        let stricter = GEOMETRY.replace(r#""required": ["case"]"#, r#""required": ["case", "faceArea"]"#);
        std::fs::write(dir.path().join("Geometry.schema.json"), stricter).unwrap();
        assert!(validator.validate_value(&instance).is_err());
    }
}
