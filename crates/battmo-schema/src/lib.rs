//! # battmo-schema — Simulation Input Validation
//!
//! Validates battery simulation input documents against the JSON Schema
//! (Draft 2020-12) set shipped with the simulator.
//!
//! ## Pipeline
//!
//! Every call to [`SchemaValidator::validate`] runs the same steps from
//! scratch, with no state carried between calls:
//!
//! 1. [`SchemaRegistry::load`] walks the schema directory and registers each
//!    `*.schema.json` file under `file://./<relative path>` (and its `$id`).
//! 2. The root schema (`Simulation.schema.json` by default) is loaded.
//! 3. A Draft 2020-12 validator is compiled against the root schema, with
//!    the registry resolving cross-schema `$ref`s.
//! 4. The instance is loaded through an [`InstanceLoader`]. The default
//!    [`BattmoInputLoader`] resolves paths against the simulator root and
//!    inlines `{"isFile": true, "filename": ...}` references.
//! 5. The instance is validated and violations are reported with their
//!    JSON Pointer, failing rule, and message.
//!
//! ## Crate Policy
//!
//! - Any failure aborts the call. There is no partial registry and no retry.
//! - Schema `$ref` URIs are resolved locally only; no network access.

pub mod config;
pub mod error;
pub mod loader;
pub mod registry;
pub mod validate;

pub use config::{ConfigError, ReportMode, ValidatorConfig};
pub use error::{SchemaValidationError, ValidationViolations, Violation};
pub use loader::{BattmoInputLoader, InstanceLoader, JsonFileLoader};
pub use registry::SchemaRegistry;
pub use validate::{validate, SchemaValidator};
