//! # Validate Command
//!
//! Checks one simulation input file against the schema set.
//!
//! Exit codes: 0 when valid (nothing is printed), 1 when the input violates
//! the schema (violations go to stderr, or to stdout as JSON with `--json`),
//! 2 for operational errors surfaced through `anyhow`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use battmo_schema::config::default_schema_dir;
use battmo_schema::{
    ReportMode, SchemaValidationError, SchemaValidator, ValidationViolations, ValidatorConfig,
};

/// Arguments for `battmo-validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Simulation input file (JSON, or YAML by extension).
    #[arg(value_name = "INSTANCE")]
    pub instance: PathBuf,

    /// Directory holding the `*.schema.json` files.
    #[arg(long, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// Simulator root. Relative inputs and includes are resolved against it,
    /// and it implies `<DIR>/Utilities/JsonSchemas` unless --schema-dir is given.
    #[arg(long, value_name = "DIR")]
    pub battmo_dir: Option<PathBuf>,

    /// File name of the root schema inside the schema directory.
    #[arg(long, value_name = "NAME")]
    pub root_schema: Option<String>,

    /// Stop at the first violation.
    #[arg(long)]
    pub first_error: bool,

    /// Print violations to stdout as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Apply command-line overrides on top of `base`.
pub fn resolve_config(args: &ValidateArgs, base: ValidatorConfig) -> ValidatorConfig {
    let mut config = base;
    if let Some(ref battmo_dir) = args.battmo_dir {
        if args.schema_dir.is_none() {
            config.schema_dir = default_schema_dir(battmo_dir);
        }
        config = config.with_battmo_dir(battmo_dir);
    }
    if let Some(ref schema_dir) = args.schema_dir {
        config.schema_dir = schema_dir.clone();
    }
    if let Some(ref root_schema) = args.root_schema {
        config = config.with_root_schema(root_schema);
    }
    if args.first_error {
        config = config.with_report(ReportMode::First);
    }
    config
}

/// Execute the command with configuration from the environment.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let base = ValidatorConfig::from_env().context("invalid environment configuration")?;
    run_validate_with(args, base)
}

/// Rendered result of one validation, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub exit_code: u8,
    pub stdout: String,
    pub stderr: String,
}

impl Report {
    fn valid() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Execute the command on top of an explicit base configuration.
pub fn run_validate_with(args: &ValidateArgs, base: ValidatorConfig) -> Result<u8> {
    let report = check_instance(args, base)?;
    if !report.stdout.is_empty() {
        print!("{}", report.stdout);
    }
    if !report.stderr.is_empty() {
        eprint!("{}", report.stderr);
    }
    Ok(report.exit_code)
}

/// Validate and render the outcome without printing it.
pub fn check_instance(args: &ValidateArgs, base: ValidatorConfig) -> Result<Report> {
    let config = resolve_config(args, base);
    tracing::debug!(
        schema_dir = %config.schema_dir.display(),
        root_schema = %config.root_schema,
        "resolved configuration"
    );

    let validator = SchemaValidator::new(config);
    match validator.validate(&args.instance) {
        Ok(_) => Ok(Report::valid()),
        Err(SchemaValidationError::ValidationFailed { schema, violations }) => {
            render_failure(&args.instance, &schema, &violations, args.json)
        }
        Err(e) => Err(e).with_context(|| format!("cannot validate {}", args.instance.display())),
    }
}

/// Render violations as a JSON array on stdout, or as `FAIL:` text on stderr.
pub fn render_failure(
    instance: &Path,
    schema: &str,
    violations: &ValidationViolations,
    json: bool,
) -> Result<Report> {
    let mut report = Report {
        exit_code: 1,
        stdout: String::new(),
        stderr: String::new(),
    };
    if json {
        let rendered =
            serde_json::to_string_pretty(violations).context("failed to serialize violations")?;
        report.stdout = format!("{rendered}\n");
    } else {
        report.stderr = format!(
            "FAIL: {} does not conform to {schema}:\n{violations}\n",
            instance.display()
        );
    }
    Ok(report)
}
