//! # battmo-cli — Input Validation Command
//!
//! Provides the `battmo-validate` command, the command-line counterpart of
//! calling the validator from the simulator's scripting environment:
//!
//! ```bash
//! battmo-validate Examples/JsonDataFiles/p2d_40.json
//! BATTMO_DIR=/opt/BattMo battmo-validate -v input.json
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; validation lives in `battmo-schema`.
//! - A valid input prints nothing and exits 0.

pub mod validate;
