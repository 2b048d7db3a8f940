//! Error types emitted by the kinematics launch CLI.
//!
//! Every variant is a harness configuration problem. Failing checks are not
//! errors: they are reported through the returned `TestReport`.

use std::sync::Arc;

use kinematics_launch_core::{LaunchTestError, ResolveError};
use thiserror::Error;

/// Errors emitted by the kinematics launch CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The shutdown timeout must be positive.
    #[error("{field} must be greater than zero")]
    InvalidTimeout { field: &'static str },
    /// The test executable could not be located.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The launch description cannot be tested.
    #[error(transparent)]
    LaunchTest(#[from] LaunchTestError),
    /// Writing the report failed.
    #[error("failed to write test report: {0}")]
    WriteReport(#[source] std::io::Error),
}
