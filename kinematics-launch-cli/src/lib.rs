//! Command-line interface for the kinematics plugin launch test.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use kinematics_launch_core::TestReport;
use kinematics_launch_supervisor::TokioSupervisor;

mod error;
mod run;

pub use error::CliError;
use run::RunArgs;

pub(crate) const ARG_PREFIX_PATH: &str = "prefix-path";
pub(crate) const ARG_EXECUTABLE: &str = "executable";
pub(crate) const ARG_NODE_NAME: &str = "node-name";
pub(crate) const ARG_TEST_PARAMS: &str = "test-params";
pub(crate) const ARG_TIMEOUT_SECS: &str = "timeout-secs";
pub(crate) const ENV_PREFIX_PATH: &str = "KINEMATICS_LAUNCH_CMDS_RUN_PREFIX_PATH";

/// Exit status when every check passed.
pub const EXIT_PASSED: u8 = 0;
/// Exit status when at least one check failed.
pub const EXIT_FAILED: u8 = 1;
/// Exit status when the harness could not be configured.
pub const EXIT_HARNESS_ERROR: u8 = 2;

/// Run the CLI with the current process arguments and environment.
///
/// Returns the report of the launch test; failing checks are not errors.
pub async fn run() -> Result<TestReport, CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Run(args) => {
            let config = args.into_config()?;
            run::run_with(&config, &TokioSupervisor::new(), &mut std::io::stdout()).await
        }
    }
}

/// Exit status summarising `report`.
#[must_use]
pub fn report_exit_code(report: &TestReport) -> u8 {
    if report.passed() {
        EXIT_PASSED
    } else {
        EXIT_FAILED
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "kinematics-launch",
    about = "Launch tests for kinematics solver plugins",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Launch the plugin test executable and check its outcome.
    Run(RunArgs),
}

#[cfg(test)]
mod tests;
