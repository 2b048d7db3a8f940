//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use kinematics_launch_cli::{CliError, EXIT_HARNESS_ERROR, report_exit_code, run};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();
    match run().await {
        Ok(report) => ExitCode::from(report_exit_code(&report)),
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("kinematics-launch: {err}");
            ExitCode::from(EXIT_HARNESS_ERROR)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("kinematics-launch: failed to initialise logging: {err}");
    }
}
