//! Run command implementation for the kinematics launch CLI.

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use kinematics_launch_core::{
    AMENT_PREFIX_PATH, DEFAULT_SHUTDOWN_TIMEOUT, KinematicsTestScenario, LogReadiness,
    PrefixPathResolver, ProcessSupervisor, TestReport,
};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_EXECUTABLE, ARG_NODE_NAME, ARG_PREFIX_PATH, ARG_TEST_PARAMS, ARG_TIMEOUT_SECS, CliError,
    ENV_PREFIX_PATH,
};

/// Process name used when none is configured.
pub(crate) const DEFAULT_NODE_NAME: &str = "fanuc_lma";
/// Test parameter file used when none is configured.
pub(crate) const DEFAULT_TEST_PARAMS: &str = "config/fanuc-lma-test.yaml";

/// CLI arguments for the `run` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Launch the kinematics plugin test executable with the FANUC \
                 robot description, semantic description, kinematics \
                 configuration, joint limits and test parameters, then check \
                 that it stops in time and exits cleanly. Options can come \
                 from CLI flags, configuration files, or environment \
                 variables.",
    about = "Run the kinematics plugin launch test"
)]
#[ortho_config(prefix = "KINEMATICS_LAUNCH")]
pub(crate) struct RunArgs {
    /// Colon-separated install prefixes searched for packages.
    #[arg(long = ARG_PREFIX_PATH, value_name = "prefixes")]
    #[serde(default)]
    pub(crate) prefix_path: Option<String>,
    /// Explicit path to the test executable.
    #[arg(long = ARG_EXECUTABLE, value_name = "path")]
    #[serde(default)]
    pub(crate) executable: Option<Utf8PathBuf>,
    /// Name given to the launched process.
    #[arg(long = ARG_NODE_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) node_name: Option<String>,
    /// Test parameter file inside the `moveit_kinematics` share directory.
    #[arg(long = ARG_TEST_PARAMS, value_name = "path")]
    #[serde(default)]
    pub(crate) test_params: Option<Utf8PathBuf>,
    /// Seconds to wait for the test executable to stop.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl RunArgs {
    pub(crate) fn into_config(self) -> Result<RunConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RunConfig::try_from(merged)
    }
}

/// Resolved `run` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunConfig {
    /// Install prefixes, in search order.
    pub(crate) prefixes: Vec<Utf8PathBuf>,
    /// Explicit test executable, if any.
    pub(crate) executable: Option<Utf8PathBuf>,
    /// Name given to the launched process.
    pub(crate) node_name: String,
    /// Test parameter file inside the kinematics package.
    pub(crate) test_params: Utf8PathBuf,
    /// Window for the shutdown check.
    pub(crate) shutdown_timeout: Duration,
}

impl RunConfig {
    /// Resolve `args`, falling back to `ament_prefix_path` for the prefixes.
    pub(crate) fn from_args(
        args: RunArgs,
        ament_prefix_path: Option<String>,
    ) -> Result<Self, CliError> {
        let prefix_path = args.prefix_path.or(ament_prefix_path).unwrap_or_default();
        let prefixes = PrefixPathResolver::from_path_list(&prefix_path)
            .prefixes()
            .to_vec();
        if prefixes.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_PREFIX_PATH,
                env: ENV_PREFIX_PATH,
            });
        }

        let shutdown_timeout = match args.timeout_secs {
            Some(0) => {
                return Err(CliError::InvalidTimeout {
                    field: ARG_TIMEOUT_SECS,
                });
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_SHUTDOWN_TIMEOUT,
        };

        Ok(Self {
            prefixes,
            executable: args.executable,
            node_name: args
                .node_name
                .unwrap_or_else(|| DEFAULT_NODE_NAME.to_owned()),
            test_params: args
                .test_params
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_TEST_PARAMS)),
            shutdown_timeout,
        })
    }

    fn scenario(&self) -> KinematicsTestScenario {
        KinematicsTestScenario::fanuc_lma()
            .with_node_name(self.node_name.clone())
            .with_test_parameters(self.test_params.clone())
    }
}

impl TryFrom<RunArgs> for RunConfig {
    type Error = CliError;

    fn try_from(args: RunArgs) -> Result<Self, Self::Error> {
        Self::from_args(args, std::env::var(AMENT_PREFIX_PATH).ok())
    }
}

/// Prepare and run the launch test, writing the report to `writer`.
pub(crate) async fn run_with<P>(
    config: &RunConfig,
    supervisor: &P,
    writer: &mut dyn Write,
) -> Result<TestReport, CliError>
where
    P: ProcessSupervisor + ?Sized,
{
    let resolver = PrefixPathResolver::new(config.prefixes.iter().cloned());
    let scenario = config.scenario();
    let executable = config
        .executable
        .clone()
        .map_or_else(|| scenario.locate_executable(&resolver), Ok)?;
    info!("testing {executable} as {}", scenario.node_name());

    let test = scenario
        .prepare(&resolver, executable)?
        .with_shutdown_timeout(config.shutdown_timeout);
    let report = test.run(supervisor, &LogReadiness).await;
    writeln!(writer, "{report}").map_err(CliError::WriteReport)?;
    Ok(report)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
    ament_prefix_path: Option<String>,
) -> Result<RunConfig, CliError> {
    let merged = RunArgs::merge_from_layers(layers).map_err(CliError::from)?;
    RunConfig::from_args(merged, ament_prefix_path)
}
