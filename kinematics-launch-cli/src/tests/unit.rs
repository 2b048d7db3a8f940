//! Focused unit tests covering run command configuration and execution.

use super::helpers::{block_on, installed_prefix};
use super::*;
use crate::run::{
    DEFAULT_NODE_NAME, DEFAULT_TEST_PARAMS, RunConfig, config_from_layers_for_test, run_with,
};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use kinematics_launch_core::test_support::{ScriptedExit, ScriptedSession, ScriptedSupervisor};
use kinematics_launch_core::{
    DEFAULT_SHUTDOWN_TIMEOUT, LaunchDescription, ProcessSupervisor, ReadinessObserver,
    ResolveError,
};
use rstest::rstest;
use std::cell::Cell;
use std::sync::mpsc;
use std::time::Duration;

fn args_with_prefix(prefix: &str) -> RunArgs {
    RunArgs {
        prefix_path: Some(prefix.to_owned()),
        ..RunArgs::default()
    }
}

#[rstest]
#[case::unset(None)]
#[case::empty(Some(String::new()))]
#[case::only_separators(Some(" : :".to_owned()))]
fn converting_without_prefixes_errors(#[case] ament: Option<String>) {
    let err = RunConfig::from_args(RunArgs::default(), ament).expect_err("missing prefixes");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_PREFIX_PATH);
            assert_eq!(env, ENV_PREFIX_PATH);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn defaults_follow_the_fanuc_lma_launch() {
    let config = RunConfig::from_args(args_with_prefix("/opt/ros/humble"), None)
        .expect("config should build");
    assert_eq!(config.prefixes, [Utf8PathBuf::from("/opt/ros/humble")]);
    assert_eq!(config.executable, None);
    assert_eq!(config.node_name, DEFAULT_NODE_NAME);
    assert_eq!(config.test_params, DEFAULT_TEST_PARAMS);
    assert_eq!(config.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);
}

#[rstest]
fn explicit_prefix_path_wins_over_ament_prefix_path() {
    let config = RunConfig::from_args(
        args_with_prefix("/opt/ws/install:/opt/ros/humble"),
        Some("/usr/local".to_owned()),
    )
    .expect("config should build");
    assert_eq!(
        config.prefixes,
        [
            Utf8PathBuf::from("/opt/ws/install"),
            Utf8PathBuf::from("/opt/ros/humble"),
        ]
    );
}

#[rstest]
fn ament_prefix_path_is_the_fallback() {
    let config = RunConfig::from_args(RunArgs::default(), Some("/usr/local".to_owned()))
        .expect("config should build");
    assert_eq!(config.prefixes, [Utf8PathBuf::from("/usr/local")]);
}

#[rstest]
#[case::zero(Some(0), None)]
#[case::custom(Some(30), Some(Duration::from_secs(30)))]
fn timeout_must_be_positive(#[case] secs: Option<u64>, #[case] expected: Option<Duration>) {
    let args = RunArgs {
        timeout_secs: secs,
        ..args_with_prefix("/opt/ros/humble")
    };
    match (RunConfig::from_args(args, None), expected) {
        (Ok(config), Some(timeout)) => assert_eq!(config.shutdown_timeout, timeout),
        (Err(CliError::InvalidTimeout { field }), None) => assert_eq!(field, ARG_TIMEOUT_SECS),
        (other, _) => panic!("unexpected outcome {other:?}"),
    }
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "timeout_secs": "soon" }));

    let err = config_from_layers_for_test(composer.layers(), None)
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "prefix_path": "/from/file",
            "node_name": "fanuc_kdl",
            "timeout_secs": 60,
        }),
        None,
    );
    composer.push_environment(json!({
        "prefix_path": "/from/env",
        "test_params": "config/fanuc-kdl-test.yaml",
    }));
    composer.push_cli(json!({ "timeout_secs": 5 }));

    let config = config_from_layers_for_test(composer.layers(), Some("/from/ament".to_owned()))
        .expect("merged config should build");
    assert_eq!(config.prefixes, [Utf8PathBuf::from("/from/env")]);
    assert_eq!(config.node_name, "fanuc_kdl");
    assert_eq!(config.test_params, "config/fanuc-kdl-test.yaml");
    assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
}

#[rstest]
fn run_with_reports_unresolvable_executable() {
    let tree = kinematics_launch_core::test_support::PackageTree::new();
    let config = RunConfig::from_args(args_with_prefix(tree.root().as_str()), None)
        .expect("config should build");
    let mut output = Vec::new();

    let err = block_on(run_with(
        &config,
        &ScriptedSupervisor::default(),
        &mut output,
    ))
    .expect_err("executable should not resolve");
    match err {
        CliError::Resolve(ResolveError::PackageNotFound { package }) => {
            assert_eq!(package, "moveit_kinematics");
        }
        other => panic!("expected Resolve, found {other:?}"),
    }
    assert!(output.is_empty());
}

#[rstest]
#[case::pass(ScriptedExit::Code(0), EXIT_PASSED)]
#[case::fail(ScriptedExit::Code(1), EXIT_FAILED)]
#[case::hang(ScriptedExit::Hang, EXIT_FAILED)]
fn report_decides_exit_status(#[case] script: ScriptedExit, #[case] expected: u8) {
    let tree = installed_prefix();
    let config = RunConfig::from_args(args_with_prefix(tree.root().as_str()), None)
        .expect("config should build");
    let supervisor = ScriptedSupervisor::default().with_script(DEFAULT_NODE_NAME, script);
    let mut output = Vec::new();

    let report =
        block_on(run_with(&config, &supervisor, &mut output)).expect("launch test should run");

    assert_eq!(report_exit_code(&report), expected);
    let printed = String::from_utf8(output).expect("utf-8 report");
    assert_eq!(printed, format!("{report}\n"));
    let launched = supervisor.launched();
    let [process] = launched.as_slice() else {
        panic!("expected one launched process, found {launched:?}");
    };
    assert_eq!(
        process.executable(),
        tree.root().join("lib/moveit_kinematics/test_kinematics_plugin")
    );
}

#[rstest]
fn explicit_executable_skips_resolution() {
    let tree = kinematics_launch_core::test_support::PackageTree::new();
    let args = RunArgs {
        executable: Some(Utf8PathBuf::from("/opt/custom/test_kinematics_plugin")),
        ..args_with_prefix(tree.root().as_str())
    };
    let config = RunConfig::from_args(args, None).expect("config should build");
    let supervisor = ScriptedSupervisor::default();

    let report = block_on(run_with(&config, &supervisor, &mut Vec::new()))
        .expect("launch test should run");

    assert!(report.passed(), "{report}");
    let launched = supervisor.launched();
    assert_eq!(
        launched.first().map(|process| process.executable().as_str()),
        Some("/opt/custom/test_kinematics_plugin")
    );
}

#[rstest]
fn parses_run_subcommand_flags() {
    let cli = Cli::try_parse_from([
        "kinematics-launch",
        "run",
        "--prefix-path",
        "/opt/ros/humble",
        "--node-name",
        "fanuc_kdl",
        "--timeout-secs",
        "12",
    ])
    .expect("arguments should parse");
    let Command::Run(args) = cli.command;
    assert_eq!(args.prefix_path.as_deref(), Some("/opt/ros/humble"));
    assert_eq!(args.node_name.as_deref(), Some("fanuc_kdl"));
    assert_eq!(args.timeout_secs, Some(12));
    assert_eq!(args.executable, None);
}

/// Records whether another thread could lock stdout while processes launched.
#[derive(Debug, Default)]
struct StdoutCheckingSupervisor {
    inner: ScriptedSupervisor,
    stdout_free: Cell<Option<bool>>,
}

#[async_trait(?Send)]
impl ProcessSupervisor for StdoutCheckingSupervisor {
    type Session = ScriptedSession;

    async fn launch(
        &self,
        description: &LaunchDescription,
        observer: &dyn ReadinessObserver,
    ) -> ScriptedSession {
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let _stdout = std::io::stdout().lock();
            sender.send(()).ok();
        });
        let locked = receiver.recv_timeout(Duration::from_secs(5)).is_ok();
        self.stdout_free.set(Some(locked));
        self.inner.launch(description, observer).await
    }
}

#[rstest]
fn stdout_is_only_locked_to_write_the_report() {
    let tree = installed_prefix();
    let config = RunConfig::from_args(args_with_prefix(tree.root().as_str()), None)
        .expect("config should build");
    let supervisor = StdoutCheckingSupervisor::default();

    let report = block_on(run_with(&config, &supervisor, &mut std::io::stdout()))
        .expect("launch test should run");

    assert!(report.passed(), "{report}");
    assert_eq!(supervisor.stdout_free.get(), Some(true));
}
