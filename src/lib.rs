//! Facade crate for the kinematics plugin launch test harness.
//!
//! This crate re-exports the core harness types and exposes the Tokio
//! supervision engine behind a feature flag.

#![forbid(unsafe_code)]

pub use kinematics_launch_core::{
    AMENT_PREFIX_PATH, CaseResult, DEFAULT_SHUTDOWN_TIMEOUT, Directive, EXIT_CODES_CASE, EXIT_OK,
    Fragments, GroupLayout, KINEMATICS_PACKAGE, KinematicsTestScenario, LaunchDescription,
    LaunchDescriptionBuilder, LaunchEntry, LaunchFixtures, LaunchSession, LaunchTest,
    LaunchTestError, LoadError, Loaded, LogReadiness, OutputMode, ParameterError, ParameterGroup,
    ParameterSet, PrefixPathResolver, ProcessOutcome, ProcessSpec, ProcessSupervisor,
    ROBOT_DESCRIPTION, ROBOT_DESCRIPTION_KINEMATICS, ROBOT_DESCRIPTION_PLANNING,
    ROBOT_DESCRIPTION_SEMANTIC, ReadinessObserver, ResolveError, ResourceRef, SHUTDOWN_CASE,
    ShareResolver, ShutdownWait, SupervisorError, TEST_EXECUTABLE, Termination, TestReport,
    Verdict, assert_exit_codes, assert_wait_for_shutdown, load_file, load_yaml, locate_executable,
    try_load_file, try_load_yaml,
};

#[cfg(feature = "test-support")]
pub use kinematics_launch_core::test_support;

#[cfg(feature = "supervisor-tokio")]
pub use kinematics_launch_supervisor::{
    PARAMS_FILE_SUFFIX, TokioSession, TokioSupervisor, ros_arguments,
};
