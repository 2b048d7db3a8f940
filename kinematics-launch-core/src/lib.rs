//! Core types for launching the kinematics plugin test executable.
//!
//! The crate covers the whole harness except the process plumbing itself:
//! resolving packages, loading configuration fragments, assembling the
//! parameter set, describing the launch and judging its outcome. Spawning
//! processes is left to an implementation of [`ProcessSupervisor`].
//!
//! # Examples
//!
//! ```
//! use camino::Utf8PathBuf;
//! use kinematics_launch_core::{KinematicsTestScenario, PrefixPathResolver};
//!
//! let resolver = PrefixPathResolver::from_path_list("/nonexistent/prefix");
//! let test = KinematicsTestScenario::fanuc_lma()
//!     .prepare(&resolver, Utf8PathBuf::from("/nonexistent/test_kinematics_plugin"))?;
//! assert_eq!(test.description().processes().count(), 1);
//! # Ok::<(), kinematics_launch_core::LaunchTestError>(())
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod launch;
mod loader;
mod outcome;
mod params;
mod resolver;
mod resource;
mod runner;
mod scenario;
mod supervisor;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use launch::{
    Directive, LaunchDescription, LaunchDescriptionBuilder, LaunchEntry, LaunchFixtures,
    OutputMode, ProcessSpec,
};
pub use loader::{LoadError, Loaded, load_file, load_yaml, try_load_file, try_load_yaml};
pub use outcome::{
    CaseResult, EXIT_CODES_CASE, EXIT_OK, ProcessOutcome, SHUTDOWN_CASE, Termination, TestReport,
    Verdict, assert_exit_codes, assert_wait_for_shutdown,
};
pub use params::{
    Fragments, GroupLayout, ParameterError, ParameterGroup, ParameterSet, ROBOT_DESCRIPTION,
    ROBOT_DESCRIPTION_KINEMATICS, ROBOT_DESCRIPTION_PLANNING, ROBOT_DESCRIPTION_SEMANTIC,
};
pub use resolver::{
    AMENT_PREFIX_PATH, PrefixPathResolver, ResolveError, ShareResolver, locate_executable,
};
pub use resource::ResourceRef;
pub use runner::{DEFAULT_SHUTDOWN_TIMEOUT, LaunchTest, LaunchTestError};
pub use scenario::{KINEMATICS_PACKAGE, KinematicsTestScenario, TEST_EXECUTABLE};
pub use supervisor::{
    LaunchSession, LogReadiness, ProcessSupervisor, ReadinessObserver, ShutdownWait,
    SupervisorError,
};
