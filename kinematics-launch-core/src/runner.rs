//! Drives a launch description through its active and post-shutdown checks.

use std::time::Duration;

use log::info;
use thiserror::Error;

use crate::{
    CaseResult, Directive, EXIT_CODES_CASE, EXIT_OK, LaunchDescription, LaunchFixtures,
    LaunchSession, ProcessSupervisor, ReadinessObserver, TestReport, assert_exit_codes,
    assert_wait_for_shutdown,
};

/// Default window for the shutdown check.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(4000);

/// Problems with the launch test itself, as opposed to failing checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LaunchTestError {
    /// Active tests wait for a readiness signal that would never arrive.
    #[error("launch description has no ready-to-test directive")]
    NoReadinessSignal,
    /// A fixture points at a process the description does not start.
    #[error("fixture {fixture:?} refers to unknown process {process:?}")]
    UnknownFixtureProcess {
        /// Fixture name.
        fixture: String,
        /// Process name the fixture refers to.
        process: String,
    },
}

/// A launch description together with the checks to run against it.
#[derive(Debug, Clone)]
pub struct LaunchTest {
    description: LaunchDescription,
    fixtures: LaunchFixtures,
    shutdown_timeout: Duration,
    allowed_exit_codes: Vec<i32>,
}

impl LaunchTest {
    /// Test `description`, asserting on the processes named by `fixtures`.
    ///
    /// Fails early when the description can never become ready or a fixture
    /// names a process that is not launched.
    pub fn new(
        description: LaunchDescription,
        fixtures: LaunchFixtures,
    ) -> Result<Self, LaunchTestError> {
        if !description.has_directive(Directive::ReadyToTest) {
            return Err(LaunchTestError::NoReadinessSignal);
        }
        if let Some((fixture, process)) = fixtures
            .iter()
            .find(|(_, process)| description.process(process).is_none())
        {
            return Err(LaunchTestError::UnknownFixtureProcess {
                fixture: fixture.to_owned(),
                process: process.to_owned(),
            });
        }
        Ok(Self {
            description,
            fixtures,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            allowed_exit_codes: vec![EXIT_OK],
        })
    }

    /// Override the shutdown window.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Override the exit codes accepted as success.
    #[must_use]
    pub fn with_allowed_exit_codes(mut self, codes: impl Into<Vec<i32>>) -> Self {
        self.allowed_exit_codes = codes.into();
        self
    }

    /// The description under test.
    #[must_use]
    pub const fn description(&self) -> &LaunchDescription {
        &self.description
    }

    /// Window for the shutdown check.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Launch, run the shutdown check for every fixture, shut the session
    /// down and then check exit codes.
    ///
    /// Supervisor faults are reported as failed cases; the run always
    /// produces a report.
    pub async fn run<P>(&self, supervisor: &P, observer: &dyn ReadinessObserver) -> TestReport
    where
        P: ProcessSupervisor + ?Sized,
    {
        let mut session = supervisor.launch(&self.description, observer).await;
        let mut report = TestReport::default();

        for (fixture, process) in self.fixtures.iter() {
            info!("waiting up to {:?} for {fixture} to stop", self.shutdown_timeout);
            report.record(
                assert_wait_for_shutdown(&mut session, process, self.shutdown_timeout).await,
            );
        }

        match session.shutdown().await {
            Ok(outcomes) => {
                report.record(assert_exit_codes(&outcomes, &self.allowed_exit_codes));
            }
            Err(err) => {
                report.record(CaseResult::failed(
                    EXIT_CODES_CASE,
                    format!("session did not shut down cleanly: {err}"),
                ));
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingObserver, ScriptedExit, ScriptedSupervisor, block_on};
    use crate::{ParameterSet, ProcessSpec, SHUTDOWN_CASE};
    use rstest::rstest;

    fn description() -> LaunchDescription {
        LaunchDescription::builder()
            .process(ProcessSpec::new(
                "fanuc_lma",
                "/opt/lib/moveit_kinematics/test_kinematics_plugin",
                ParameterSet::from_groups(Vec::new()),
            ))
            .keep_alive()
            .ready_to_test()
            .build()
    }

    fn fixtures() -> LaunchFixtures {
        LaunchFixtures::default().with_process("fanuc_lma", "fanuc_lma")
    }

    #[rstest]
    fn rejects_descriptions_without_readiness() {
        let description = LaunchDescription::builder().keep_alive().build();
        let err = LaunchTest::new(description, LaunchFixtures::default())
            .expect_err("no readiness directive");
        assert_eq!(err, LaunchTestError::NoReadinessSignal);
    }

    #[rstest]
    fn rejects_fixtures_for_unknown_processes() {
        let fixtures = LaunchFixtures::default().with_process("panda", "panda_kdl");
        let err = LaunchTest::new(description(), fixtures).expect_err("unknown fixture");
        assert!(matches!(err, LaunchTestError::UnknownFixtureProcess { .. }));
    }

    #[rstest]
    #[case::clean_exit(ScriptedExit::Code(0), true, true)]
    #[case::failing_tests(ScriptedExit::Code(1), true, false)]
    #[case::hang(ScriptedExit::Hang, false, false)]
    #[case::not_launched(ScriptedExit::FailToLaunch("no such file".to_owned()), true, false)]
    fn reports_both_checks(
        #[case] script: ScriptedExit,
        #[case] stops: bool,
        #[case] exits_cleanly: bool,
    ) {
        let test = LaunchTest::new(description(), fixtures()).expect("valid launch test");
        let supervisor = ScriptedSupervisor::default().with_script("fanuc_lma", script);
        let observer = RecordingObserver::default();

        let report = block_on(test.run(&supervisor, &observer));

        assert_eq!(observer.signals(), 1);
        assert_eq!(
            report.case(SHUTDOWN_CASE).map(CaseResult::is_passed),
            Some(stops)
        );
        assert_eq!(
            report.case(EXIT_CODES_CASE).map(CaseResult::is_passed),
            Some(exits_cleanly)
        );
        assert_eq!(report.passed(), stops && exits_cleanly);
    }

    #[rstest]
    fn allowed_exit_codes_are_configurable() {
        let test = LaunchTest::new(description(), fixtures())
            .expect("valid launch test")
            .with_allowed_exit_codes([0, 77]);
        let supervisor =
            ScriptedSupervisor::default().with_script("fanuc_lma", ScriptedExit::Code(77));

        let report = block_on(test.run(&supervisor, &RecordingObserver::default()));
        assert!(report.passed());
    }
}
