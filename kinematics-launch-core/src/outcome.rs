//! Process outcomes and the assertions run against them.
//!
//! Assertions never return errors: every failure, including supervisor
//! faults, becomes a failed [`CaseResult`] so the run always completes.

use std::fmt;
use std::time::Duration;

use log::{info, warn};

use crate::{LaunchSession, ShutdownWait};

/// Exit code of a successful test executable.
pub const EXIT_OK: i32 = 0;

/// Name of the case checking that the process stops in time.
pub const SHUTDOWN_CASE: &str = "process_stops";
/// Name of the case checking exit codes after shutdown.
pub const EXIT_CODES_CASE: &str = "exit_codes";

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The process exited with a status code.
    Exited(i32),
    /// The process was ended by a signal it did not raise at our request.
    Signalled(i32),
    /// The harness terminated the process during shutdown.
    Killed,
    /// The process never started.
    LaunchFailed(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signalled(signal) => write!(f, "terminated by signal {signal}"),
            Self::Killed => f.write_str("killed during shutdown"),
            Self::LaunchFailed(reason) => write!(f, "failed to launch: {reason}"),
        }
    }
}

/// Exit information captured once a process has terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    name: String,
    termination: Termination,
    runtime: Duration,
}

impl ProcessOutcome {
    /// Record how `name` ended after running for `runtime`.
    pub fn new(name: impl Into<String>, termination: Termination, runtime: Duration) -> Self {
        Self {
            name: name.into(),
            termination,
            runtime,
        }
    }

    /// Process name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the process ended.
    #[must_use]
    pub const fn termination(&self) -> &Termination {
        &self.termination
    }

    /// Time between launch and termination.
    #[must_use]
    pub const fn runtime(&self) -> Duration {
        self.runtime
    }

    /// Exit code, if the process exited on its own.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self.termination {
            Termination::Exited(code) => Some(code),
            _ => None,
        }
    }
}

/// Verdict of a single test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The check held.
    Passed,
    /// The check failed for the given reason.
    Failed(String),
}

/// A named check and its verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    name: String,
    verdict: Verdict,
}

impl CaseResult {
    /// A passing case.
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verdict: Verdict::Passed,
        }
    }

    /// A failing case.
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verdict: Verdict::Failed(reason.into()),
        }
    }

    /// Case name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case verdict.
    #[must_use]
    pub const fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// Whether the case passed.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self.verdict, Verdict::Passed)
    }
}

impl fmt::Display for CaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            Verdict::Passed => write!(f, "PASS {}", self.name),
            Verdict::Failed(reason) => write!(f, "FAIL {}: {reason}", self.name),
        }
    }
}

/// Ordered results of a launch test run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    cases: Vec<CaseResult>,
}

impl TestReport {
    /// Append a case result.
    pub fn record(&mut self, case: CaseResult) {
        if case.is_passed() {
            info!("{case}");
        } else {
            warn!("{case}");
        }
        self.cases.push(case);
    }

    /// Cases in the order they ran.
    #[must_use]
    pub fn cases(&self) -> &[CaseResult] {
        &self.cases
    }

    /// Look up a case by name.
    #[must_use]
    pub fn case(&self, name: &str) -> Option<&CaseResult> {
        self.cases.iter().find(|case| case.name() == name)
    }

    /// Failed cases.
    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.cases.iter().filter(|case| !case.is_passed())
    }

    /// Whether every case passed. An empty report has not passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.cases.is_empty() && self.cases.iter().all(CaseResult::is_passed)
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            writeln!(f, "{case}")?;
        }
        let failed = self.failures().count();
        let total = self.cases.len();
        if self.passed() {
            write!(f, "{total} case(s) passed")
        } else {
            write!(f, "{failed} of {total} case(s) failed")
        }
    }
}

/// Wait up to `timeout` for `process` to stop.
///
/// Fails when the window closes first or when the supervisor cannot wait on
/// the process.
pub async fn assert_wait_for_shutdown<S>(
    session: &mut S,
    process: &str,
    timeout: Duration,
) -> CaseResult
where
    S: LaunchSession + ?Sized,
{
    match session.wait_for_shutdown(process, timeout).await {
        Ok(ShutdownWait::Terminated(outcome)) => {
            info!(
                "process {process} {} after {:?}",
                outcome.termination(),
                outcome.runtime()
            );
            CaseResult::passed(SHUTDOWN_CASE)
        }
        Ok(ShutdownWait::TimedOut { waited }) => CaseResult::failed(
            SHUTDOWN_CASE,
            format!("process {process} did not shut down within {waited:?}"),
        ),
        Err(err) => CaseResult::failed(SHUTDOWN_CASE, err.to_string()),
    }
}

/// Check that every outcome exited with one of `allowed`.
///
/// Processes that were killed, signalled or never launched fail the check.
#[must_use]
pub fn assert_exit_codes(outcomes: &[ProcessOutcome], allowed: &[i32]) -> CaseResult {
    let problems: Vec<String> = outcomes
        .iter()
        .filter(|outcome| {
            outcome
                .exit_code()
                .is_none_or(|code| !allowed.contains(&code))
        })
        .map(|outcome| format!("process {} {}", outcome.name(), outcome.termination()))
        .collect();
    if problems.is_empty() {
        CaseResult::passed(EXIT_CODES_CASE)
    } else {
        CaseResult::failed(EXIT_CODES_CASE, problems.join("; "))
    }
}
