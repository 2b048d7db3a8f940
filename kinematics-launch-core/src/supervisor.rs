//! Boundary between the harness and a process-supervision engine.

use std::time::Duration;

use async_trait::async_trait;
use log::info;
use thiserror::Error;

use crate::{LaunchDescription, ProcessOutcome};

/// Errors reported by a supervision engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SupervisorError {
    /// The session does not manage a process with this name.
    #[error("no launched process is named {name:?}")]
    UnknownProcess {
        /// Requested process name.
        name: String,
    },
    /// Waiting on a process failed at the OS level.
    #[error("failed to wait for process {name:?}: {source}")]
    Wait {
        /// Process being waited on.
        name: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result of waiting for a process to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownWait {
    /// The process terminated within the window.
    Terminated(ProcessOutcome),
    /// The process was still running when the window closed.
    TimedOut {
        /// Length of the window.
        waited: Duration,
    },
}

/// Receives the readiness signal emitted by a launch.
pub trait ReadinessObserver {
    /// Setup is complete; active tests may start.
    fn ready(&self, description: &LaunchDescription);
}

/// Readiness observer that records the signal in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReadiness;

impl ReadinessObserver for LogReadiness {
    fn ready(&self, description: &LaunchDescription) {
        info!(
            "launch ready to test ({} process(es))",
            description.processes().count()
        );
    }
}

/// Starts every process of a [`LaunchDescription`] and hands back a session.
///
/// Launching a single process must not fail the whole launch: a process that
/// cannot be started is recorded as terminated with
/// [`Termination::LaunchFailed`](crate::Termination::LaunchFailed).
#[async_trait(?Send)]
pub trait ProcessSupervisor {
    /// Session type produced by this engine.
    type Session: LaunchSession;

    /// Start the description's entries in order.
    async fn launch(
        &self,
        description: &LaunchDescription,
        observer: &dyn ReadinessObserver,
    ) -> Self::Session;
}

/// A running launch: exclusive owner of its processes.
#[async_trait(?Send)]
pub trait LaunchSession {
    /// Whether the readiness directive has been processed.
    fn is_ready(&self) -> bool;

    /// Whether the session is still up: a process is running or a
    /// keep-alive directive holds it open.
    fn is_running(&mut self) -> bool;

    /// Wait up to `timeout` for the process called `name` to terminate.
    async fn wait_for_shutdown(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> Result<ShutdownWait, SupervisorError>;

    /// Release any keep-alive, terminate remaining processes and reap them.
    ///
    /// Returns one outcome per launched process, in launch order. Calling it
    /// again returns the same outcomes.
    async fn shutdown(&mut self) -> Result<Vec<ProcessOutcome>, SupervisorError>;
}
