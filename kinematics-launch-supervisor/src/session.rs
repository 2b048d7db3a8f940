//! Launch sessions owning real child processes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use camino::Utf8PathBuf;
use kinematics_launch_core::{
    Directive, LaunchDescription, LaunchEntry, LaunchSession, ProcessOutcome, ProcessSpec,
    ProcessSupervisor, ReadinessObserver, ShutdownWait, SupervisorError, Termination,
};
use log::{info, warn};
use tempfile::TempDir;
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::command::{self, Spawned, StartError};

/// How long a killed child may take to be reaped.
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long piped output may take to drain once its process is gone.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Spawns described processes as children of the harness.
///
/// Each launch writes its parameter files into a fresh temporary directory
/// that lives as long as the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSupervisor;

impl TokioSupervisor {
    /// Create a supervisor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn start(spec: &ProcessSpec, params_dir: Result<&Utf8PathBuf, &str>) -> ManagedProcess {
        let started = Instant::now();
        let mut forwarders = Vec::new();
        let state = match Self::spawn(spec, params_dir) {
            Ok(spawned) => {
                info!("started process {} ({})", spec.name(), spec.executable());
                forwarders = spawned.forwarders;
                ProcessState::Running(spawned.child)
            }
            Err(err) => {
                warn!("process {} did not start: {err}", spec.name());
                ProcessState::Terminated(ProcessOutcome::new(
                    spec.name(),
                    Termination::LaunchFailed(err.to_string()),
                    started.elapsed(),
                ))
            }
        };
        ManagedProcess {
            name: spec.name().to_owned(),
            started,
            state,
            forwarders,
        }
    }

    fn spawn(
        spec: &ProcessSpec,
        params_dir: Result<&Utf8PathBuf, &str>,
    ) -> Result<Spawned, StartError> {
        let dir = params_dir.map_err(|reason| StartError::ParamsDirectory(reason.to_owned()))?;
        let params_file = command::write_params_file(spec, dir)?;
        command::spawn(spec, &params_file)
    }
}

#[async_trait(?Send)]
impl ProcessSupervisor for TokioSupervisor {
    type Session = TokioSession;

    async fn launch(
        &self,
        description: &LaunchDescription,
        observer: &dyn ReadinessObserver,
    ) -> TokioSession {
        let params_dir = ParamsDir::create();
        let mut session = TokioSession::default();
        for entry in description.entries() {
            match entry {
                LaunchEntry::Process(spec) => {
                    let process = Self::start(spec, params_dir.path());
                    session.processes.push(process);
                }
                LaunchEntry::Directive(Directive::KeepAlive) => session.keep_alive = true,
                LaunchEntry::Directive(Directive::ReadyToTest) => {
                    session.ready = true;
                    observer.ready(description);
                }
            }
        }
        session.params_dir = params_dir.into_dir();
        session
    }
}

/// Temporary directory for parameter files, or why it could not be made.
enum ParamsDir {
    Ready { dir: TempDir, path: Utf8PathBuf },
    Unavailable(String),
}

impl ParamsDir {
    fn create() -> Self {
        let dir = match tempfile::Builder::new()
            .prefix("kinematics-launch-")
            .tempdir()
        {
            Ok(dir) => dir,
            Err(err) => {
                warn!("cannot create parameter directory: {err}");
                return Self::Unavailable(err.to_string());
            }
        };
        match Utf8PathBuf::from_path_buf(dir.path().to_path_buf()) {
            Ok(path) => Self::Ready { dir, path },
            Err(path) => Self::Unavailable(format!("{} is not valid UTF-8", path.display())),
        }
    }

    fn path(&self) -> Result<&Utf8PathBuf, &str> {
        match self {
            Self::Ready { path, .. } => Ok(path),
            Self::Unavailable(reason) => Err(reason.as_str()),
        }
    }

    fn into_dir(self) -> Option<TempDir> {
        match self {
            Self::Ready { dir, .. } => Some(dir),
            Self::Unavailable(_) => None,
        }
    }
}

#[derive(Debug)]
enum ProcessState {
    Running(Child),
    Terminated(ProcessOutcome),
}

#[derive(Debug)]
struct ManagedProcess {
    name: String,
    started: Instant,
    state: ProcessState,
    forwarders: Vec<JoinHandle<()>>,
}

impl ManagedProcess {
    fn settle(&mut self, termination: Termination) -> ProcessOutcome {
        let outcome = ProcessOutcome::new(self.name.as_str(), termination, self.started.elapsed());
        info!("process {} {}", self.name, outcome.termination());
        self.state = ProcessState::Terminated(outcome.clone());
        outcome
    }

    fn poll(&mut self) -> Result<Option<ProcessOutcome>, SupervisorError> {
        let status = match &mut self.state {
            ProcessState::Terminated(outcome) => return Ok(Some(outcome.clone())),
            ProcessState::Running(child) => child.try_wait(),
        };
        match status {
            Ok(Some(status)) => Ok(Some(self.settle(command::termination(status)))),
            Ok(None) => Ok(None),
            Err(source) => Err(SupervisorError::Wait {
                name: self.name.clone(),
                source,
            }),
        }
    }

    async fn wait(&mut self, timeout: Duration) -> Result<ShutdownWait, SupervisorError> {
        let waited = match &mut self.state {
            ProcessState::Terminated(outcome) => {
                return Ok(ShutdownWait::Terminated(outcome.clone()));
            }
            ProcessState::Running(child) => tokio::time::timeout(timeout, child.wait()).await,
        };
        match waited {
            Ok(Ok(status)) => Ok(ShutdownWait::Terminated(
                self.settle(command::termination(status)),
            )),
            Ok(Err(source)) => Err(SupervisorError::Wait {
                name: self.name.clone(),
                source,
            }),
            Err(_) => Ok(ShutdownWait::TimedOut { waited: timeout }),
        }
    }

    /// Terminate the process if it is still running and record its outcome.
    ///
    /// Never fails: problems polling, killing or reaping the child are logged
    /// and the best known termination is recorded.
    async fn stop(&mut self) -> ProcessOutcome {
        let outcome = match &mut self.state {
            ProcessState::Terminated(outcome) => outcome.clone(),
            ProcessState::Running(child) => {
                let termination = reap(&self.name, child).await;
                self.drain_output().await;
                return self.settle(termination);
            }
        };
        self.drain_output().await;
        outcome
    }

    async fn drain_output(&mut self) {
        for mut forwarder in self.forwarders.drain(..) {
            if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut forwarder)
                .await
                .is_err()
            {
                warn!("output of process {} still open after exit", self.name);
                forwarder.abort();
            }
        }
    }
}

/// Kill `child` unless it already exited, then collect its exit status.
async fn reap(name: &str, child: &mut Child) -> Termination {
    match child.try_wait() {
        Ok(Some(status)) => return command::termination(status),
        Ok(None) => {}
        Err(err) => warn!("cannot poll process {name}: {err}"),
    }
    let kill_sent = match child.start_kill() {
        Ok(()) => true,
        Err(err) => {
            warn!("cannot kill process {name}: {err}");
            false
        }
    };
    match tokio::time::timeout(REAP_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) => match command::termination(status) {
            Termination::Signalled(_) if kill_sent => Termination::Killed,
            other => other,
        },
        Ok(Err(err)) => {
            warn!("cannot reap process {name}: {err}");
            Termination::Killed
        }
        Err(_) => {
            warn!("process {name} not reaped within {REAP_TIMEOUT:?}");
            Termination::Killed
        }
    }
}

/// Session produced by [`TokioSupervisor`].
///
/// Children are killed when the session is dropped.
#[derive(Debug, Default)]
pub struct TokioSession {
    processes: Vec<ManagedProcess>,
    keep_alive: bool,
    ready: bool,
    params_dir: Option<TempDir>,
}

impl TokioSession {
    /// Directory holding this session's parameter files, if it was created.
    #[must_use]
    pub fn params_dir(&self) -> Option<Utf8PathBuf> {
        self.params_dir
            .as_ref()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).ok())
    }
}

#[async_trait(?Send)]
impl LaunchSession for TokioSession {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn is_running(&mut self) -> bool {
        if self.keep_alive {
            return true;
        }
        self.processes
            .iter_mut()
            .any(|process| matches!(process.poll(), Ok(None)))
    }

    async fn wait_for_shutdown(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> Result<ShutdownWait, SupervisorError> {
        let process = self
            .processes
            .iter_mut()
            .find(|process| process.name == name)
            .ok_or_else(|| SupervisorError::UnknownProcess {
                name: name.to_owned(),
            })?;
        process.wait(timeout).await
    }

    async fn shutdown(&mut self) -> Result<Vec<ProcessOutcome>, SupervisorError> {
        self.keep_alive = false;
        let mut outcomes = Vec::with_capacity(self.processes.len());
        for process in &mut self.processes {
            outcomes.push(process.stop().await);
        }
        Ok(outcomes)
    }
}
