//! Test-only doubles: on-disk package trees and a scripted supervisor.
//!
//! The scripted supervisor never spawns anything; each process follows the
//! script registered under its name.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use crate::{
    Directive, LaunchDescription, LaunchEntry, LaunchSession, ProcessOutcome, ProcessSpec,
    ProcessSupervisor, ReadinessObserver, ShutdownWait, SupervisorError, Termination,
};

/// Temporary install prefix laid out like an ament index.
#[derive(Debug)]
pub struct PackageTree {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl PackageTree {
    /// Create an empty prefix.
    ///
    /// # Panics
    ///
    /// Panics when the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create package tree");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self { _dir: dir, root }
    }

    /// Root of the prefix.
    #[must_use]
    pub fn root(&self) -> Utf8PathBuf {
        self.root.clone()
    }

    /// Share directory of `package` inside this prefix.
    #[must_use]
    pub fn share_dir(&self, package: &str) -> Utf8PathBuf {
        self.root.join("share").join(package)
    }

    /// Register `package` in the resource index.
    ///
    /// # Panics
    ///
    /// Panics when the marker cannot be written.
    pub fn install_package(&self, package: &str) {
        let markers = self.root.join("share/ament_index/resource_index/packages");
        std::fs::create_dir_all(&markers).expect("create resource index");
        std::fs::write(markers.join(package), "").expect("write package marker");
        std::fs::create_dir_all(self.share_dir(package)).expect("create share directory");
    }

    /// Write a file below the share directory of `package`.
    ///
    /// # Panics
    ///
    /// Panics when the file cannot be written.
    pub fn write_share_file(&self, package: &str, relative: &str, contents: &str) -> Utf8PathBuf {
        let path = self.share_dir(package).join(relative);
        write_with_parents(&path, contents);
        path
    }

    /// Install an executable shell script at `lib/<package>/<name>`.
    ///
    /// # Panics
    ///
    /// Panics when the script cannot be written.
    pub fn install_script(&self, package: &str, name: &str, body: &str) -> Utf8PathBuf {
        let path = self.root.join("lib").join(package).join(name);
        write_with_parents(&path, &format!("#!/bin/sh\n{body}\n"));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("mark script executable");
        }
        path
    }

    /// Install an executable that exits successfully.
    pub fn install_executable(&self, package: &str, name: &str) -> Utf8PathBuf {
        self.install_script(package, name, "exit 0")
    }

    /// Install every package and input file read by
    /// [`KinematicsTestScenario::fanuc_lma`](crate::KinematicsTestScenario::fanuc_lma).
    pub fn install_fanuc_lma(&self) {
        for (resource, contents) in crate::KinematicsTestScenario::fanuc_lma()
            .resources()
            .into_iter()
            .zip(FANUC_LMA_CONTENTS)
        {
            self.install_package(resource.package());
            self.write_share_file(resource.package(), resource.path().as_str(), contents);
        }
    }

    /// Delete a file below the share directory of `package`.
    ///
    /// # Panics
    ///
    /// Panics when the file cannot be removed.
    pub fn remove_share_file(&self, package: &str, relative: &str) {
        std::fs::remove_file(self.share_dir(package).join(relative)).expect("remove share file");
    }
}

/// Sample contents of the five FANUC LMA inputs, in parameter order.
pub const FANUC_LMA_CONTENTS: [&str; 5] = [
    "<?xml version=\"1.0\"?>\n<robot name=\"fanuc\">\n  <link name=\"base_link\"/>\n</robot>\n",
    "<?xml version=\"1.0\"?>\n<robot name=\"fanuc\">\n  <group name=\"manipulator\">\n    <chain base_link=\"base_link\" tip_link=\"tool0\"/>\n  </group>\n</robot>\n",
    "manipulator:\n  kinematics_solver: lma_kinematics_plugin/LMAKinematicsPlugin\n  kinematics_solver_search_resolution: 0.005\n  kinematics_solver_timeout: 0.005\n",
    "joint_limits:\n  joint_1:\n    has_velocity_limits: true\n    max_velocity: 2.1642\n",
    "tip_link: tool0\nroot_link: base_link\ngroup: manipulator\nikplugin_name: lma_kinematics_plugin/LMAKinematicsPlugin\nnum_fk_tests: 100\nnum_ik_tests: 100\n",
];

impl Default for PackageTree {
    fn default() -> Self {
        Self::new()
    }
}

fn write_with_parents(path: &Utf8Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directories");
    }
    std::fs::write(path, contents).expect("write file");
}

/// Scripted behaviour of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedExit {
    /// Exit with the given code as soon as it is waited on.
    Code(i32),
    /// Never exit on its own.
    Hang,
    /// Fail to start.
    FailToLaunch(String),
}

/// Supervisor double following per-process scripts.
///
/// Processes without a script exit with code 0.
#[derive(Debug, Default)]
pub struct ScriptedSupervisor {
    scripts: HashMap<String, ScriptedExit>,
    launched: RefCell<Vec<ProcessSpec>>,
}

impl ScriptedSupervisor {
    /// Script the process called `name`.
    #[must_use]
    pub fn with_script(mut self, name: impl Into<String>, script: ScriptedExit) -> Self {
        self.scripts.insert(name.into(), script);
        self
    }

    /// Every process spec handed to [`ProcessSupervisor::launch`], in order.
    #[must_use]
    pub fn launched(&self) -> Vec<ProcessSpec> {
        self.launched.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ProcessSupervisor for ScriptedSupervisor {
    type Session = ScriptedSession;

    async fn launch(
        &self,
        description: &LaunchDescription,
        observer: &dyn ReadinessObserver,
    ) -> ScriptedSession {
        let mut session = ScriptedSession::default();
        for entry in description.entries() {
            match entry {
                LaunchEntry::Process(spec) => {
                    self.launched.borrow_mut().push(spec.clone());
                    let script = self
                        .scripts
                        .get(spec.name())
                        .cloned()
                        .unwrap_or(ScriptedExit::Code(0));
                    session.processes.push((spec.name().to_owned(), script, None));
                }
                LaunchEntry::Directive(Directive::KeepAlive) => session.keep_alive = true,
                LaunchEntry::Directive(Directive::ReadyToTest) => {
                    session.ready = true;
                    observer.ready(description);
                }
            }
        }
        session
    }
}

type ScriptedProcess = (String, ScriptedExit, Option<ProcessOutcome>);

/// Session produced by [`ScriptedSupervisor`].
#[derive(Debug, Default)]
pub struct ScriptedSession {
    processes: Vec<ScriptedProcess>,
    keep_alive: bool,
    ready: bool,
    shut_down: bool,
}

impl ScriptedSession {
    fn settle(name: &str, script: &ScriptedExit) -> Option<ProcessOutcome> {
        let termination = match script {
            ScriptedExit::Code(code) => Termination::Exited(*code),
            ScriptedExit::Hang => return None,
            ScriptedExit::FailToLaunch(reason) => Termination::LaunchFailed(reason.clone()),
        };
        Some(ProcessOutcome::new(name, termination, Duration::ZERO))
    }
}

#[async_trait(?Send)]
impl LaunchSession for ScriptedSession {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn is_running(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        self.keep_alive
            || self
                .processes
                .iter()
                .any(|(_, script, _)| matches!(script, ScriptedExit::Hang))
    }

    async fn wait_for_shutdown(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> Result<ShutdownWait, SupervisorError> {
        let (_, script, outcome) = self
            .processes
            .iter_mut()
            .find(|(process, _, _)| process == name)
            .ok_or_else(|| SupervisorError::UnknownProcess {
                name: name.to_owned(),
            })?;
        if outcome.is_none() {
            *outcome = Self::settle(name, script);
        }
        Ok(outcome
            .clone()
            .map_or(ShutdownWait::TimedOut { waited: timeout }, ShutdownWait::Terminated))
    }

    async fn shutdown(&mut self) -> Result<Vec<ProcessOutcome>, SupervisorError> {
        self.shut_down = true;
        self.keep_alive = false;
        Ok(self
            .processes
            .iter_mut()
            .map(|(name, script, outcome)| {
                outcome
                    .get_or_insert_with(|| {
                        Self::settle(name, script).unwrap_or_else(|| {
                            ProcessOutcome::new(name.as_str(), Termination::Killed, Duration::ZERO)
                        })
                    })
                    .clone()
            })
            .collect())
    }
}

/// Readiness observer counting the signals it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    signals: Cell<usize>,
}

impl RecordingObserver {
    /// Number of readiness signals received.
    #[must_use]
    pub fn signals(&self) -> usize {
        self.signals.get()
    }
}

impl ReadinessObserver for RecordingObserver {
    fn ready(&self, _description: &LaunchDescription) {
        self.signals.set(self.signals.get() + 1);
    }
}

/// Drive a future to completion on a current-thread runtime.
///
/// # Panics
///
/// Panics when the runtime cannot be built.
#[cfg(test)]
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build Tokio runtime")
        .block_on(future)
}
