//! Building and spawning the child command line.

use std::process::{ExitStatus, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use kinematics_launch_core::{OutputMode, ParameterError, ProcessSpec, Termination};
use log::{debug, info};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Suffix of the parameter file written for each process.
pub const PARAMS_FILE_SUFFIX: &str = ".params.yaml";

/// Reasons a described process never started.
#[derive(Debug, Error)]
pub(crate) enum StartError {
    #[error("cannot create parameter directory: {0}")]
    ParamsDirectory(String),
    #[error("cannot render parameters: {0}")]
    Render(#[from] ParameterError),
    #[error("cannot write parameter file {path}: {source}")]
    WriteParams {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot spawn {executable}: {source}")]
    Spawn {
        executable: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Arguments naming the process and pointing it at its parameter file.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use kinematics_launch_supervisor::ros_arguments;
///
/// let args = ros_arguments("fanuc_lma", Utf8Path::new("/tmp/fanuc_lma.params.yaml"));
/// assert_eq!(
///     args,
///     [
///         "--ros-args",
///         "-r",
///         "__node:=fanuc_lma",
///         "--params-file",
///         "/tmp/fanuc_lma.params.yaml",
///     ]
/// );
/// ```
#[must_use]
pub fn ros_arguments(name: &str, params_file: &Utf8Path) -> Vec<String> {
    vec![
        "--ros-args".to_owned(),
        "-r".to_owned(),
        format!("__node:={name}"),
        "--params-file".to_owned(),
        params_file.as_str().to_owned(),
    ]
}

/// Render the parameters of `spec` into `params_dir`.
pub(crate) fn write_params_file(
    spec: &ProcessSpec,
    params_dir: &Utf8Path,
) -> Result<Utf8PathBuf, StartError> {
    let document = spec.parameters().render(spec.name())?;
    let path = params_dir.join(format!("{}{PARAMS_FILE_SUFFIX}", spec.name()));
    kinematics_launch_fs::write_utf8_file(&path, &document).map_err(|source| {
        StartError::WriteParams {
            path: path.clone(),
            source,
        }
    })?;
    Ok(path)
}

/// A started child and the tasks forwarding its piped output.
#[derive(Debug)]
pub(crate) struct Spawned {
    pub(crate) child: Child,
    pub(crate) forwarders: Vec<JoinHandle<()>>,
}

/// Spawn `spec` reading its parameters from `params_file`.
pub(crate) fn spawn(spec: &ProcessSpec, params_file: &Utf8Path) -> Result<Spawned, StartError> {
    let mut command = Command::new(spec.executable());
    command
        .args(spec.arguments())
        .args(ros_arguments(spec.name(), params_file))
        .stdin(Stdio::null())
        .kill_on_drop(true);
    match spec.output() {
        OutputMode::Screen => {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        OutputMode::Log => {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
    }
    debug!("spawning {command:?}");

    let mut child = command.spawn().map_err(|source| StartError::Spawn {
        executable: spec.executable().to_path_buf(),
        source,
    })?;
    let mut forwarders = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        forwarders.push(forward_output(spec.name().to_owned(), stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        forwarders.push(forward_output(spec.name().to_owned(), stderr));
    }
    Ok(Spawned { child, forwarders })
}

fn forward_output<R>(name: String, stream: R) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!("[{name}] {line}");
        }
    })
}

/// Map an OS exit status onto a [`Termination`].
pub(crate) fn termination(status: ExitStatus) -> Termination {
    status
        .code()
        .map_or_else(|| Termination::Signalled(signal(status)), Termination::Exited)
}

#[cfg(unix)]
fn signal(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().unwrap_or_default()
}

#[cfg(not(unix))]
const fn signal(_status: ExitStatus) -> i32 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinematics_launch_core::{ParameterGroup, ParameterSet};
    use rstest::rstest;

    fn spec() -> ProcessSpec {
        ProcessSpec::new(
            "fanuc_lma",
            "/opt/lib/moveit_kinematics/test_kinematics_plugin",
            ParameterSet::from_groups(vec![ParameterGroup::keyed("robot_description", None)]),
        )
    }

    #[rstest]
    fn params_file_is_named_after_the_process() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf-8 tempdir");

        let path = write_params_file(&spec(), root).expect("write params file");

        assert_eq!(path, root.join("fanuc_lma.params.yaml"));
        let contents = std::fs::read_to_string(&path).expect("read params file");
        assert!(contents.contains("fanuc_lma:"), "{contents}");
        assert!(contents.contains("robot_description: null"), "{contents}");
    }

    #[rstest]
    fn unwritable_params_directory_is_reported() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let root = Utf8Path::from_path(dir.path())
            .expect("utf-8 tempdir")
            .join("missing");

        let err = write_params_file(&spec(), &root).expect_err("missing directory");
        assert!(matches!(err, StartError::WriteParams { .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[rstest]
    #[case::success("exit 0", Termination::Exited(0))]
    #[case::failure("exit 3", Termination::Exited(3))]
    #[case::signal("kill -9 $$", Termination::Signalled(9))]
    fn exit_status_maps_to_termination(#[case] script: &str, #[case] expected: Termination) {
        let status = std::process::Command::new("/bin/sh")
            .args(["-c", script])
            .status()
            .expect("run shell");
        assert_eq!(termination(status), expected);
    }
}
