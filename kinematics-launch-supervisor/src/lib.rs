//! Tokio-backed supervision engine for kinematics launch tests.
//!
//! [`TokioSupervisor`] implements
//! [`ProcessSupervisor`](kinematics_launch_core::ProcessSupervisor) by
//! spawning each described process as a child of the harness. Parameters are
//! written to a temporary parameter file and passed with the usual
//! `--ros-args` arguments; see [`ros_arguments`].
//!
//! Children are owned by the returned [`TokioSession`] and are killed when it
//! is dropped, so no process outlives the harness.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod command;
mod session;

pub use command::{PARAMS_FILE_SUFFIX, ros_arguments};
pub use session::{TokioSession, TokioSupervisor};
