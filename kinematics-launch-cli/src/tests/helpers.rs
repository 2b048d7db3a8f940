//! Test helpers for install prefixes and async execution.

use kinematics_launch_core::test_support::PackageTree;
use kinematics_launch_core::{KINEMATICS_PACKAGE, TEST_EXECUTABLE};

pub(super) fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build Tokio runtime")
        .block_on(future)
}

/// Prefix holding every FANUC input and an installed test executable.
pub(super) fn installed_prefix() -> PackageTree {
    let tree = PackageTree::new();
    tree.install_fanuc_lma();
    tree.install_executable(KINEMATICS_PACKAGE, TEST_EXECUTABLE);
    tree
}
