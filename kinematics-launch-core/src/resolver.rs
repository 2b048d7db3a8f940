//! Package resolution against install prefixes.
//!
//! Packages are located the way the ament resource index lays them out: a
//! package `P` is installed under prefix `X` when the marker file
//! `X/share/ament_index/resource_index/packages/P` exists. Its resources live
//! under `X/share/P` and its executables under `X/lib/P`.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use thiserror::Error;

use crate::ResourceRef;

/// Environment variable listing install prefixes, separated by `:`.
pub const AMENT_PREFIX_PATH: &str = "AMENT_PREFIX_PATH";

const PACKAGE_MARKERS: &str = "share/ament_index/resource_index/packages";

/// Errors returned while resolving packages or executables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// No prefix provides the package.
    #[error("package {package:?} was not found in any install prefix")]
    PackageNotFound {
        /// Requested package name.
        package: String,
    },
    /// The package is installed but does not ship the executable.
    #[error("package {package:?} does not provide executable {executable:?}")]
    ExecutableNotFound {
        /// Package that was searched.
        package: String,
        /// Executable file name.
        executable: String,
    },
}

/// Map package names onto their install prefix.
///
/// Implementations are injected into the loader instead of consulting any
/// process-global index, which keeps the harness testable against temporary
/// package trees.
///
/// # Examples
///
/// ```rust
/// use camino::Utf8PathBuf;
/// use kinematics_launch_core::{ResolveError, ShareResolver};
///
/// struct SinglePrefix(Utf8PathBuf);
///
/// impl ShareResolver for SinglePrefix {
///     fn package_prefix(&self, package: &str) -> Result<Utf8PathBuf, ResolveError> {
///         if package == "moveit_kinematics" {
///             Ok(self.0.clone())
///         } else {
///             Err(ResolveError::PackageNotFound { package: package.to_owned() })
///         }
///     }
/// }
///
/// let resolver = SinglePrefix(Utf8PathBuf::from("/opt/ros"));
/// let share = resolver.share_directory("moveit_kinematics")?;
/// assert_eq!(share, Utf8PathBuf::from("/opt/ros/share/moveit_kinematics"));
/// # Ok::<(), ResolveError>(())
/// ```
pub trait ShareResolver {
    /// Return the install prefix providing `package`.
    fn package_prefix(&self, package: &str) -> Result<Utf8PathBuf, ResolveError>;

    /// Return the share directory of `package`.
    fn share_directory(&self, package: &str) -> Result<Utf8PathBuf, ResolveError> {
        self.package_prefix(package)
            .map(|prefix| prefix.join("share").join(package))
    }

    /// Resolve a resource reference to an absolute path.
    fn resolve(&self, resource: &ResourceRef) -> Result<Utf8PathBuf, ResolveError> {
        self.share_directory(resource.package())
            .map(|share| resource.within(&share))
    }
}

/// Resolver searching an ordered list of install prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixPathResolver {
    prefixes: Vec<Utf8PathBuf>,
}

impl PrefixPathResolver {
    /// Search the given prefixes in order.
    pub fn new<I, P>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a `:`-separated prefix list. Empty segments are skipped.
    ///
    /// ```
    /// use kinematics_launch_core::PrefixPathResolver;
    ///
    /// let resolver = PrefixPathResolver::from_path_list("/opt/ws/install::/opt/ros/humble");
    /// assert_eq!(resolver.prefixes().len(), 2);
    /// ```
    #[must_use]
    pub fn from_path_list(list: &str) -> Self {
        Self::new(
            list.split(':')
                .map(str::trim)
                .filter(|segment| !segment.is_empty()),
        )
    }

    /// Prefixes in search order.
    #[must_use]
    pub fn prefixes(&self) -> &[Utf8PathBuf] {
        &self.prefixes
    }

    fn provides(prefix: &Utf8Path, package: &str) -> bool {
        let marker = prefix.join(PACKAGE_MARKERS).join(package);
        match kinematics_launch_fs::file_is_file(&marker) {
            Ok(found) => found,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => {
                warn!("failed to inspect package marker {marker}: {err}");
                false
            }
        }
    }
}

impl ShareResolver for PrefixPathResolver {
    fn package_prefix(&self, package: &str) -> Result<Utf8PathBuf, ResolveError> {
        self.prefixes
            .iter()
            .find(|prefix| Self::provides(prefix, package))
            .cloned()
            .ok_or_else(|| ResolveError::PackageNotFound {
                package: package.to_owned(),
            })
    }
}

/// Locate `executable` in the `lib/<package>` directory of the package's prefix.
pub fn locate_executable(
    resolver: &dyn ShareResolver,
    package: &str,
    executable: &str,
) -> Result<Utf8PathBuf, ResolveError> {
    let prefix = resolver.package_prefix(package)?;
    let candidate = prefix.join("lib").join(package).join(executable);
    debug!("looking for {executable} at {candidate}");
    match kinematics_launch_fs::file_is_file(&candidate) {
        Ok(true) => Ok(candidate),
        Ok(false) | Err(_) => Err(ResolveError::ExecutableNotFound {
            package: package.to_owned(),
            executable: executable.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::PackageTree;
    use rstest::rstest;

    #[rstest]
    fn first_prefix_providing_the_package_wins() {
        let overlay = PackageTree::new();
        let underlay = PackageTree::new();
        overlay.install_package("moveit_kinematics");
        underlay.install_package("moveit_kinematics");
        underlay.install_package("moveit_resources_fanuc_description");

        let resolver = PrefixPathResolver::new([overlay.root(), underlay.root()]);

        assert_eq!(
            resolver.package_prefix("moveit_kinematics"),
            Ok(overlay.root())
        );
        assert_eq!(
            resolver.package_prefix("moveit_resources_fanuc_description"),
            Ok(underlay.root())
        );
    }

    #[rstest]
    fn share_directory_without_marker_is_not_a_package() {
        let tree = PackageTree::new();
        tree.write_share_file("moveit_kinematics", "config/fanuc-lma-test.yaml", "{}");

        let resolver = PrefixPathResolver::new([tree.root()]);
        let err = resolver
            .share_directory("moveit_kinematics")
            .expect_err("unregistered package should not resolve");
        assert_eq!(
            err,
            ResolveError::PackageNotFound {
                package: "moveit_kinematics".to_owned()
            }
        );
    }

    #[rstest]
    #[case("", 0)]
    #[case("/opt/ros/humble", 1)]
    #[case("/opt/ws/install:/opt/ros/humble", 2)]
    #[case(":/opt/ws/install: :/opt/ros/humble:", 2)]
    fn parses_prefix_lists(#[case] list: &str, #[case] expected: usize) {
        let resolver = PrefixPathResolver::from_path_list(list);
        assert_eq!(resolver.prefixes().len(), expected);
    }

    #[rstest]
    fn resolves_resources_inside_share_directory() {
        let tree = PackageTree::new();
        tree.install_package("moveit_resources_fanuc_moveit_config");
        let resolver = PrefixPathResolver::new([tree.root()]);

        let path = resolver
            .resolve(&ResourceRef::new(
                "moveit_resources_fanuc_moveit_config",
                "config/kinematics.yaml",
            ))
            .expect("resolve resource");
        assert_eq!(
            path,
            tree.root()
                .join("share/moveit_resources_fanuc_moveit_config/config/kinematics.yaml")
        );
    }

    #[rstest]
    fn locates_executables_under_lib() {
        let tree = PackageTree::new();
        tree.install_package("moveit_kinematics");
        let resolver = PrefixPathResolver::new([tree.root()]);

        let missing = locate_executable(&resolver, "moveit_kinematics", "test_kinematics_plugin")
            .expect_err("executable not installed yet");
        assert!(matches!(missing, ResolveError::ExecutableNotFound { .. }));

        let installed = tree.install_executable("moveit_kinematics", "test_kinematics_plugin");
        let found = locate_executable(&resolver, "moveit_kinematics", "test_kinematics_plugin")
            .expect("executable installed");
        assert_eq!(found, installed);
    }
}
