//! Loading configuration fragments from package share directories.
//!
//! Loading never fails loudly: a missing package, a missing or unreadable file
//! and unparsable YAML all collapse to [`Loaded::Absent`]. The cause is logged
//! and the decision whether absence is fatal is left to whoever consumes the
//! fragment, which for this harness is the test executable itself.

use camino::Utf8PathBuf;
use log::{debug, warn};
use serde_yaml::Value;
use thiserror::Error;

use crate::{ResolveError, ResourceRef, ShareResolver};

/// Outcome of loading an optional resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    /// The resource was read successfully.
    Present(T),
    /// The resource could not be read.
    Absent,
}

impl<T> Loaded<T> {
    /// Whether the resource was read.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Convert into an [`Option`].
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }

    /// Borrow the loaded value, if any.
    #[must_use]
    pub const fn as_ref(&self) -> Loaded<&T> {
        match self {
            Self::Present(value) => Loaded::Present(value),
            Self::Absent => Loaded::Absent,
        }
    }

    /// Transform the loaded value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loaded<U> {
        match self {
            Self::Present(value) => Loaded::Present(f(value)),
            Self::Absent => Loaded::Absent,
        }
    }
}

impl<T> From<Option<T>> for Loaded<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

/// Reasons a resource could not be loaded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The owning package could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// Absolute path that was read.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The file was read but is not valid YAML.
    #[error("failed to parse YAML in {path:?}: {source}")]
    Parse {
        /// Absolute path that was parsed.
        path: Utf8PathBuf,
        /// Underlying parser error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// Read a resource as UTF-8 text, reporting why it failed.
pub fn try_load_file(
    resolver: &dyn ShareResolver,
    resource: &ResourceRef,
) -> Result<String, LoadError> {
    let path = resolver.resolve(resource)?;
    debug!("loading {resource} from {path}");
    kinematics_launch_fs::read_utf8_file(&path).map_err(|source| LoadError::Read { path, source })
}

/// Read and parse a resource as a YAML document, reporting why it failed.
pub fn try_load_yaml(
    resolver: &dyn ShareResolver,
    resource: &ResourceRef,
) -> Result<Value, LoadError> {
    let path = resolver.resolve(resource)?;
    debug!("loading {resource} from {path}");
    let text = kinematics_launch_fs::read_utf8_file(&path).map_err(|source| LoadError::Read {
        path: path.clone(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| LoadError::Parse { path, source })
}

/// Read a resource as UTF-8 text, or [`Loaded::Absent`] on any failure.
pub fn load_file(resolver: &dyn ShareResolver, resource: &ResourceRef) -> Loaded<String> {
    settle(resource, try_load_file(resolver, resource))
}

/// Read a resource as YAML, or [`Loaded::Absent`] on any failure.
pub fn load_yaml(resolver: &dyn ShareResolver, resource: &ResourceRef) -> Loaded<Value> {
    settle(resource, try_load_yaml(resolver, resource))
}

fn settle<T>(resource: &ResourceRef, result: Result<T, LoadError>) -> Loaded<T> {
    match result {
        Ok(value) => Loaded::Present(value),
        Err(err) => {
            warn!("{resource} is unavailable: {err}");
            Loaded::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrefixPathResolver;
    use crate::test_support::PackageTree;
    use rstest::{fixture, rstest};

    const PACKAGE: &str = "moveit_resources_fanuc_moveit_config";

    #[fixture]
    fn tree() -> PackageTree {
        let tree = PackageTree::new();
        tree.install_package(PACKAGE);
        tree
    }

    #[rstest]
    fn loads_text_verbatim(tree: PackageTree) {
        tree.write_share_file(PACKAGE, "config/fanuc.srdf", "<robot name=\"fanuc\">\n</robot>\n");
        let resolver = PrefixPathResolver::new([tree.root()]);

        let loaded = load_file(&resolver, &ResourceRef::new(PACKAGE, "config/fanuc.srdf"));
        assert_eq!(
            loaded,
            Loaded::Present("<robot name=\"fanuc\">\n</robot>\n".to_owned())
        );
    }

    #[rstest]
    fn loads_yaml_as_structured_value(tree: PackageTree) {
        tree.write_share_file(
            PACKAGE,
            "config/kinematics.yaml",
            "manipulator:\n  kinematics_solver: lma_kinematics_plugin/LMAKinematicsPlugin\n",
        );
        let resolver = PrefixPathResolver::new([tree.root()]);

        let loaded = load_yaml(&resolver, &ResourceRef::new(PACKAGE, "config/kinematics.yaml"))
            .into_option()
            .expect("yaml present");
        assert_eq!(
            loaded["manipulator"]["kinematics_solver"].as_str(),
            Some("lma_kinematics_plugin/LMAKinematicsPlugin")
        );
    }

    #[rstest]
    #[case::missing_file(PACKAGE, "config/joint_limits.yaml")]
    #[case::missing_package("moveit_resources_panda_moveit_config", "config/kinematics.yaml")]
    fn missing_resources_are_absent(tree: PackageTree, #[case] package: &str, #[case] path: &str) {
        let resolver = PrefixPathResolver::new([tree.root()]);
        let resource = ResourceRef::new(package, path);

        assert_eq!(load_file(&resolver, &resource), Loaded::Absent);
        assert_eq!(load_yaml(&resolver, &resource), Loaded::Absent);
    }

    #[rstest]
    fn unparsable_yaml_is_absent(tree: PackageTree) {
        tree.write_share_file(PACKAGE, "config/kinematics.yaml", "manipulator: [unterminated\n");
        let resolver = PrefixPathResolver::new([tree.root()]);
        let resource = ResourceRef::new(PACKAGE, "config/kinematics.yaml");

        assert!(matches!(
            try_load_yaml(&resolver, &resource),
            Err(LoadError::Parse { .. })
        ));
        assert_eq!(load_yaml(&resolver, &resource), Loaded::Absent);
        assert!(load_file(&resolver, &resource).is_present());
    }

    #[rstest]
    fn read_errors_name_the_resolved_path(tree: PackageTree) {
        let resolver = PrefixPathResolver::new([tree.root()]);
        let resource = ResourceRef::new(PACKAGE, "config/fanuc.srdf");

        match try_load_file(&resolver, &resource) {
            Err(LoadError::Read { path, source }) => {
                assert_eq!(path, resource.within(&tree.share_dir(PACKAGE)));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected read failure, found {other:?}"),
        }
    }
}
