//! References to files shipped inside installed packages.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

/// A file inside a package's share directory.
///
/// The reference stays symbolic until a [`ShareResolver`](crate::ShareResolver)
/// turns the package name into an install location.
///
/// # Examples
///
/// ```
/// use kinematics_launch_core::ResourceRef;
///
/// let urdf = ResourceRef::new("moveit_resources_fanuc_description", "urdf/fanuc.urdf");
/// assert_eq!(urdf.package(), "moveit_resources_fanuc_description");
/// assert_eq!(urdf.to_string(), "moveit_resources_fanuc_description/urdf/fanuc.urdf");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    package: String,
    path: Utf8PathBuf,
}

impl ResourceRef {
    /// Reference `path`, relative to the share directory of `package`.
    pub fn new(package: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            package: package.into(),
            path: path.into(),
        }
    }

    /// Name of the package owning the file.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Path of the file relative to the package share directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Join the relative path onto a resolved share directory.
    #[must_use]
    pub fn within(&self, share_dir: &Utf8Path) -> Utf8PathBuf {
        share_dir.join(&self.path)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.path)
    }
}
