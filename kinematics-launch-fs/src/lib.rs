//! Shared filesystem helpers built on `cap-std` and `camino`.
//!
//! Every helper opens the parent directory of the target with ambient
//! authority and then performs the operation relative to that directory
//! handle, so callers only ever hand over UTF-8 paths.
#![forbid(unsafe_code)]

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8};
use std::io;

/// Resolve an ambient directory for the given path and return the directory with the file name.
fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Read a whole file as UTF-8 text.
///
/// Invalid UTF-8 surfaces as [`io::ErrorKind::InvalidData`].
pub fn read_utf8_file(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.read_to_string(name.as_str())
}

/// Write `contents` to `path`, replacing any existing file.
///
/// The parent directory must already exist.
pub fn write_utf8_file(path: &Utf8Path, contents: &str) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.write(name.as_str(), contents)
}

/// Return whether a path exists and is a regular file using capability-based IO.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}
