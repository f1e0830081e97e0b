//! Filesystem helpers shared by the packer and the engine.

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lists every regular file below `root`, recursing into subdirectories.
///
/// Symbolic links are followed. Entries are returned in lexicographic order
/// of their path components so callers get a stable ordering.
///
/// # Errors
///
/// Returns an error if `root` or any directory below it cannot be read.
///
/// # Examples
///
/// ```no_run
/// use loadkit_common::files::list_files_recursive;
/// use std::path::Path;
///
/// for file in list_files_recursive(Path::new("scenarios/java_package"))? {
///     println!("{}", file.display());
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn list_files_recursive(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Returns `path` relative to `root` using `/` separators.
///
/// Returns `None` when `path` does not live under `root` or contains a
/// component that is not valid UTF-8.
#[must_use]
pub fn relative_entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        parts.push(component.as_os_str().to_str()?);
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Resolves `name` against a list of search directories.
///
/// Absolute paths and paths that exist relative to the working directory
/// win; otherwise each search directory is tried in order.
#[must_use]
pub fn find_file(name: &Path, search_paths: &[PathBuf]) -> Option<PathBuf> {
    if name.is_absolute() || name.exists() {
        return name.exists().then(|| name.to_path_buf());
    }
    search_paths
        .iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
}
