//! Archive extraction for scenario bundles.
//!
//! Expands a zip into a destination directory, refusing entries that would
//! land outside it (zip-slip).

use super::error::ArchiveError;
use log::debug;
use std::fs;
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// Extracts every file in `archive_path` below `dest_dir`.
///
/// Leading `/` characters in entry names are dropped, so archives written
/// with absolute-looking names still land inside `dest_dir`. Unix permission
/// bits stored in the archive are restored.
///
/// Returns the entry names of the files written, in archive order.
///
/// # Errors
///
/// Returns [`ArchiveError::PathTraversal`] if an entry contains `..` or a
/// drive prefix, [`ArchiveError::EmptyArchive`] if the archive holds no
/// files, and [`ArchiveError::Io`] / [`ArchiveError::Zip`] on I/O or
/// container failures.
pub fn unpack(archive_path: &Path, dest_dir: &Path) -> Result<Vec<String>, ArchiveError> {
    let file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    fs::create_dir_all(dest_dir)?;

    let mut extracted = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_owned();
        let relative = sanitise_entry_name(&name)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let dest_path = dest_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = fs::File::create(&dest_path)?;
        io::copy(&mut entry, &mut output)?;
        restore_permissions(&dest_path, entry.unix_mode())?;

        debug!("unpacked {name}");
        extracted.push(name);
    }

    if extracted.is_empty() {
        return Err(ArchiveError::EmptyArchive);
    }

    Ok(extracted)
}

/// Turns an entry name into a path relative to the destination.
fn sanitise_entry_name(name: &str) -> Result<PathBuf, ArchiveError> {
    let trimmed = name.trim_start_matches('/');
    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::PathTraversal {
                    path: name.to_owned(),
                });
            }
        }
    }
    Ok(relative)
}

#[cfg(unix)]
fn restore_permissions(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn restore_permissions(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}
