//! Zip creation for scenario archives.
//!
//! Entries are stored without compression: scenario bundles are mostly
//! already-compressed jars and small scripts, and speed matters more than
//! size on the upload path. Timestamps are pinned so the same tree always
//! yields the same bytes.

use super::error::ArchiveError;
use super::manifest::ArchiveManifest;
use loadkit_common::ArtifactsDir;
use log::{debug, info};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Writes every manifest entry into a stored zip at `output_path`.
///
/// Parent directories of `output_path` are created when missing. An entry
/// whose source is the output file itself is skipped.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if a source cannot be read or the archive
/// cannot be written, and [`ArchiveError::Zip`] on container errors.
pub fn pack(manifest: &ArchiveManifest, output_path: &Path) -> Result<PathBuf, ArchiveError> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let output = fs::File::create(output_path)?;
    let mut writer = ZipWriter::new(BufWriter::new(output));

    for entry in manifest.entries() {
        if entry.source == output_path {
            continue;
        }
        let options = entry_options(&entry.source)?;
        writer.start_file(entry.name.as_str(), options)?;
        let mut source = fs::File::open(&entry.source)?;
        io::copy(&mut source, &mut writer)?;
        debug!("packed {}", entry.name);
    }

    let mut inner = writer.finish()?;
    inner.flush()?;

    info!(
        "packed {} file(s) into {}",
        manifest.len(),
        output_path.display()
    );
    Ok(output_path.to_path_buf())
}

/// Packs `dir` into `<artifacts>/<dir name>.zip`.
///
/// When that name is already taken a counter is appended (see
/// [`ArtifactsDir::create_artifact`]).
///
/// # Errors
///
/// Returns [`ArchiveError::NotADirectory`] if `dir` is not a directory or
/// has no usable name, plus any error from [`pack`].
///
/// # Examples
///
/// ```no_run
/// use loadkit_common::ArtifactsDir;
/// use loadkit_services::archive::pack_directory;
/// use std::path::Path;
///
/// let artifacts = ArtifactsDir::create("artifacts")?;
/// let archive = pack_directory(Path::new("scenarios/java_package"), &artifacts)?;
/// assert!(archive.ends_with("java_package.zip"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn pack_directory(dir: &Path, artifacts: &ArtifactsDir) -> Result<PathBuf, ArchiveError> {
    // `.` and `..` carry no name of their own.
    let named = match dir.file_name() {
        Some(_) => dir.to_path_buf(),
        None => dir
            .canonicalize()
            .map_err(|_| ArchiveError::NotADirectory(dir.to_path_buf()))?,
    };
    let stem = named
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ArchiveError::NotADirectory(dir.to_path_buf()))?;
    let manifest = ArchiveManifest::from_directory(dir)?;
    let output = artifacts.create_artifact(stem, ".zip");
    pack(&manifest, output.as_std_path())
}

fn entry_options(source: &Path) -> io::Result<SimpleFileOptions> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    with_permissions(options, source)
}

#[cfg(unix)]
fn with_permissions(options: SimpleFileOptions, source: &Path) -> io::Result<SimpleFileOptions> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(source)?.permissions().mode();
    Ok(options.unix_permissions(mode & 0o777))
}

#[cfg(not(unix))]
fn with_permissions(options: SimpleFileOptions, _source: &Path) -> io::Result<SimpleFileOptions> {
    Ok(options)
}

#[cfg(test)]
#[path = "packing_tests.rs"]
mod tests;
