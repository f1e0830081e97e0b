//! Error types for archive packing and extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Errors arising from archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An I/O operation failed (reading sources, writing entries).
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip container could not be written or read.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The source to pack is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// There is nothing to pack.
    #[error("no files to pack")]
    EmptyFileList,

    /// Two files map onto the same entry name.
    #[error("duplicate archive entry {name}")]
    DuplicateEntry {
        /// The clashing entry name.
        name: String,
    },

    /// A source path cannot be expressed as a UTF-8 entry name.
    #[error("cannot derive an archive entry name for {0}")]
    InvalidEntryName(PathBuf),

    /// An entry attempts to escape the destination directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry name.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}
