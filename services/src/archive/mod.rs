//! Scenario archives: packing a directory tree into a stored zip and
//! expanding it again on a worker.
//!
//! # Sub-modules
//!
//! - [`error`] - Error type for archive operations.
//! - [`manifest`] - Ordered list of files and their entry names.
//! - [`packing`] - Zip creation with stored entries.
//! - [`extraction`] - Zip extraction with path traversal protection.
//! - [`unpacker`] - The `Unpacker` service that expands declared archives.

pub mod error;
pub mod extraction;
pub mod manifest;
pub mod packing;
pub mod unpacker;

pub use error::ArchiveError;
pub use extraction::unpack;
pub use manifest::{ArchiveEntry, ArchiveManifest};
pub use packing::{pack, pack_directory};
pub use unpacker::{Unpacker, UnpackerSettings};
