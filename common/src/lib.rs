//! Shared helpers for loadkit crates: module references, file enumeration,
//! and the per-run artifacts directory.

pub mod artifacts;
pub mod files;
pub mod path;

pub use artifacts::ArtifactsDir;
pub use files::{find_file, list_files_recursive, relative_entry_name};
pub use path::{ModuleRef, ModuleRefError};
