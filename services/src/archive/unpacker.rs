//! The `Unpacker` service expands declared archives into the artifacts
//! directory before a run starts.

use super::error::ArchiveError;
use super::extraction::unpack;
use crate::error::{Result, ServiceError};
use crate::service::{Service, ServiceContext, parse_settings};
use log::{info, warn};
use loadkit_common::find_file;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings accepted by [`Unpacker`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnpackerSettings {
    /// Archive names, resolved against the engine's file search paths.
    pub files: Vec<String>,
}

/// Expands each configured archive into `<artifacts>/<archive stem>/`.
#[derive(Debug)]
pub struct Unpacker {
    alias: String,
    settings: UnpackerSettings,
    unpacked: Vec<PathBuf>,
}

impl Unpacker {
    /// Creates an unpacker for `alias`.
    #[must_use]
    pub fn new(alias: &str, settings: UnpackerSettings) -> Self {
        Self {
            alias: alias.to_owned(),
            settings,
            unpacked: Vec::new(),
        }
    }

    /// Registry factory.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidSettings`] for malformed settings.
    pub fn factory(alias: &str, settings: &toml::Table) -> Result<Box<dyn Service>> {
        let settings = parse_settings(alias, settings)?;
        Ok(Box::new(Self::new(alias, settings)))
    }

    /// Directories produced by the last `prepare`.
    #[must_use]
    pub fn unpacked(&self) -> &[PathBuf] {
        &self.unpacked
    }

    fn resolve(name: &str, search_paths: &[PathBuf]) -> Result<PathBuf> {
        find_file(Path::new(name), search_paths)
            .filter(|path| path.is_file())
            .ok_or_else(|| ServiceError::ArchiveNotFound {
                name: name.to_owned(),
            })
    }
}

impl Service for Unpacker {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn prepare(&mut self, ctx: &ServiceContext<'_>) -> Result<()> {
        if self.settings.files.is_empty() {
            warn!("{}: no files to unpack", self.alias);
            return Ok(());
        }

        let archives = self
            .settings
            .files
            .iter()
            .map(|name| Self::resolve(name, ctx.file_search_paths))
            .collect::<Result<Vec<_>>>()?;

        for archive in archives {
            let stem = destination_stem(&archive)?;
            let dest = ctx.artifacts.join(stem).into_std_path_buf();
            let names = unpack(&archive, &dest)?;
            info!(
                "{}: unpacked {} files from {} into {}",
                self.alias,
                names.len(),
                archive.display(),
                dest.display()
            );
            self.unpacked.push(dest);
        }
        Ok(())
    }
}

/// Name of the directory an archive expands into.
fn destination_stem(archive: &Path) -> Result<&str> {
    archive
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| ArchiveError::InvalidEntryName(archive.to_path_buf()).into())
}
