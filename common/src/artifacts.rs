//! Per-run artifacts directory.
//!
//! Every run writes its generated files (archives, unpacked scenarios, tool
//! logs) below a single directory. [`ArtifactsDir::create_artifact`] hands out
//! unique file names inside it.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// Handle on an existing artifacts directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactsDir {
    root: Utf8PathBuf,
}

impl ArtifactsDir {
    /// Creates the directory (and its parents) if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn create(root: impl Into<Utf8PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `<root>/<name>` without touching the filesystem.
    #[must_use]
    pub fn join(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Returns a path for a new artifact named `<prefix><suffix>`.
    ///
    /// When that name is taken a numeric counter is appended to the prefix
    /// (`prefix-1.zip`, `prefix-2.zip`, ...) until a free name is found.
    ///
    /// # Examples
    ///
    /// ```
    /// use loadkit_common::artifacts::ArtifactsDir;
    ///
    /// let temp = tempfile::tempdir()?;
    /// let root = camino::Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf-8 temp dir");
    /// let artifacts = ArtifactsDir::create(root)?;
    /// let path = artifacts.create_artifact("java_package", ".zip");
    /// assert_eq!(path.file_name(), Some("java_package.zip"));
    /// # Ok::<(), std::io::Error>(())
    /// ```
    #[must_use]
    pub fn create_artifact(&self, prefix: &str, suffix: &str) -> Utf8PathBuf {
        let mut candidate = self.root.join(format!("{prefix}{suffix}"));
        let mut counter: u32 = 1;
        while candidate.exists() {
            candidate = self.root.join(format!("{prefix}-{counter}{suffix}"));
            counter = counter.saturating_add(1);
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn artifacts_in(temp: &TempDir) -> ArtifactsDir {
        let root = Utf8PathBuf::try_from(temp.path().join("artifacts")).expect("utf-8 path");
        ArtifactsDir::create(root).expect("create artifacts dir")
    }

    #[rstest]
    fn creates_missing_directory(temp: TempDir) {
        let artifacts = artifacts_in(&temp);
        assert!(artifacts.path().is_dir());
    }

    #[rstest]
    fn appends_counter_when_name_is_taken(temp: TempDir) {
        let artifacts = artifacts_in(&temp);
        let first = artifacts.create_artifact("bundle", ".zip");
        std::fs::write(&first, b"").expect("touch first");
        let second = artifacts.create_artifact("bundle", ".zip");
        std::fs::write(&second, b"").expect("touch second");
        let third = artifacts.create_artifact("bundle", ".zip");

        assert_eq!(first.file_name(), Some("bundle.zip"));
        assert_eq!(second.file_name(), Some("bundle-1.zip"));
        assert_eq!(third.file_name(), Some("bundle-2.zip"));
    }
}
