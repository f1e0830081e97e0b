//! The ordered list of files that make up an archive.

use super::error::ArchiveError;
use loadkit_common::files::{list_files_recursive, relative_entry_name};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One file to be written into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Where the file is read from.
    pub source: PathBuf,
    /// Name inside the archive, `/`-separated and relative.
    pub name: String,
}

/// Files to pack, ordered by entry name.
///
/// Sorting by entry name keeps archives byte-for-byte reproducible for the
/// same tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveManifest {
    entries: Vec<ArchiveEntry>,
}

impl ArchiveManifest {
    /// Collects every file below `dir`, named relative to `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotADirectory`] when `dir` is not a directory,
    /// [`ArchiveError::EmptyFileList`] when it holds no files, and
    /// [`ArchiveError::Io`] when it cannot be walked.
    pub fn from_directory(dir: &Path) -> Result<Self, ArchiveError> {
        if !dir.is_dir() {
            return Err(ArchiveError::NotADirectory(dir.to_path_buf()));
        }

        let mut named = BTreeMap::new();
        for file in list_files_recursive(dir)? {
            let name = relative_entry_name(dir, &file)
                .ok_or_else(|| ArchiveError::InvalidEntryName(file.clone()))?;
            named.insert(name, file);
        }

        Self::from_named(named)
    }

    /// Builds a manifest from files that already exist on disk.
    ///
    /// Files below `base` are named relative to it; anything else is named by
    /// its file name alone.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::EmptyFileList`] for an empty list and
    /// [`ArchiveError::DuplicateEntry`] when two files map to one name.
    pub fn from_files(base: &Path, files: &[PathBuf]) -> Result<Self, ArchiveError> {
        let mut named = BTreeMap::new();
        for file in files {
            let name = relative_entry_name(base, file)
                .or_else(|| {
                    file.file_name()
                        .and_then(|n| n.to_str())
                        .map(str::to_owned)
                })
                .ok_or_else(|| ArchiveError::InvalidEntryName(file.clone()))?;
            if named.insert(name.clone(), file.clone()).is_some() {
                return Err(ArchiveError::DuplicateEntry { name });
            }
        }

        Self::from_named(named)
    }

    fn from_named(named: BTreeMap<String, PathBuf>) -> Result<Self, ArchiveError> {
        if named.is_empty() {
            return Err(ArchiveError::EmptyFileList);
        }
        let entries = named
            .into_iter()
            .map(|(name, source)| ArchiveEntry { source, name })
            .collect();
        Ok(Self { entries })
    }

    /// Returns the entries in archive order.
    #[must_use]
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Returns the entry names in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Number of files in the manifest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the manifest lists no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("temp dir creation succeeds")
    }

    #[rstest]
    fn directory_entries_are_relative_and_sorted(temp_dir: TempDir) {
        let root = temp_dir.path();
        fs::create_dir_all(root.join("lib")).expect("mkdir");
        fs::write(root.join("zeta.txt"), b"z").expect("write");
        fs::write(root.join("lib/alpha.jar"), b"a").expect("write");

        let manifest = ArchiveManifest::from_directory(root).expect("manifest");
        let names: Vec<&str> = manifest.names().collect();
        assert_eq!(names, vec!["lib/alpha.jar", "zeta.txt"]);
    }

    #[rstest]
    fn file_is_not_a_directory(temp_dir: TempDir) {
        let file = temp_dir.path().join("script.py");
        fs::write(&file, b"print()").expect("write");
        let result = ArchiveManifest::from_directory(&file);
        assert!(matches!(result, Err(ArchiveError::NotADirectory(_))));
    }

    #[rstest]
    fn directory_without_files_is_empty(temp_dir: TempDir) {
        fs::create_dir_all(temp_dir.path().join("only/dirs")).expect("mkdir");
        let result = ArchiveManifest::from_directory(temp_dir.path());
        assert!(matches!(result, Err(ArchiveError::EmptyFileList)));
    }

    #[rstest]
    fn files_outside_base_use_their_file_name(temp_dir: TempDir) {
        let base = temp_dir.path().join("base");
        fs::create_dir_all(base.join("nested")).expect("mkdir");
        let inside = base.join("nested/data.csv");
        let outside = temp_dir.path().join("extra.properties");
        fs::write(&inside, b"1,2").expect("write");
        fs::write(&outside, b"k=v").expect("write");

        let manifest =
            ArchiveManifest::from_files(&base, &[inside, outside]).expect("manifest");
        let names: Vec<&str> = manifest.names().collect();
        assert_eq!(names, vec!["extra.properties", "nested/data.csv"]);
        assert_eq!(manifest.len(), 2);
    }

    #[rstest]
    fn duplicate_names_are_rejected(temp_dir: TempDir) {
        let base = temp_dir.path().join("base");
        let a = temp_dir.path().join("a/same.txt");
        let b = temp_dir.path().join("b/same.txt");
        let result = ArchiveManifest::from_files(&base, &[a, b]);
        assert!(matches!(result, Err(ArchiveError::DuplicateEntry { name }) if name == "same.txt"));
    }

    #[rstest]
    fn empty_file_list_is_rejected(temp_dir: TempDir) {
        let result = ArchiveManifest::from_files(temp_dir.path(), &[]);
        assert!(matches!(result, Err(ArchiveError::EmptyFileList)));
    }
}
