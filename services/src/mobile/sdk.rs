//! Android SDK discovery.
//!
//! The SDK location comes from the explicit `sdk-path` setting when present,
//! otherwise from `ANDROID_HOME`. Blank values count as absent.

use crate::error::{Result, ServiceError};
use log::debug;
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable naming the Android SDK root.
pub const ANDROID_HOME: &str = "ANDROID_HOME";

/// Subdirectories searched for the emulator binary, in order.
const EMULATOR_DIRS: [&str; 2] = ["emulator", "tools"];

/// Subdirectories prepended to `PATH` when they exist.
const TOOL_DIRS: [&str; 4] = ["emulator", "tools", "tools/bin", "platform-tools"];

/// Where a resolved SDK path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkSource {
    /// The service's `sdk-path` setting.
    Settings,
    /// The `ANDROID_HOME` environment variable.
    Environment,
}

/// An SDK path and its origin. The path may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkLocation {
    /// Absolute SDK root.
    pub path: PathBuf,
    /// Which source won.
    pub source: SdkSource,
}

/// A validated SDK with the tools the loader needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkTools {
    /// SDK root.
    pub root: PathBuf,
    /// Emulator executable.
    pub emulator: PathBuf,
    /// Existing tool directories, in `PATH` priority order.
    pub tool_dirs: Vec<PathBuf>,
}

impl SdkTools {
    /// Builds a `PATH` value with the SDK tool directories first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ToolFailed`] if a directory contains the
    /// platform's path separator.
    pub fn augmented_path(&self, current: Option<OsString>) -> Result<OsString> {
        let existing: Vec<PathBuf> = current
            .as_deref()
            .map(|value| std::env::split_paths(value).collect())
            .unwrap_or_default();
        std::env::join_paths(self.tool_dirs.iter().cloned().chain(existing)).map_err(|e| {
            ServiceError::ToolFailed {
                tool: "emulator".to_owned(),
                message: format!("cannot extend PATH: {e}"),
            }
        })
    }
}

/// Picks the SDK location from `configured`, then `ANDROID_HOME`.
///
/// Relative paths are made absolute against the working directory.
///
/// # Errors
///
/// Returns [`ServiceError::SdkPathMissing`] when neither source is set.
pub fn resolve_sdk_location(configured: Option<&str>) -> Result<SdkLocation> {
    let from_settings = configured
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| (PathBuf::from(value), SdkSource::Settings));

    let from_env = || {
        std::env::var_os(ANDROID_HOME)
            .filter(|value| !value.to_string_lossy().trim().is_empty())
            .map(|value| (PathBuf::from(value), SdkSource::Environment))
    };

    let (path, source) = from_settings
        .or_else(from_env)
        .ok_or(ServiceError::SdkPathMissing)?;
    let path = std::path::absolute(&path)?;
    debug!("android SDK location {} from {source:?}", path.display());
    Ok(SdkLocation { path, source })
}

/// Checks that `location` exists and holds an emulator.
///
/// # Errors
///
/// Returns [`ServiceError::SdkPathNotFound`] naming the path when it does not
/// exist, and [`ServiceError::ToolNotFound`] when no emulator binary is found
/// under `emulator/` or `tools/`.
pub fn validate_sdk(location: &SdkLocation) -> Result<SdkTools> {
    let root = &location.path;
    if !root.is_dir() {
        return Err(ServiceError::SdkPathNotFound { path: root.clone() });
    }

    let emulator = EMULATOR_DIRS
        .iter()
        .flat_map(|dir| emulator_names().map(move |name| root.join(dir).join(name)))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ServiceError::ToolNotFound {
            tool: "emulator".to_owned(),
            path: root.join("tools"),
        })?;

    let tool_dirs = TOOL_DIRS
        .iter()
        .map(|dir| root.join(dir))
        .filter(|dir| dir.is_dir())
        .collect();

    Ok(SdkTools {
        root: root.clone(),
        emulator,
        tool_dirs,
    })
}

fn emulator_names() -> impl Iterator<Item = String> {
    let mut names = vec![format!("emulator{}", std::env::consts::EXE_SUFFIX)];
    if cfg!(windows) {
        names.push("emulator.bat".to_owned());
    }
    names.into_iter()
}
