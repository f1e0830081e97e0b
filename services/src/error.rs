//! Error types for loadkit services.
//!
//! Every failure a service can raise maps onto one of three severities (see
//! [`Severity`]): configuration errors stop the run before it starts, tool
//! errors abort it, and a normal shutdown ends it cleanly without marking it
//! failed.

use crate::archive::ArchiveError;
use loadkit_common::ModuleRefError;
use std::path::PathBuf;
use thiserror::Error;

/// How the invoking engine should treat a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A user-supplied setting is missing or wrong.
    Configuration,
    /// An external dependency is present but unusable, or I/O failed.
    Tool,
    /// A deliberate early stop that is not a failure.
    NormalShutdown,
}

/// Errors raised by services during their lifecycle.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Neither `sdk-path` nor `ANDROID_HOME` names an Android SDK.
    #[error("android SDK location is not configured; set `sdk-path` or ANDROID_HOME")]
    SdkPathMissing,

    /// The configured Android SDK directory does not exist.
    #[error("android SDK not found at {path}")]
    SdkPathNotFound {
        /// Path that was configured.
        path: PathBuf,
    },

    /// A required executable is missing.
    #[error("{tool} not found in {path}")]
    ToolNotFound {
        /// Name of the missing tool.
        tool: String,
        /// Where the tool was looked for.
        path: PathBuf,
    },

    /// An external tool ran but reported a failure.
    #[error("{tool} failed: {message}")]
    ToolFailed {
        /// Name of the tool.
        tool: String,
        /// Captured error output or a description of the failure.
        message: String,
    },

    /// `startup` was requested but no virtual device is configured.
    #[error("no AVD configured for {alias}; set `avd` in its settings")]
    AvdNotConfigured {
        /// Alias of the service that needed the AVD.
        alias: String,
    },

    /// A declared archive could not be located.
    #[error("archive {name} not found in file search paths")]
    ArchiveNotFound {
        /// Archive name as declared in the `files` setting.
        name: String,
    },

    /// A module reference string is malformed.
    #[error("module {alias} has an invalid reference: {source}")]
    InvalidModuleReference {
        /// Alias the reference was configured under.
        alias: String,
        /// Why parsing failed.
        source: ModuleRefError,
    },

    /// A module reference is well formed but nothing is registered under it.
    #[error("module {alias} refers to unknown component {reference}")]
    UnknownModule {
        /// Alias the reference was configured under.
        alias: String,
        /// The unresolved reference.
        reference: String,
    },

    /// A service entry names an alias missing from `modules`.
    #[error("no module configured under alias {alias}")]
    UnknownAlias {
        /// The missing alias.
        alias: String,
    },

    /// Service settings could not be deserialised.
    #[error("invalid settings for {alias}: {reason}")]
    InvalidSettings {
        /// Alias of the service.
        alias: String,
        /// Description of the problem.
        reason: String,
    },

    /// A lifecycle step ran before `prepare` completed.
    #[error("{alias} was used before prepare completed")]
    NotPrepared {
        /// Alias of the service.
        alias: String,
    },

    /// One or more configured modules failed their tool check.
    #[error("tool check failed for: {}", .failed.join(", "))]
    ToolsCheckFailed {
        /// Aliases that failed, in check order.
        failed: Vec<String>,
        /// The first failure encountered.
        #[source]
        source: Box<ServiceError>,
    },

    /// The run should stop here without being marked failed.
    #[error("normal shutdown: {reason}")]
    NormalShutdown {
        /// Why the run stopped.
        reason: String,
    },

    /// Packing or unpacking an archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Classifies the error for the invoking engine.
    ///
    /// # Examples
    ///
    /// ```
    /// use loadkit_services::error::{ServiceError, Severity};
    ///
    /// assert_eq!(ServiceError::SdkPathMissing.severity(), Severity::Configuration);
    /// let stop = ServiceError::NormalShutdown { reason: "done".to_owned() };
    /// assert_eq!(stop.severity(), Severity::NormalShutdown);
    /// ```
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::SdkPathMissing
            | Self::AvdNotConfigured { .. }
            | Self::ArchiveNotFound { .. }
            | Self::InvalidModuleReference { .. }
            | Self::UnknownModule { .. }
            | Self::UnknownAlias { .. }
            | Self::InvalidSettings { .. }
            | Self::NotPrepared { .. } => Severity::Configuration,
            Self::SdkPathNotFound { .. }
            | Self::ToolNotFound { .. }
            | Self::ToolFailed { .. }
            | Self::ToolsCheckFailed { .. }
            | Self::Archive(_)
            | Self::Io(_) => Severity::Tool,
            Self::NormalShutdown { .. } => Severity::NormalShutdown,
        }
    }

    /// Returns `true` for [`ServiceError::NormalShutdown`].
    #[must_use]
    pub fn is_normal_shutdown(&self) -> bool {
        matches!(self, Self::NormalShutdown { .. })
    }
}

/// Result type alias using [`ServiceError`].
pub type Result<T> = std::result::Result<T, ServiceError>;
