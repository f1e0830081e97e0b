//! Pluggable services for the loadkit engine.
//!
//! This crate holds the service lifecycle contract, the registry that turns
//! module references into components, and the built-in services: the
//! archive unpacker, the install checker and the mobile environment loader.
//!
//! # Modules
//!
//! - [`archive`] - Scenario archive packing and the `Unpacker` service
//! - [`deps`] - External tool probes behind a command executor seam
//! - [`error`] - Semantic error types with severity classification
//! - [`install_checker`] - The `InstallChecker` service
//! - [`mobile`] - Android SDK discovery and the `MobileEnvLoader` service
//! - [`process`] - Long-running tool processes with guaranteed termination
//! - [`registry`] - Module reference to factory mapping
//! - [`service`] - The `Service` trait and its run context

pub mod archive;
pub mod deps;
pub mod error;
pub mod install_checker;
pub mod mobile;
pub mod process;
pub mod registry;
pub mod service;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use error::{Result, ServiceError, Severity};
pub use registry::{ModuleRegistry, ModuleSpec, ModuleTable};
pub use service::{Service, ServiceContext};
