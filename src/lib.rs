//! Engine glue for loadkit services.
//!
//! This crate loads the engine configuration, bundles scenarios for cloud
//! provisioning, and drives the configured services through their lifecycle.
//! It is used by the `loadkit` CLI binary.
//!
//! # Modules
//!
//! - [`bundle`] - Packing scenario directories for cloud workers
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML engine configuration
//! - [`engine`] - Service lifecycle driver

pub mod bundle;
pub mod cli;
pub mod config;
pub mod engine;

pub use config::{EngineConfig, ServiceConfig};
pub use engine::{Engine, EngineError};
