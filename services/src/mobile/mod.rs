//! Android emulator environment for mobile UI tests.
//!
//! - [`sdk`] - SDK discovery and validation.
//! - [`loader`] - The `MobileEnvLoader` service.

pub mod loader;
pub mod sdk;

pub use loader::{MobileEnvLoader, MobileSettings};
pub use sdk::{SdkLocation, SdkSource, SdkTools};
