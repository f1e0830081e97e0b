//! The mobile test environment service.
//!
//! Resolves the Android SDK during `prepare`, launches the configured
//! emulator (and optionally an Appium server) during `startup`, and stops
//! both on `shutdown`.

use super::sdk::{self, SdkTools};
use crate::deps::{CommandExecutor, SystemCommandExecutor, check_tool};
use crate::error::{Result, ServiceError};
use crate::process::{LaunchSpec, ToolProcess};
use crate::service::{Service, ServiceContext, parse_settings};
use camino::Utf8PathBuf;
use log::{debug, info, warn};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the AVD directory.
pub const ANDROID_AVD_HOME: &str = "ANDROID_AVD_HOME";

/// Settings accepted by [`MobileEnvLoader`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct MobileSettings {
    /// Android SDK root; overrides `ANDROID_HOME`.
    pub sdk_path: Option<String>,
    /// Virtual device to boot on startup.
    pub avd: Option<String>,
    /// Directory holding AVD definitions, exported as `ANDROID_AVD_HOME`.
    pub avd_home: Option<Utf8PathBuf>,
    /// Appium server executable. No server is launched when absent.
    pub appium: Option<String>,
    /// Milliseconds to watch a launched process for an early failure.
    pub startup_probe: u64,
}

impl Default for MobileSettings {
    fn default() -> Self {
        Self {
            sdk_path: None,
            avd: None,
            avd_home: None,
            appium: None,
            startup_probe: 500,
        }
    }
}

impl MobileSettings {
    fn avd(&self) -> Option<&str> {
        self.avd.as_deref().map(str::trim).filter(|avd| !avd.is_empty())
    }

    fn appium(&self) -> Option<&str> {
        self.appium
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }
}

/// Locates the Android SDK and runs an emulator for mobile UI tests.
pub struct MobileEnvLoader {
    alias: String,
    settings: MobileSettings,
    executor: Box<dyn CommandExecutor>,
    sdk_path: Option<PathBuf>,
    tools: Option<SdkTools>,
    processes: Vec<ToolProcess>,
}

impl MobileEnvLoader {
    /// Creates a loader that probes tools on the host system.
    #[must_use]
    pub fn new(alias: &str, settings: MobileSettings) -> Self {
        Self::with_executor(alias, settings, Box::new(SystemCommandExecutor))
    }

    /// Creates a loader with an injected command executor.
    #[must_use]
    pub fn with_executor(
        alias: &str,
        settings: MobileSettings,
        executor: Box<dyn CommandExecutor>,
    ) -> Self {
        Self {
            alias: alias.to_owned(),
            settings,
            executor,
            sdk_path: None,
            tools: None,
            processes: Vec::new(),
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

    /// The SDK path chosen by the last `prepare`, even if validation failed.
    #[must_use]
    pub fn sdk_path(&self) -> Option<&Path> {
        self.sdk_path.as_deref()
    }

    /// Number of processes currently owned by the loader.
    #[must_use]
    pub fn running_processes(&self) -> usize {
        self.processes.len()
    }

    fn resolve_tools(&self) -> Result<(PathBuf, Result<SdkTools>)> {
        let location = sdk::resolve_sdk_location(self.settings.sdk_path.as_deref())?;
        let tools = sdk::validate_sdk(&location);
        Ok((location.path, tools))
    }

    fn check_appium(&self) -> Result<()> {
        match self.settings.appium() {
            Some(appium) => check_tool(self.executor.as_ref(), appium, &["--version"]),
            None => Ok(()),
        }
    }

    fn launch_env(&self, tools: &SdkTools) -> Result<Vec<(String, OsString)>> {
        let mut envs = vec![
            (sdk::ANDROID_HOME.to_owned(), tools.root.clone().into_os_string()),
            (
                "PATH".to_owned(),
                tools.augmented_path(std::env::var_os("PATH"))?,
            ),
        ];
        if let Some(avd_home) = &self.settings.avd_home {
            envs.push((ANDROID_AVD_HOME.to_owned(), avd_home.as_os_str().to_owned()));
        }
        Ok(envs)
    }

    fn launch(&mut self, spec: LaunchSpec, envs: &[(String, OsString)]) -> Result<()> {
        let spec = envs
            .iter()
            .fold(spec, |spec, (key, value)| spec.env(key, value.clone()));
        let probe = Duration::from_millis(self.settings.startup_probe);
        let process = ToolProcess::spawn(&spec, probe)?;
        self.processes.push(process);
        Ok(())
    }

    fn stop_all(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(mut process) = self.processes.pop() {
            if let Err(e) = process.terminate() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Service for MobileEnvLoader {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn prepare(&mut self, _ctx: &ServiceContext<'_>) -> Result<()> {
        let (path, tools) = self.resolve_tools()?;
        self.sdk_path = Some(path);
        let tools = tools?;
        self.check_appium()?;
        info!(
            "{}: using android SDK at {}",
            self.alias,
            tools.root.display()
        );
        self.tools = Some(tools);
        Ok(())
    }

    fn startup(&mut self, ctx: &ServiceContext<'_>) -> Result<()> {
        let tools = self.tools.clone().ok_or_else(|| ServiceError::NotPrepared {
            alias: self.alias.clone(),
        })?;
        let avd = self
            .settings
            .avd()
            .ok_or_else(|| ServiceError::AvdNotConfigured {
                alias: self.alias.clone(),
            })?
            .to_owned();

        let envs = self.launch_env(&tools)?;
        let log_dir = ctx.artifacts.path().as_std_path();

        if let Some(appium) = self.settings.appium().map(str::to_owned) {
            self.launch(LaunchSpec::new("appium", appium, log_dir), &envs)?;
        }

        let emulator =
            LaunchSpec::new("emulator", &tools.emulator, log_dir).args(["-avd", avd.as_str()]);
        if let Err(e) = self.launch(emulator, &envs) {
            if let Err(stop_error) = self.stop_all() {
                warn!("{}: cleanup after failed startup: {stop_error}", self.alias);
            }
            return Err(e);
        }
        Ok(())
    }

    /// A host with no SDK configured at all cannot run this service, which
    /// ends the check with [`ServiceError::NormalShutdown`]. A configured SDK
    /// that is missing or incomplete stays a tool error.
    fn check_tools(&self) -> Result<()> {
        let (_, tools) = match self.resolve_tools() {
            Err(ServiceError::SdkPathMissing) => {
                return Err(ServiceError::NormalShutdown {
                    reason: format!("{}: no android SDK configured on this host", self.alias),
                });
            }
            resolved => resolved?,
        };
        let tools = tools?;
        debug!("{}: emulator at {}", self.alias, tools.emulator.display());
        self.check_appium()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.stop_all()
    }

    fn post_process(&mut self) -> Result<()> {
        self.stop_all()
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
