//! Service lifecycle driver.
//!
//! The engine instantiates every service whose `run-at` matches the
//! provisioning, prepares and starts them in order, and then shuts down and
//! post-processes them in reverse order whatever happened before. The first
//! error wins; later errors are logged.

use crate::bundle::bundle_for_cloud;
use crate::config::{ConfigError, EngineConfig};
use camino::Utf8PathBuf;
use loadkit_common::ArtifactsDir;
use loadkit_services::archive::ArchiveError;
use loadkit_services::error::{ServiceError, Severity};
use loadkit_services::registry::{ModuleRegistry, ModuleTable};
use loadkit_services::service::{DEFAULT_RUN_AT, Service, ServiceContext, should_run};
use log::{debug, info, warn};
use std::path::PathBuf;
use thiserror::Error;

/// File name of the configuration snapshot written into the artifacts
/// directory at the start of a run.
pub const EFFECTIVE_CONFIG: &str = "effective.toml";

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Loading or writing configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The artifacts directory could not be created.
    #[error("cannot create artifacts directory {path}: {source}")]
    Artifacts {
        /// Directory that was requested.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Packing a scenario directory failed.
    #[error("failed to pack scenario: {0}")]
    Bundle(#[from] ArchiveError),

    /// A service failed or asked for the run to stop.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl EngineError {
    /// Classifies the error; configuration problems are
    /// [`Severity::Configuration`].
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Config(_) => Severity::Configuration,
            Self::Artifacts { .. } | Self::Bundle(_) => Severity::Tool,
            Self::Service(e) => e.severity(),
        }
    }

    /// Process exit code for this error: 0 for a normal shutdown, 2 for
    /// configuration errors, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            Severity::NormalShutdown => 0,
            Severity::Configuration => 2,
            Severity::Tool => 1,
        }
    }
}

/// Drives one run of the configured services.
pub struct Engine {
    config: EngineConfig,
    artifacts: ArtifactsDir,
    file_search_paths: Vec<PathBuf>,
    modules: ModuleTable,
    registry: ModuleRegistry,
}

impl Engine {
    /// Creates an engine with the built-in services.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Artifacts`] when the artifacts directory cannot
    /// be created.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_registry(config, ModuleRegistry::with_builtins())
    }

    /// Creates an engine resolving modules through `registry`.
    ///
    /// The artifacts directory is always searched for declared files after
    /// the configured search paths.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Artifacts`] when the artifacts directory cannot
    /// be created.
    pub fn with_registry(
        config: EngineConfig,
        registry: ModuleRegistry,
    ) -> Result<Self, EngineError> {
        let root = config.settings.artifacts_dir.clone();
        let artifacts = ArtifactsDir::create(root.clone())
            .map_err(|source| EngineError::Artifacts { path: root, source })?;
        let mut file_search_paths = config.settings.file_search_paths.clone();
        file_search_paths.push(artifacts.path().as_std_path().to_path_buf());
        let modules = config.module_table();
        Ok(Self {
            config,
            artifacts,
            file_search_paths,
            modules,
            registry,
        })
    }

    /// The configuration as it stands, including any bundling changes.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The run's artifacts directory.
    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactsDir {
        &self.artifacts
    }

    /// Runs the full lifecycle.
    ///
    /// Under cloud provisioning, scenario directories are bundled first. The
    /// effective configuration is then written to the artifacts directory.
    ///
    /// # Errors
    ///
    /// Returns the first error raised, including
    /// [`ServiceError::NormalShutdown`] when a service ended the run early.
    pub fn run(&mut self) -> Result<(), EngineError> {
        if self.config.is_cloud() {
            let archives = bundle_for_cloud(
                &mut self.config,
                &self.artifacts,
                &self.file_search_paths,
            )?;
            info!("bundled {} scenario archives", archives.len());
        }
        self.config
            .dump(&self.artifacts.join(EFFECTIVE_CONFIG))?;

        let ctx = ServiceContext {
            artifacts: &self.artifacts,
            file_search_paths: &self.file_search_paths,
            provisioning: self.config.provisioning.trim(),
            modules: &self.modules,
            registry: &self.registry,
        };

        let mut services = Vec::new();
        let started = start_services(&self.config, &ctx, &mut services);
        let stopped = stop_services(&mut services);
        started.and(stopped).map_err(EngineError::from)
    }
}

fn start_services(
    config: &EngineConfig,
    ctx: &ServiceContext<'_>,
    services: &mut Vec<Box<dyn Service>>,
) -> Result<(), ServiceError> {
    let mut pending = Vec::new();
    for entry in &config.services {
        if !should_run(entry.run_at.as_deref(), ctx.provisioning) {
            debug!(
                "skipping {}: runs at {}",
                entry.module,
                entry.run_at.as_deref().unwrap_or(DEFAULT_RUN_AT)
            );
            continue;
        }
        pending.push(
            ctx.registry
                .instantiate_alias(ctx.modules, &entry.module, &entry.settings)?,
        );
    }

    for mut service in pending {
        info!("preparing {}", service.alias());
        let prepared = service.prepare(ctx);
        services.push(service);
        prepared?;
    }
    for service in services.iter_mut() {
        info!("starting {}", service.alias());
        service.startup(ctx)?;
    }
    Ok(())
}

fn stop_services(services: &mut [Box<dyn Service>]) -> Result<(), ServiceError> {
    let mut first_error = None;
    for service in services.iter_mut().rev() {
        debug!("shutting down {}", service.alias());
        if let Err(e) = service.shutdown() {
            warn!("{} failed to shut down: {e}", service.alias());
            first_error.get_or_insert(e);
        }
    }
    for service in services.iter_mut().rev() {
        debug!("post-processing {}", service.alias());
        if let Err(e) = service.post_process() {
            warn!("{} failed to post-process: {e}", service.alias());
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
