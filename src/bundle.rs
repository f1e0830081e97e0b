//! Scenario bundling for cloud provisioning.
//!
//! Workers receive single files, so every execution whose scenario script is
//! a directory has that directory packed into the artifacts directory. The
//! script is pointed at the archive name, and one `unpacker` service entry is
//! appended so workers expand the archives before the run starts. The entry
//! runs at `local`, which is the provisioning on the worker side, so the
//! submitting machine does not unpack its own uploads.

use crate::config::{EngineConfig, ServiceConfig};
use loadkit_common::{ArtifactsDir, find_file};
use loadkit_services::archive::{ArchiveError, pack_directory};
use loadkit_services::service::DEFAULT_RUN_AT;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Alias of the service entry appended for bundled scenarios.
pub const UNPACKER_ALIAS: &str = "unpacker";

/// Packs directory scripts and appends the unpacker entry.
///
/// Scripts are resolved against `search_paths`; scripts that resolve to a
/// regular file, or to nothing, are left alone. Returns the archives written,
/// in execution order. No service entry is added when nothing was packed.
///
/// # Errors
///
/// Returns any [`ArchiveError`] raised while packing.
pub fn bundle_for_cloud(
    config: &mut EngineConfig,
    artifacts: &ArtifactsDir,
    search_paths: &[PathBuf],
) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archives = Vec::new();

    for execution in &mut config.execution {
        let Some(scenario) = execution.scenario.as_mut() else {
            continue;
        };
        let Some(script) = scenario.script.as_deref() else {
            continue;
        };
        let Some(dir) = find_file(Path::new(script), search_paths).filter(|p| p.is_dir()) else {
            debug!("script {script} is not a directory; sending as is");
            continue;
        };

        let archive = pack_directory(&dir, artifacts)?;
        let name = archive_name(&archive)?;
        info!("packed {} into {name}", dir.display());
        scenario.script = Some(name);
        archives.push(archive);
    }

    if archives.is_empty() {
        return Ok(archives);
    }

    let files = archives
        .iter()
        .map(|archive| archive_name(archive).map(toml::Value::String))
        .collect::<Result<Vec<_>, _>>()?;
    let mut unpacker = ServiceConfig::new(UNPACKER_ALIAS);
    unpacker.run_at = Some(DEFAULT_RUN_AT.to_owned());
    unpacker
        .settings
        .insert("files".to_owned(), toml::Value::Array(files));
    config.services.push(unpacker);

    Ok(archives)
}

fn archive_name(archive: &Path) -> Result<String, ArchiveError> {
    archive
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| ArchiveError::InvalidEntryName(archive.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Execution, Scenario};
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    struct Workspace {
        temp: TempDir,
        artifacts: ArtifactsDir,
    }

    #[fixture]
    fn workspace() -> Workspace {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().join("artifacts")).expect("utf-8 path");
        let artifacts = ArtifactsDir::create(root).expect("artifacts dir");
        Workspace { temp, artifacts }
    }

    fn execution(script: &str) -> Execution {
        Execution {
            scenario: Some(Scenario {
                script: Some(script.to_owned()),
                extra: toml::Table::new(),
            }),
            extra: toml::Table::new(),
        }
    }

    fn scenario_dir(root: &Path, name: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("pom.xml"), "<project/>").expect("write");
    }

    #[rstest]
    fn directory_scripts_become_archives(workspace: Workspace) {
        scenario_dir(workspace.temp.path(), "java_package");
        scenario_dir(workspace.temp.path(), "other");
        fs::write(workspace.temp.path().join("plain.jmx"), "<jmx/>").expect("write");
        let search = vec![workspace.temp.path().to_path_buf()];

        let mut config = EngineConfig {
            execution: vec![
                execution("java_package"),
                execution("plain.jmx"),
                execution("other"),
                Execution::default(),
            ],
            ..EngineConfig::default()
        };

        let archives =
            bundle_for_cloud(&mut config, &workspace.artifacts, &search).expect("bundle succeeds");
        assert_eq!(archives.len(), 2);
        assert!(archives.iter().all(|archive| archive.is_file()));

        let scripts: Vec<Option<&str>> = config
            .execution
            .iter()
            .map(|e| e.scenario.as_ref().and_then(|s| s.script.as_deref()))
            .collect();
        assert_eq!(
            scripts,
            vec![Some("java_package.zip"), Some("plain.jmx"), Some("other.zip"), None]
        );

        assert_eq!(config.services.len(), 1);
        let unpacker = config.services.first().expect("unpacker entry");
        assert_eq!(unpacker.module, UNPACKER_ALIAS);
        assert_eq!(unpacker.run_at.as_deref(), Some("local"));
        assert_eq!(
            unpacker.settings.get("files"),
            Some(&toml::Value::Array(vec![
                toml::Value::String("java_package.zip".to_owned()),
                toml::Value::String("other.zip".to_owned()),
            ]))
        );
    }

    #[rstest]
    fn nothing_to_pack_adds_no_service(workspace: Workspace) {
        let mut config = EngineConfig {
            execution: vec![execution("missing_dir")],
            ..EngineConfig::default()
        };
        let archives = bundle_for_cloud(&mut config, &workspace.artifacts, &[])
            .expect("bundle succeeds");
        assert!(archives.is_empty());
        assert!(config.services.is_empty());
    }
}
