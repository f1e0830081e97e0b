//! Unit tests for the service lifecycle driver.

use super::*;
use crate::config::ServiceConfig;
use loadkit_services::error::Result as ServiceResult;
use rstest::{fixture, rstest};
use std::cell::RefCell;
use tempfile::TempDir;

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(event: String) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

fn events() -> Vec<String> {
    EVENTS.with(|events| events.borrow().clone())
}

struct Recorder {
    alias: String,
    fail_at: Option<String>,
}

impl Recorder {
    fn step(&self, step: &str) -> ServiceResult<()> {
        record(format!("{step} {}", self.alias));
        if self.fail_at.as_deref() == Some(step) {
            return Err(ServiceError::ToolFailed {
                tool: self.alias.clone(),
                message: format!("{step} failed"),
            });
        }
        Ok(())
    }
}

impl Service for Recorder {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn prepare(&mut self, _ctx: &ServiceContext<'_>) -> ServiceResult<()> {
        self.step("prepare")
    }

    fn startup(&mut self, _ctx: &ServiceContext<'_>) -> ServiceResult<()> {
        self.step("startup")
    }

    fn shutdown(&mut self) -> ServiceResult<()> {
        self.step("shutdown")
    }

    fn post_process(&mut self) -> ServiceResult<()> {
        self.step("post_process")
    }
}

fn recorder(alias: &str, settings: &toml::Table) -> ServiceResult<Box<dyn Service>> {
    let fail_at = settings
        .get("fail-at")
        .and_then(toml::Value::as_str)
        .map(str::to_owned);
    Ok(Box::new(Recorder {
        alias: alias.to_owned(),
        fail_at,
    }))
}

struct Harness {
    temp: TempDir,
    config: EngineConfig,
}

#[fixture]
fn harness() -> Harness {
    let temp = TempDir::new().expect("temp dir");
    let mut config = EngineConfig::default();
    config.settings.artifacts_dir =
        Utf8PathBuf::try_from(temp.path().join("artifacts")).expect("utf-8 path");
    for alias in ["first", "second", "third"] {
        config
            .modules
            .insert(alias.to_owned(), "tests.mocks.Recorder".to_owned());
    }
    Harness { temp, config }
}

fn service(alias: &str, fail_at: Option<&str>, run_at: Option<&str>) -> ServiceConfig {
    let mut entry = ServiceConfig::new(alias);
    entry.run_at = run_at.map(str::to_owned);
    if let Some(step) = fail_at {
        entry
            .settings
            .insert("fail-at".to_owned(), toml::Value::String(step.to_owned()));
    }
    entry
}

fn run(config: EngineConfig) -> Result<(), EngineError> {
    let mut registry = ModuleRegistry::with_builtins();
    registry.register("tests.mocks.Recorder", recorder);
    let mut engine = Engine::with_registry(config, registry).expect("engine");
    engine.run()
}

#[rstest]
fn services_start_in_order_and_stop_in_reverse(mut harness: Harness) {
    harness.config.services = vec![service("first", None, None), service("second", None, None)];

    run(harness.config).expect("run succeeds");
    assert_eq!(
        events(),
        vec![
            "prepare first",
            "prepare second",
            "startup first",
            "startup second",
            "shutdown second",
            "shutdown first",
            "post_process second",
            "post_process first",
        ]
    );
}

#[rstest]
fn failed_prepare_still_tears_down_prepared_services(mut harness: Harness) {
    harness.config.services = vec![
        service("first", None, None),
        service("second", Some("prepare"), None),
        service("third", None, None),
    ];

    let err = run(harness.config).expect_err("run fails");
    assert!(matches!(
        err,
        EngineError::Service(ServiceError::ToolFailed { ref tool, .. }) if tool == "second"
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(
        events(),
        vec![
            "prepare first",
            "prepare second",
            "shutdown second",
            "shutdown first",
            "post_process second",
            "post_process first",
        ]
    );
}

#[rstest]
fn first_error_wins_over_shutdown_errors(mut harness: Harness) {
    harness.config.services = vec![
        service("first", Some("shutdown"), None),
        service("second", Some("startup"), None),
    ];

    let err = run(harness.config).expect_err("run fails");
    assert!(err.to_string().contains("startup failed"));
    assert!(events().contains(&"post_process first".to_owned()));
}

#[rstest]
fn shutdown_error_fails_an_otherwise_clean_run(mut harness: Harness) {
    harness.config.services = vec![service("first", Some("post_process"), None)];

    let err = run(harness.config).expect_err("run fails");
    assert!(err.to_string().contains("post_process failed"));
}

#[rstest]
#[case::local_skips_cloud("local", vec!["prepare first"])]
#[case::cloud_skips_default("cloud", vec!["prepare second"])]
fn run_at_gates_services(
    mut harness: Harness,
    #[case] provisioning: &str,
    #[case] expected: Vec<&str>,
) {
    harness.config.provisioning = provisioning.to_owned();
    harness.config.services = vec![
        service("first", None, None),
        service("second", None, Some("cloud")),
    ];

    run(harness.config).expect("run succeeds");
    let prepared: Vec<String> = events()
        .into_iter()
        .filter(|event| event.starts_with("prepare"))
        .collect();
    assert_eq!(prepared, expected);
}

#[cfg(unix)]
#[rstest]
fn install_checker_ends_the_run_normally(mut harness: Harness) {
    use loadkit_services::test_utils::{LONG_RUNNING_SCRIPT, fake_sdk, with_android_home};

    let sdk = fake_sdk(&harness.temp.path().join("sdk"), LONG_RUNNING_SCRIPT);
    harness.config.install_check_only();

    let result = with_android_home(Some(sdk.as_path()), || run(harness.config));
    let err = result.expect_err("checker stops the run");
    assert_eq!(err.severity(), Severity::NormalShutdown);
    assert_eq!(err.exit_code(), 0);
}

#[rstest]
fn install_check_without_android_sdk_ends_normally(mut harness: Harness) {
    use loadkit_services::test_utils::with_android_home;

    harness.config.install_check_only();

    let result = with_android_home(None, || run(harness.config));
    let err = result.expect_err("checker stops the run");
    assert_eq!(err.severity(), Severity::NormalShutdown);
    assert_eq!(err.exit_code(), 0);
}

#[rstest]
fn broken_module_reference_fails_install_check(mut harness: Harness) {
    harness
        .config
        .modules
        .insert("err".to_owned(), "hello there".to_owned());
    harness.config.install_check_only();

    let err = run(harness.config).expect_err("checker fails");
    assert_eq!(err.severity(), Severity::Tool);
    assert_eq!(err.exit_code(), 1);
}

#[rstest]
fn unknown_service_alias_is_a_configuration_error(mut harness: Harness) {
    harness.config.services = vec![service("nobody", None, None)];

    let err = run(harness.config).expect_err("run fails");
    assert_eq!(err.exit_code(), 2);
    assert!(events().is_empty());
}

#[rstest]
fn effective_config_is_written(mut harness: Harness) {
    harness.config.services = vec![service("first", None, None)];
    let artifacts = harness.temp.path().join("artifacts");

    run(harness.config.clone()).expect("run succeeds");
    let written = Utf8PathBuf::try_from(artifacts.join(EFFECTIVE_CONFIG))
        .expect("utf-8 path");
    let reloaded = EngineConfig::load(&written).expect("effective config loads");
    assert_eq!(reloaded, harness.config);
}

#[rstest]
fn cloud_run_bundles_directory_scripts(mut harness: Harness) {
    let scenario = harness.temp.path().join("java_package");
    std::fs::create_dir_all(&scenario).expect("mkdir");
    std::fs::write(scenario.join("pom.xml"), "<project/>").expect("write");

    harness.config.provisioning = "cloud".to_owned();
    harness.config.execution = vec![crate::config::Execution {
        scenario: Some(crate::config::Scenario {
            script: scenario.to_str().map(str::to_owned),
            extra: toml::Table::new(),
        }),
        extra: toml::Table::new(),
    }];

    let mut engine = Engine::new(harness.config).expect("engine");
    engine.run().expect("run succeeds");

    let config = engine.config();
    assert_eq!(config.services.len(), 1);
    assert!(engine.artifacts().path().join("java_package.zip").is_file());
}

#[rstest]
fn config_errors_map_to_exit_code_two() {
    let err = EngineError::from(ConfigError::Serialise(
        <toml::ser::Error as serde::ser::Error>::custom("boom"),
    ));
    assert_eq!(err.severity(), Severity::Configuration);
    assert_eq!(err.exit_code(), 2);
}
