//! The `InstallChecker` service verifies that every configured module can be
//! built and that its external tools are usable, then stops the run.

use crate::error::{Result, ServiceError};
use crate::service::{Service, ServiceContext, parse_settings};
use log::{debug, error, info};
use serde::Deserialize;

/// The checker takes no settings; unknown keys are still rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallCheckerSettings {}

/// Checks every configured module and ends the run.
#[derive(Debug)]
pub struct InstallChecker {
    alias: String,
}

impl InstallChecker {
    /// Creates a checker for `alias`.
    #[must_use]
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_owned(),
        }
    }

    /// Registry factory.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidSettings`] when settings are supplied.
    pub fn factory(alias: &str, settings: &toml::Table) -> Result<Box<dyn Service>> {
        let InstallCheckerSettings {} = parse_settings(alias, settings)?;
        Ok(Box::new(Self::new(alias)))
    }

    fn check_module(ctx: &ServiceContext<'_>, alias: &str) -> Result<()> {
        let service = ctx
            .registry
            .instantiate_alias(ctx.modules, alias, &toml::Table::new())?;
        match service.check_tools() {
            Err(e) if e.is_normal_shutdown() => {
                debug!("{alias}: {e}");
                Ok(())
            }
            other => other,
        }
    }
}

impl Service for InstallChecker {
    fn alias(&self) -> &str {
        &self.alias
    }

    /// Always fails: with [`ServiceError::ToolsCheckFailed`] when any module
    /// is unusable, otherwise with [`ServiceError::NormalShutdown`].
    fn prepare(&mut self, ctx: &ServiceContext<'_>) -> Result<()> {
        let mut failed = Vec::new();
        let mut first_error = None;

        for alias in ctx.modules.keys() {
            info!("checking {alias}");
            if let Err(e) = Self::check_module(ctx, alias) {
                error!("{alias} is not usable: {e}");
                failed.push(alias.clone());
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(source) => Err(ServiceError::ToolsCheckFailed {
                failed,
                source: Box::new(source),
            }),
            None => Err(ServiceError::NormalShutdown {
                reason: "done checking for installed tools".to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::registry::ModuleSpec;
    use crate::test_utils::TestEngine;
    use rstest::{fixture, rstest};

    struct CheckedModule {
        alias: String,
        outcome: fn() -> Result<()>,
    }

    impl Service for CheckedModule {
        fn alias(&self) -> &str {
            &self.alias
        }

        fn prepare(&mut self, _ctx: &ServiceContext<'_>) -> Result<()> {
            Ok(())
        }

        fn check_tools(&self) -> Result<()> {
            (self.outcome)()
        }
    }

    fn module(alias: &str, outcome: fn() -> Result<()>) -> Box<dyn Service> {
        Box::new(CheckedModule {
            alias: alias.to_owned(),
            outcome,
        })
    }

    fn usable(alias: &str, _settings: &toml::Table) -> Result<Box<dyn Service>> {
        Ok(module(alias, || Ok(())))
    }

    fn unusable(alias: &str, _settings: &toml::Table) -> Result<Box<dyn Service>> {
        Ok(module(alias, || {
            Err(ServiceError::ToolNotFound {
                tool: "mock-tool".to_owned(),
                path: "/nowhere".into(),
            })
        }))
    }

    fn not_applicable(alias: &str, _settings: &toml::Table) -> Result<Box<dyn Service>> {
        Ok(module(alias, || {
            Err(ServiceError::NormalShutdown {
                reason: "nothing to check".to_owned(),
            })
        }))
    }

    #[fixture]
    fn engine() -> TestEngine {
        let mut engine = TestEngine::new();
        engine.modules.clear();
        engine.registry.register("tests.mocks.Usable", usable);
        engine.registry.register("tests.mocks.Unusable", unusable);
        engine.registry.register("tests.mocks.NotApplicable", not_applicable);
        engine
    }

    fn configure(engine: &mut TestEngine, alias: &str, reference: &str) {
        engine
            .modules
            .insert(alias.to_owned(), ModuleSpec::new(reference));
    }

    #[rstest]
    fn usable_modules_end_in_normal_shutdown(mut engine: TestEngine) {
        configure(&mut engine, "dummy", "tests.mocks.Usable");
        configure(&mut engine, "quiet", "tests.mocks.NotApplicable");

        let mut checker = InstallChecker::new("install-checker");
        let err = checker.prepare(&engine.ctx()).expect_err("checker stops the run");
        assert!(err.is_normal_shutdown());
        assert_eq!(err.severity(), Severity::NormalShutdown);
    }

    #[rstest]
    fn malformed_reference_fails_the_check(mut engine: TestEngine) {
        configure(&mut engine, "err", "hello there");

        let mut checker = InstallChecker::new("install-checker");
        let err = checker.prepare(&engine.ctx()).expect_err("checker fails");
        assert_eq!(err.severity(), Severity::Tool);
        assert!(matches!(
            err,
            ServiceError::ToolsCheckFailed { ref failed, ref source }
                if failed == &["err"]
                    && matches!(**source, ServiceError::InvalidModuleReference { .. })
        ));
    }

    #[rstest]
    fn every_failure_is_listed_and_the_first_kept(mut engine: TestEngine) {
        configure(&mut engine, "a-broken", "tests.mocks.Unusable");
        configure(&mut engine, "b-fine", "tests.mocks.Usable");
        configure(&mut engine, "c-ghost", "tests.mocks.Ghost");

        let mut checker = InstallChecker::new("install-checker");
        let err = checker.prepare(&engine.ctx()).expect_err("checker fails");
        let ServiceError::ToolsCheckFailed { failed, source } = err else {
            panic!("expected ToolsCheckFailed");
        };
        assert_eq!(failed, vec!["a-broken", "c-ghost"]);
        assert!(matches!(*source, ServiceError::ToolNotFound { .. }));
    }

    #[rstest]
    fn no_modules_is_a_normal_shutdown(engine: TestEngine) {
        let mut checker = InstallChecker::new("install-checker");
        let err = checker.prepare(&engine.ctx()).expect_err("checker stops the run");
        assert!(err.is_normal_shutdown());
    }

    #[rstest]
    fn factory_accepts_empty_settings_only() {
        assert!(InstallChecker::factory("install-checker", &toml::Table::new()).is_ok());
        let table: toml::Table = toml::from_str("verbose = true\n").expect("toml");
        assert!(InstallChecker::factory("install-checker", &table).is_err());
    }
}
