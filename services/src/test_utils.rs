//! Shared test utilities for the services crate.

use crate::deps::CommandExecutor;
use crate::error::Result;
use crate::mobile::sdk::ANDROID_HOME;
use crate::registry::{ModuleRegistry, ModuleTable, builtin_modules};
use crate::service::ServiceContext;
use camino::Utf8PathBuf;
use loadkit_common::ArtifactsDir;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "appium").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Creates a stub that expects no invocations at all.
    pub fn idle() -> Self {
        Self::new(Vec::new())
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected.pop_front().expect("unexpected command invocation");

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args.as_slice(), args);

        call.result
    }
}

/// Script body for a fake emulator that stays up until killed.
pub const LONG_RUNNING_SCRIPT: &str = "#!/bin/sh\nexec sleep 30\n";

/// Script body for a fake emulator that fails immediately.
pub const FAILING_SCRIPT: &str = "#!/bin/sh\necho 'PANIC: unknown AVD' >&2\nexit 1\n";

/// Lays out a minimal Android SDK under `root` with an executable
/// `tools/emulator` running `script`.
///
/// # Panics
///
/// Panics if the files cannot be written.
#[cfg(unix)]
pub fn fake_sdk(root: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let tools = root.join("tools");
    std::fs::create_dir_all(&tools).expect("create tools dir");
    let emulator = tools.join("emulator");
    std::fs::write(&emulator, script).expect("write fake emulator");
    std::fs::set_permissions(&emulator, std::fs::Permissions::from_mode(0o755))
        .expect("make fake emulator executable");
    root.to_path_buf()
}

/// Runs `f` with `ANDROID_HOME` set to `value`, or unset when `None`.
///
/// Environment changes are serialised across tests and restored afterwards.
pub fn with_android_home<R>(value: Option<&Path>, f: impl FnOnce() -> R) -> R {
    temp_env::with_var(ANDROID_HOME, value, f)
}

/// Owns everything a [`ServiceContext`] borrows, rooted in a temp directory.
pub struct TestEngine {
    /// Scratch directory holding the artifacts directory.
    pub temp: tempfile::TempDir,
    /// Artifacts directory below `temp`.
    pub artifacts: ArtifactsDir,
    /// Search paths used to resolve declared files.
    pub file_search_paths: Vec<PathBuf>,
    /// Provisioning value handed to services.
    pub provisioning: String,
    /// Configured modules.
    pub modules: ModuleTable,
    /// Known component factories.
    pub registry: ModuleRegistry,
}

impl TestEngine {
    /// Creates a local-provisioning engine with the built-in modules and the
    /// artifacts directory as the only search path.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory cannot be created or is not UTF-8.
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().join("artifacts"))
            .expect("utf-8 temp dir");
        let artifacts = ArtifactsDir::create(root).expect("artifacts dir");
        let file_search_paths = vec![artifacts.path().as_std_path().to_path_buf()];
        Self {
            temp,
            artifacts,
            file_search_paths,
            provisioning: "local".to_owned(),
            modules: builtin_modules(),
            registry: ModuleRegistry::with_builtins(),
        }
    }

    /// Path of the artifacts directory.
    pub fn artifacts_dir(&self) -> &Path {
        self.artifacts.path().as_std_path()
    }

    /// Borrows the engine state as a service context.
    pub fn ctx(&self) -> ServiceContext<'_> {
        ServiceContext {
            artifacts: &self.artifacts,
            file_search_paths: &self.file_search_paths,
            provisioning: &self.provisioning,
            modules: &self.modules,
            registry: &self.registry,
        }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
