//! Long-running tool processes owned by a service.
//!
//! A [`ToolProcess`] wraps a spawned child (an emulator, an Appium server)
//! whose output is redirected to files in the artifacts directory. The
//! handle terminates the child on [`ToolProcess::terminate`] and again on
//! drop, so a service that fails midway never leaks a process.

use crate::error::{Result, ServiceError};
use log::{debug, info, warn};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// How long to wait for a killed process to be reaped.
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to launch a tool.
#[derive(Debug, Clone, Default)]
pub struct LaunchSpec {
    /// Short name used in logs and output file names.
    pub tool: String,
    /// Executable to run.
    pub program: PathBuf,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub envs: Vec<(String, OsString)>,
    /// Directory receiving `<tool>.out` and `<tool>.err`.
    pub log_dir: PathBuf,
}

impl LaunchSpec {
    /// Creates a spec for `program` logging into `log_dir`.
    #[must_use]
    pub fn new(tool: &str, program: impl Into<PathBuf>, log_dir: &Path) -> Self {
        Self {
            tool: tool.to_owned(),
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            log_dir: log_dir.to_path_buf(),
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.envs.push((key.to_owned(), value.into()));
        self
    }

    fn stdout_path(&self) -> PathBuf {
        self.log_dir.join(format!("{}.out", self.tool))
    }

    fn stderr_path(&self) -> PathBuf {
        self.log_dir.join(format!("{}.err", self.tool))
    }
}

/// A spawned tool process with guaranteed termination.
#[derive(Debug)]
pub struct ToolProcess {
    tool: String,
    child: Option<Child>,
}

impl ToolProcess {
    /// Spawns the tool and watches it for `probe`.
    ///
    /// A process that exits with a failure status inside the probe window is
    /// reported as a failure carrying its stderr. A process that exits
    /// successfully (for example a launcher that daemonises) is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ToolFailed`] when the program cannot be
    /// spawned or fails during the probe, and [`ServiceError::Io`] when the
    /// log files cannot be created.
    pub fn spawn(spec: &LaunchSpec, probe: Duration) -> Result<Self> {
        fs::create_dir_all(&spec.log_dir)?;
        let stdout = fs::File::create(spec.stdout_path())?;
        let stderr = fs::File::create(spec.stderr_path())?;

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        for (key, value) in &spec.envs {
            cmd.env(key, value);
        }

        info!(
            "starting {}: {} {}",
            spec.tool,
            spec.program.display(),
            spec.args.join(" ")
        );
        let child = cmd.spawn().map_err(|e| ServiceError::ToolFailed {
            tool: spec.tool.clone(),
            message: format!("could not start {}: {e}", spec.program.display()),
        })?;
        // Owned from here on, so every early return below kills the child.
        let mut process = Self {
            tool: spec.tool.clone(),
            child: Some(child),
        };
        if !probe.is_zero() {
            process.probe(spec, probe)?;
        }
        Ok(process)
    }

    fn probe(&mut self, spec: &LaunchSpec, probe: Duration) -> Result<()> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        let Some(status) = child.wait_timeout(probe)? else {
            return Ok(());
        };
        if status.success() {
            debug!("{} exited during startup with {status}", self.tool);
            return Ok(());
        }
        let stderr = fs::read_to_string(spec.stderr_path()).unwrap_or_default();
        let message = match stderr.trim() {
            "" => format!("exited early with {status}"),
            trimmed => trimmed.to_owned(),
        };
        Err(ServiceError::ToolFailed {
            tool: self.tool.clone(),
            message,
        })
    }

    /// Name of the tool.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Returns `true` while the child has not been reaped.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Kills the child if it is still running and reaps it.
    ///
    /// Calling this more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Io`] when the process cannot be signalled or
    /// waited on.
    pub fn terminate(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if child.try_wait()?.is_some() {
            debug!("{} already exited", self.tool);
            return Ok(());
        }

        info!("stopping {}", self.tool);
        child.kill()?;
        if child.wait_timeout(TERMINATE_TIMEOUT)?.is_none() {
            warn!(
                "{} did not exit within {} seconds of being killed",
                self.tool,
                TERMINATE_TIMEOUT.as_secs()
            );
        }
        Ok(())
    }
}

impl Drop for ToolProcess {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            warn!("failed to stop {}: {e}", self.tool);
        }
    }
}
