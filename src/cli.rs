//! CLI argument definitions for the loadkit binary.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the entrypoint so the argument surface can be tested directly.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Drive loadkit services for a load test run.
#[derive(Parser, Debug)]
#[command(name = "loadkit")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Run the services declared in a configuration:\n",
    "    $ loadkit run loadkit.toml\n\n",
    "  Bundle scenarios for the cloud and run cloud-side services:\n",
    "    $ loadkit run loadkit.toml --provisioning cloud\n\n",
    "  Pack a scenario directory into a stored zip:\n",
    "    $ loadkit pack tests/java_package\n\n",
    "  Check that every configured module and its tools are usable:\n",
    "    $ loadkit check-install loadkit.toml\n\n",
    "Set RUST_LOG to control log output.",
))]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the configured services through their lifecycle.
    Run(RunArgs),

    /// Pack a directory into a stored zip archive.
    Pack(PackArgs),

    /// Check that every configured module can be built and its tools run.
    CheckInstall(CheckInstallArgs),
}

/// Arguments for the run command.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Engine configuration file.
    #[arg(value_name = "CONFIG")]
    pub config: Utf8PathBuf,

    /// Override the configured artifacts directory.
    #[arg(short, long, value_name = "DIR")]
    pub artifacts_dir: Option<Utf8PathBuf>,

    /// Override the configured provisioning (`local` or `cloud`).
    #[arg(short, long, value_name = "PROVISIONING")]
    pub provisioning: Option<String>,
}

/// Arguments for the pack command.
#[derive(Parser, Debug, Clone)]
pub struct PackArgs {
    /// Directory to pack.
    #[arg(value_name = "DIR")]
    pub dir: Utf8PathBuf,

    /// Directory receiving the archive.
    #[arg(short, long, value_name = "DIR", default_value = "artifacts")]
    pub artifacts_dir: Utf8PathBuf,
}

/// Arguments for the check-install command.
#[derive(Parser, Debug, Clone)]
pub struct CheckInstallArgs {
    /// Engine configuration file.
    #[arg(value_name = "CONFIG")]
    pub config: Utf8PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn run_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "loadkit",
            "run",
            "loadkit.toml",
            "--artifacts-dir",
            "out",
            "--provisioning",
            "cloud",
        ])
        .expect("arguments parse");

        assert!(!cli.verbose);
        let Command::Run(args) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(args.config, Utf8PathBuf::from("loadkit.toml"));
        assert_eq!(args.artifacts_dir, Some(Utf8PathBuf::from("out")));
        assert_eq!(args.provisioning.as_deref(), Some("cloud"));
    }

    #[rstest]
    fn pack_defaults_artifacts_dir() {
        let cli = Cli::try_parse_from(["loadkit", "pack", "tests/java_package", "-v"])
            .expect("arguments parse");

        assert!(cli.verbose);
        let Command::Pack(args) = cli.command else {
            panic!("expected the pack command");
        };
        assert_eq!(args.artifacts_dir, Utf8PathBuf::from("artifacts"));
    }

    #[rstest]
    fn check_install_takes_a_config() {
        let cli = Cli::try_parse_from(["loadkit", "check-install", "loadkit.toml"])
            .expect("arguments parse");
        assert!(matches!(cli.command, Command::CheckInstall(_)));
    }

    #[rstest]
    #[case::missing_subcommand(&["loadkit"])]
    #[case::missing_config(&["loadkit", "run"])]
    fn incomplete_invocations_are_rejected(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
