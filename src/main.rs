//! loadkit CLI entrypoint.
//!
//! Runs the configured services, packs scenario directories, or checks that
//! every configured module is usable. Errors are classified so that a normal
//! shutdown exits with 0, configuration errors with 2 and tool errors with 1.

use camino::Utf8PathBuf;
use clap::Parser;
use env_logger::Env;
use loadkit::cli::{CheckInstallArgs, Cli, Command, PackArgs, RunArgs};
use loadkit::config::EngineConfig;
use loadkit::engine::{Engine, EngineError};
use loadkit_common::ArtifactsDir;
use loadkit_services::archive::pack_directory;
use loadkit_services::error::Severity;
use log::info;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<(), EngineError> {
    match &cli.command {
        Command::Run(args) => run_services(args),
        Command::Pack(args) => pack(args, stdout),
        Command::CheckInstall(args) => check_install(args),
    }
}

fn run_services(args: &RunArgs) -> Result<(), EngineError> {
    let mut config = EngineConfig::load(&args.config)?;
    if let Some(dir) = &args.artifacts_dir {
        config.settings.artifacts_dir = dir.clone();
    }
    if let Some(provisioning) = &args.provisioning {
        config.provisioning = provisioning.clone();
    }
    Engine::new(config)?.run()
}

fn check_install(args: &CheckInstallArgs) -> Result<(), EngineError> {
    let mut config = EngineConfig::load(&args.config)?;
    config.install_check_only();
    Engine::new(config)?.run()
}

fn pack(args: &PackArgs, stdout: &mut dyn Write) -> Result<(), EngineError> {
    let artifacts = ArtifactsDir::create(args.artifacts_dir.clone()).map_err(|source| {
        EngineError::Artifacts {
            path: args.artifacts_dir.clone(),
            source,
        }
    })?;
    let archive = pack_directory(args.dir.as_std_path(), &artifacts)?;
    write_line(stdout, archive.display());
    Ok(())
}

fn exit_code_for_run_result(result: Result<(), EngineError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) if err.severity() == Severity::NormalShutdown => {
            info!("{err}");
            0
        }
        Err(err) => {
            write_line(stderr, &err);
            err.exit_code()
        }
    }
}

fn write_line(out: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}
