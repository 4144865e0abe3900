//! prodtree CLI entry point
//!
//! Parses arguments, initializes logging from the `[general]` section,
//! dispatches to a command handler and maps failures to exit codes.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use prodtree_core::config::{GeneralConfig, ProdtreeConfig};

use crate::cli::{Cli, Commands};
use crate::commands::Overrides;
use crate::commands::run::Phase;
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let overrides = Overrides {
        log_level: cli.log_level.clone(),
        on_failure: cli.on_failure.map(Into::into),
    };

    let general = logging_config(&cli, &overrides).await;
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("warning: {e:#}");
    }

    tracing::debug!(
        command = cli.command.name(),
        config = %cli.config.display(),
        "prodtree starting"
    );

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Run => commands::run::execute(Phase::All, &cli.config, &overrides, &writer).await,
        Commands::Excludes => {
            commands::run::execute(Phase::Tree, &cli.config, &overrides, &writer).await
        }
        Commands::Flatten => {
            commands::run::execute(Phase::Bom, &cli.config, &overrides, &writer).await
        }
        Commands::Config(args) => {
            commands::config::execute(args, &cli.config, &overrides, &writer).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(&e),
    }
}

/// Logging settings for this invocation.
///
/// A missing or broken configuration file must not prevent `config validate`
/// from reporting it, so any load failure falls back to the defaults.
async fn logging_config(cli: &Cli, overrides: &Overrides) -> GeneralConfig {
    let mut general = match ProdtreeConfig::from_file(&cli.config).await {
        Ok(mut config) => {
            config.apply_env_overrides();
            config.general
        }
        Err(_) => GeneralConfig::default(),
    };
    if let Some(level) = &overrides.log_level {
        general.log_level = level.clone();
    }
    general
}

fn report_failure(e: &CliError) -> ExitCode {
    tracing::debug!(exit_code = e.exit_code(), "command failed");
    eprintln!("error: {e}");
    // 종료 코드는 0..=255 범위
    ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
}
