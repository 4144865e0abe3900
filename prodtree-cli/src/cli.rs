//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use prodtree_core::FailurePolicy;

/// prodtree -- keeps a productized subset of a multi-module source tree consistent.
///
/// Use `prodtree <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "prodtree", version, about, long_about = None)]
pub struct Cli {
    /// Path to the prodtree.toml configuration file.
    #[arg(short, long, global = true, default_value = "prodtree.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Override the failure policy of every policy-gated check.
    #[arg(long, global = true)]
    pub on_failure: Option<FailureMode>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Failure policy accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailureMode {
    /// Abort on the first violation.
    Fail,
    /// Log violations as warnings and continue.
    Warn,
    /// Suppress violations.
    Ignore,
}

impl From<FailureMode> for FailurePolicy {
    fn from(mode: FailureMode) -> Self {
        match mode {
            FailureMode::Fail => FailurePolicy::Fail,
            FailureMode::Warn => FailurePolicy::Warn,
            FailureMode::Ignore => FailurePolicy::Ignore,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tree phase and the BOM phase.
    Run,

    /// Run the tree phase only (closure, module links, version styles, manifest).
    Excludes,

    /// Run the BOM phase only (flattening, banned dependencies, consistency checks).
    Flatten,

    /// Manage configuration.
    Config(ConfigArgs),
}

impl Commands {
    /// Subcommand name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Excludes => "excludes",
            Self::Flatten => "flatten",
            Self::Config(_) => "config",
        }
    }
}

// ---- config ----

/// Manage prodtree configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + flags + defaults).
    Show {
        /// Show only a specific section (general, project, closure, flatten, banned, checks, resolver).
        #[arg(long)]
        section: Option<String>,
    },
}
