//! Command handlers -- one module per subcommand

pub mod config;
pub mod run;

use std::path::{Path, PathBuf};

use prodtree_core::config::ProdtreeConfig;
use prodtree_core::FailurePolicy;

use crate::error::CliError;

/// Values given on the command line that win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--log-level`
    pub log_level: Option<String>,
    /// `--on-failure`
    pub on_failure: Option<FailurePolicy>,
}

impl Overrides {
    /// Apply the flags to a loaded configuration.
    pub fn apply(&self, config: &mut ProdtreeConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(policy) = self.on_failure {
            config.checks.failure_policy = policy.to_string();
        }
    }
}

/// Load the effective configuration: defaults, file, environment, then flags.
///
/// Validation runs again after the flags are applied.
pub async fn load_config(path: &Path, overrides: &Overrides) -> Result<ProdtreeConfig, CliError> {
    let mut config = ProdtreeConfig::load(path).await?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Directory relative project paths are resolved against.
pub fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
