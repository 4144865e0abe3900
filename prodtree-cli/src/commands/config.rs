//! `prodtree config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use prodtree_core::config::ProdtreeConfig;
use prodtree_engine::EngineConfig;

use super::{Overrides, config_dir, load_config};
use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Section names accepted by `config show --section`.
pub const SECTIONS: [&str; 7] = [
    "general", "project", "closure", "flatten", "banned", "checks", "resolver",
];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    overrides: &Overrides,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, overrides, writer).await,
        ConfigAction::Show { section } => {
            execute_show(config_path, overrides, section, writer).await
        }
    }
}

/// Execute the config validate subcommand.
///
/// Loads the file, applies overrides, and derives the engine configuration,
/// so patterns and enum values are checked the same way a run checks them.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails.
async fn execute_validate(
    config_path: &Path,
    overrides: &Overrides,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let result = match load_config(config_path, overrides).await {
        Ok(config) => EngineConfig::from_core(&config, &config_dir(config_path))
            .map(|_| ())
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: result.is_ok(),
        errors: result.err().into_iter().collect(),
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Execute the config show subcommand.
///
/// Displays the effective configuration (file + env overrides + flags + defaults).
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if the section name is unknown.
async fn execute_show(
    config_path: &Path,
    overrides: &Overrides,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = load_config(config_path, overrides).await?;
    let report = ConfigReport {
        source: config_path.display().to_string(),
        config_toml: section_toml(&config, section.as_deref())?,
        section,
    };

    writer.render(&report)?;

    Ok(())
}

/// Serialize the whole configuration or one of its sections to TOML.
pub fn section_toml(config: &ProdtreeConfig, section: Option<&str>) -> Result<String, CliError> {
    let rendered = match section {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("project") => toml::to_string_pretty(&config.project),
        Some("closure") => toml::to_string_pretty(&config.closure),
        Some("flatten") => toml::to_string_pretty(&config.flatten),
        Some("banned") => toml::to_string_pretty(&config.banned),
        Some("checks") => toml::to_string_pretty(&config.checks),
        Some("resolver") => toml::to_string_pretty(&config.resolver),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };
    Ok(rendered.unwrap_or_else(|e| format!("(serialization error: {})", e)))
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization (only used for text rendering).
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Serialized TOML configuration
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(payload: &dyn Render) -> String {
        let mut buffer = Vec::new();
        payload
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_section_toml_every_section() {
        let config = ProdtreeConfig::default();
        for section in SECTIONS {
            assert!(
                section_toml(&config, Some(section)).is_ok(),
                "section {section} should serialize"
            );
        }
        let checks = section_toml(&config, Some("checks")).expect("checks section");
        assert!(checks.contains("failure_policy"));
        assert!(!checks.contains("[general]"));
    }

    #[test]
    fn test_section_toml_full_config_has_all_tables() {
        let full = section_toml(&ProdtreeConfig::default(), None).expect("full config");
        for section in SECTIONS {
            assert!(full.contains(&format!("[{section}]")), "missing [{section}]");
        }
    }

    #[test]
    fn test_section_toml_unknown_section() {
        let err = section_toml(&ProdtreeConfig::default(), Some("ebpf"))
            .expect_err("unknown section should fail");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("resolver"), "should list valid sections");
    }

    #[test]
    fn test_config_report_render_text_specific_section() {
        let report = ConfigReport {
            source: "/work/prodtree.toml".to_owned(),
            section: Some("closure".to_owned()),
            config_toml: "marker = \"prodtree:excluded\"".to_owned(),
        };

        let output = render(&report);
        assert!(output.contains("[closure]"), "should show section name");
        assert!(output.contains("marker"), "should show config content");
    }

    #[test]
    fn test_config_report_json_serialization() {
        let report = ConfigReport {
            source: "prodtree.toml".to_owned(),
            section: Some("flatten".to_owned()),
            config_toml: "enabled = true".to_owned(),
        };

        let json = serde_json::to_value(&report).expect("JSON serialization should succeed");
        assert_eq!(json["source"].as_str(), Some("prodtree.toml"));
        assert_eq!(json["section"].as_str(), Some("flatten"));
        assert!(json.get("config_toml").is_none(), "config_toml should be skipped");
    }

    #[test]
    fn test_config_validation_report_valid() {
        let report = ConfigValidationReport {
            source: "prodtree.toml".to_owned(),
            valid: true,
            errors: Vec::new(),
        };

        let output = render(&report);
        assert!(output.contains("VALID"), "should show valid status");
        assert!(!output.contains("Error:"), "should not show errors");
    }

    #[test]
    fn test_config_validation_report_invalid() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["invalid config value for 'closure.roots': at least one root pattern is required".to_owned()],
        };

        let output = render(&report);
        assert!(output.contains("INVALID"), "should show invalid status");
        assert!(output.contains("closure.roots"), "should show error message");
    }
}
