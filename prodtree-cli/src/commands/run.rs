//! `prodtree run`, `prodtree excludes` and `prodtree flatten` command handlers

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use tracing::info;

use prodtree_engine::{BomReport, EngineConfig, ProdEngine, ProdReport, TreeReport};

use super::{Overrides, config_dir, load_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render, write_list};

/// Which phases a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Tree phase, then BOM phase when flattening is enabled.
    All,
    /// Tree phase only.
    Tree,
    /// BOM phase only.
    Bom,
}

/// Execute one of the engine commands.
///
/// The engine does blocking file I/O, so it runs on the blocking pool.
pub async fn execute(
    phase: Phase,
    config_path: &Path,
    overrides: &Overrides,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let core = load_config(config_path, overrides).await?;
    let engine_config = EngineConfig::from_core(&core, &config_dir(config_path))?;

    info!(
        phase = ?phase,
        root = %engine_config.root_dir.display(),
        policy = %engine_config.failure_policy,
        "starting engine"
    );

    let report = tokio::task::spawn_blocking(move || {
        let engine = ProdEngine::new(engine_config);
        match phase {
            Phase::All => engine.run(),
            Phase::Tree => engine.run_excludes(),
            Phase::Bom => engine.run_flatten(),
        }
    })
    .await
    .map_err(|e| CliError::Command(format!("engine task failed: {e}")))??;

    info!(run_id = %report.run_id, "engine finished");
    writer.render(&report)?;
    Ok(())
}

impl Render for ProdReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Run {}", self.run_id.dimmed())?;
        if let Some(tree) = &self.tree {
            render_tree(tree, w)?;
        }
        if let Some(bom) = &self.bom {
            render_bom(bom, w)?;
        }
        Ok(())
    }
}

fn render_tree(tree: &TreeReport, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "{}", "Tree phase".bold())?;
    writeln!(
        w,
        "  {:<16} {} ({} required, {} excluded)",
        "modules:",
        tree.modules,
        tree.required,
        tree.excluded.len()
    )?;
    write_list(w, "roots", &tree.roots)?;
    write_list(w, "excluded", &tree.excluded)?;
    write_list(w, "relinked", &tree.relinked)?;
    write_list(w, "unlinked", &tree.unlinked)?;
    writeln!(
        w,
        "  {:<16} {} written ({} edits, {} styled modules)",
        "descriptors:",
        tree.descriptors_written.len(),
        tree.edits,
        tree.styled_modules
    )?;
    let manifest = if tree.manifest_written {
        "written".green()
    } else {
        "unchanged".normal()
    };
    writeln!(w, "  {:<16} {}", "manifest:", manifest)?;
    if !tree.cleanup.removed.is_empty() || !tree.cleanup.unpacked.is_empty() {
        writeln!(
            w,
            "  {:<16} {} removed, {} unpacked",
            "cleanup:",
            tree.cleanup.removed.len(),
            tree.cleanup.unpacked.len()
        )?;
    }
    Ok(())
}

fn render_bom(bom: &BomReport, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "{} {}", "BOM phase".bold(), bom.bom)?;
    writeln!(
        w,
        "  {:<16} {} full, {} reduced",
        "constraints:", bom.constraints, bom.reduced
    )?;
    writeln!(w, "  {:<16} {} written", "files:", bom.files_written.len())?;

    let drift = &bom.drift;
    if !drift.baseline {
        writeln!(w, "  {:<16} no previous reduced BOM", "drift:")?;
    } else if drift.is_empty() {
        writeln!(w, "  {:<16} none", "drift:")?;
    } else {
        writeln!(w, "  {:<16}", "drift:")?;
        for entry in &drift.added {
            let line = format!("+ {} {}", entry.artifact, entry.after.as_deref().unwrap_or(""));
            writeln!(w, "    {}", line.green())?;
        }
        for entry in &drift.removed {
            let line = format!("- {} {}", entry.artifact, entry.before.as_deref().unwrap_or(""));
            writeln!(w, "    {}", line.red())?;
        }
        for entry in &drift.changed {
            let line = format!(
                "~ {} {} -> {}",
                entry.artifact,
                entry.before.as_deref().unwrap_or(""),
                entry.after.as_deref().unwrap_or("")
            );
            writeln!(w, "    {}", line.yellow())?;
        }
    }

    if !bom.banned.is_empty() {
        writeln!(w, "  {:<16}", "banned:")?;
        for path in &bom.banned {
            writeln!(w, "    {}", path.red())?;
        }
    }
    if bom.exclusions_added > 0 {
        writeln!(w, "  {:<16} {}", "exclusions added:", bom.exclusions_added)?;
    }
    for violation in &bom.violations {
        writeln!(w, "  {} {}", "warning:".yellow().bold(), violation.check)?;
        for line in violation.message.lines() {
            writeln!(w, "    {line}")?;
        }
    }
    Ok(())
}
