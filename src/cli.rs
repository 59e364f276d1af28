//! The command line interface for the analysis engine.
use crate::analysis::perform_full_analysis;
use crate::config::AnalysisConfig;
use crate::input::load_analysis;
use crate::output::{create_output_directory, get_output_dir, write_analysis_report};
use crate::settings::Settings;
use ::log::info;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the bundled demo analyses
pub const DEMOS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// The command line interface for the analysis engine
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The available commands
    #[command(subcommand)]
    pub command: Commands,
}

/// The available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a full analysis over an analysis directory
    Run {
        /// Path to the analysis directory
        #[arg(help = "Path to the analysis directory")]
        analysis_dir: PathBuf,
    },
    /// Manage bundled demo analyses
    Demo {
        /// The available subcommands for managing demo analyses
        #[command(subcommand)]
        subcommand: DemoSubcommands,
    },
    /// Generate configuration templates
    Config {
        /// The available subcommands for configuration
        #[command(subcommand)]
        subcommand: ConfigSubcommands,
    },
}

/// The available subcommands for managing demo analyses
#[derive(Subcommand)]
pub enum DemoSubcommands {
    /// List available demos
    List,
    /// Run a demo analysis
    Run {
        /// The name of the demo to run
        name: String,
    },
}

/// The available subcommands for configuration
#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Print a fully commented default analysis.toml
    Generate,
}

/// Handle the `run` command
pub fn handle_run_command(analysis_dir: &Path) -> Result<()> {
    let settings = Settings::from_path(analysis_dir)?;
    let output_dir = get_output_dir(analysis_dir)?;
    create_output_directory(&output_dir, settings.overwrite)?;
    crate::log::init(settings.log_level.as_deref(), Some(&output_dir))
        .context("Failed to initialise logging.")?;

    let (customers, service_points, analysis_file) =
        load_analysis(analysis_dir).context("Failed to load analysis inputs.")?;
    info!(
        "Loaded {} customer and {} service point records",
        customers.len(),
        service_points.len()
    );

    let report = perform_full_analysis(
        &customers,
        &service_points,
        &analysis_file.options,
        &analysis_file.config,
        &crate::analysis::Cancellation::new(),
    )?;
    info!(
        "Analysis complete: {} clusters, {:.1}% coverage, {} suggestions",
        report.effective_cluster_count,
        report.coverage.coverage_percentage,
        report.suggestions.len()
    );

    write_analysis_report(&output_dir, &report)?;
    info!("Results written to {}", output_dir.display());

    Ok(())
}

/// Handle the `demo run` command.
///
/// Extracts the bundled demo to a temporary directory and runs it like any other
/// analysis directory.
pub fn handle_demo_run_command(name: &str) -> Result<()> {
    let demo_dir = DEMOS_DIR
        .get_dir(name)
        .with_context(|| format!("No demo named {name}."))?;

    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    for entry in demo_dir.entries() {
        match entry {
            DirEntry::File(file) => {
                let file_name = file.path().file_name().unwrap();
                fs::write(temp_dir.path().join(file_name), file.contents())?;
            }
            DirEntry::Dir(_) => bail!("Nested directories are not supported in demos."),
        }
    }

    handle_run_command(temp_dir.path())
}

/// Handle the `demo list` command
pub fn handle_demo_list_command() -> Result<()> {
    for entry in DEMOS_DIR.dirs() {
        println!("{}", entry.path().display());
    }
    Ok(())
}

/// Handle the `config generate` command
pub fn handle_config_generate_command() -> Result<()> {
    println!("{}", AnalysisConfig::default_file_contents());
    Ok(())
}
