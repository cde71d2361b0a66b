//! brisk - front-end asset pipeline for themes.
//!
//! Compiles Sass, concatenates scripts, optimizes images, and serves the
//! project with live reload while watching for changes.

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod freshness;
mod logger;
mod pipeline;
mod reload;
mod report;
mod source;
mod utils;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{ConfigHandle, ProjectConfig};
use pipeline::{Stage, StageSet};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match cli.command() {
        Commands::Init { name } => init(&cli, name),
        Commands::Build => run_once(&cli, StageSet::all()),
        Commands::Styles => run_once(&cli, StageSet::only(Stage::Styles)),
        Commands::Scripts => run_once(&cli, StageSet::only(Stage::Scripts)),
        Commands::Images => run_once(&cli, StageSet::only(Stage::Images)),
        Commands::Dev { .. } => dev(ProjectConfig::load(&cli)?),
    }
}

/// Scaffold into `name` (relative to cwd) or the current directory.
fn init(cli: &Cli, name: Option<PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current working directory")?;
    let root = name.map_or_else(|| cwd.clone(), |name| cwd.join(name));
    cli::init::new_project(&root, &cli.config)
}

/// Run stages once; any failure exits non-zero.
fn run_once(cli: &Cli, stages: StageSet) -> Result<()> {
    let config = ProjectConfig::load(cli)?;
    cli::build::run_once(stages, &config)
}

/// Serve, watch and rebuild until Ctrl+C.
fn dev(config: ProjectConfig) -> Result<()> {
    let handle = ConfigHandle::new(config);
    let server = cli::serve::bind_server(&handle)?;
    server.run(handle)
}
