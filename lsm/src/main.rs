//! Layoutsmith - wrap content files in named Handlebars layouts
//!
//! CLI entry point: reads a source tree, applies layouts, writes the result.

use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use layoutsmith::cli::{Cli, Command};
use layoutsmith::config::SiteConfig;
use layoutsmith::{ApplyOutcome, HandlebarsLayouts, PluginOptions, read_source, write_destination};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = SiteConfig::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = SiteConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Build {
            source,
            destination,
            layouts,
            clean,
        } => cmd_build(config, source, destination, layouts, clean),
        Command::Layouts { layouts } => cmd_layouts(config, layouts),
    }
}

fn plugin_options(config: &SiteConfig, layouts: Option<PathBuf>) -> PluginOptions {
    let options = config.plugin.clone();
    match layouts {
        Some(dir) => options.with_layouts(dir),
        None => options,
    }
}

fn cmd_build(
    config: SiteConfig,
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    layouts: Option<PathBuf>,
    clean: bool,
) -> Result<()> {
    let source = source.unwrap_or_else(|| config.source.clone());
    let destination = destination.unwrap_or_else(|| config.destination.clone());
    let clean = clean || config.clean;
    debug!(?source, ?destination, clean, "cmd_build: called");

    let plugin = HandlebarsLayouts::new(Some(plugin_options(&config, layouts)))?;
    let mut files = read_source(&source, config.front_matter)?;
    let report = plugin.run(&mut files)?;
    write_destination(&destination, &files, clean)?;

    for failure in &report.registration_failures {
        println!("{} {}", "!".yellow(), failure);
    }
    for (filename, outcome) in &report.outcomes {
        match outcome {
            ApplyOutcome::Rendered { .. } => println!("{} {} ({})", "✓".green(), filename, outcome),
            ApplyOutcome::RenderFailed { .. } => println!("{} {} ({})", "✗".red(), filename, outcome),
            ApplyOutcome::LayoutUnknown { .. } => println!("{} {} ({})", "?".yellow(), filename, outcome),
            ApplyOutcome::NotRequested => println!("{} {} ({})", "-".dimmed(), filename, outcome),
        }
    }

    println!(
        "{} {} rendered, {} without layout, {} missing layout, {} failed -> {}",
        "✓".green(),
        report.rendered(),
        report.skipped(),
        report.missing(),
        report.failed(),
        destination.display().to_string().cyan()
    );
    Ok(())
}

fn cmd_layouts(config: SiteConfig, layouts: Option<PathBuf>) -> Result<()> {
    debug!("cmd_layouts: called");
    let plugin = HandlebarsLayouts::new(Some(plugin_options(&config, layouts)))?;
    let session = plugin.before()?;

    for failure in session.registration_failures() {
        println!("{} {}", "!".yellow(), failure);
    }

    let names: Vec<&str> = session.layouts().collect();
    if names.is_empty() {
        println!("No layouts found in {}", plugin.config().layouts.display());
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}
