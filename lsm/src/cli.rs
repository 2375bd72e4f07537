//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Layoutsmith - wrap content files in Handlebars layouts
#[derive(Debug, Parser)]
#[command(
    name = "lsm",
    about = "Wrap content files in named Handlebars layouts",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read the source tree, apply layouts, write the destination
    Build {
        /// Source directory (overrides config)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Destination directory (overrides config)
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// Layout directory (overrides config)
        #[arg(long)]
        layouts: Option<PathBuf>,

        /// Remove the destination before writing
        #[arg(long)]
        clean: bool,
    },

    /// List the layouts that would be loaded
    Layouts {
        /// Layout directory (overrides config)
        #[arg(long)]
        layouts: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_build_defaults() {
        let cli = Cli::parse_from(["lsm", "build"]);
        if let Command::Build {
            source,
            destination,
            layouts,
            clean,
        } = cli.command
        {
            assert!(source.is_none());
            assert!(destination.is_none());
            assert!(layouts.is_none());
            assert!(!clean);
        } else {
            panic!("Expected Build command");
        }
    }

    #[test]
    fn test_cli_parse_build_overrides() {
        let cli = Cli::parse_from(["lsm", "build", "-s", "content", "-d", "out", "--clean"]);
        if let Command::Build {
            source,
            destination,
            clean,
            ..
        } = cli.command
        {
            assert_eq!(source, Some(PathBuf::from("content")));
            assert_eq!(destination, Some(PathBuf::from("out")));
            assert!(clean);
        } else {
            panic!("Expected Build command");
        }
    }

    #[test]
    fn test_cli_parse_layouts() {
        let cli = Cli::parse_from(["lsm", "layouts", "--layouts", "tpl"]);
        assert!(matches!(cli.command, Command::Layouts { layouts: Some(_) }));
    }

    #[test]
    fn test_cli_with_config_and_level() {
        let cli = Cli::parse_from(["lsm", "-c", "/path/to/site.yml", "build", "-l", "debug"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/site.yml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
