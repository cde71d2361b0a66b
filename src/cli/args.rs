//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// brisk asset pipeline CLI
///
/// Without a subcommand, runs every stage once, then serves and watches.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: brisk.toml)
    #[arg(short = 'C', long, global = true, default_value = "brisk.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Scaffold config, directory layout and the page script
    #[command(visible_alias = "i")]
    Init {
        /// Project directory name/path (relative to current directory)
        #[arg(value_hint = clap::ValueHint::DirPath)]
        name: Option<PathBuf>,
    },

    /// Run every stage once and exit
    #[command(visible_alias = "b")]
    Build,

    /// Run every stage once, then serve with live reload and watch (default)
    #[command(visible_alias = "d")]
    Dev {
        #[command(flatten)]
        args: DevArgs,
    },

    /// Compile the Sass entry stylesheet
    Styles,

    /// Concatenate the custom scripts
    Scripts,

    /// Optimize raw images
    Images,
}

/// Dev server arguments.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DevArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<std::net::IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Upstream development server to proxy (e.g. localhost:8080/site)
    #[arg(long, value_hint = clap::ValueHint::Url)]
    pub proxy: Option<String>,

    /// Do not open a browser tab on startup
    #[arg(long)]
    pub no_open: bool,
}

impl Cli {
    /// Command to run; a bare invocation means `dev`.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Dev {
            args: DevArgs::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_defaults_to_dev() {
        let cli = Cli::parse_from(["brisk"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.command(), Commands::Dev { .. }));
        assert_eq!(cli.config, PathBuf::from("brisk.toml"));
    }

    #[test]
    fn test_dev_args() {
        let cli = Cli::parse_from(["brisk", "dev", "--port", "4000", "--no-open", "--proxy", "localhost:8080/evos"]);
        let Commands::Dev { args } = cli.command() else {
            panic!("expected dev command");
        };
        assert_eq!(args.port, Some(4000));
        assert!(args.no_open);
        assert_eq!(args.proxy.as_deref(), Some("localhost:8080/evos"));
    }

    #[test]
    fn test_stage_commands() {
        assert!(matches!(Cli::parse_from(["brisk", "styles"]).command(), Commands::Styles));
        assert!(matches!(Cli::parse_from(["brisk", "scripts"]).command(), Commands::Scripts));
        assert!(matches!(Cli::parse_from(["brisk", "images"]).command(), Commands::Images));
        assert!(matches!(Cli::parse_from(["brisk", "b"]).command(), Commands::Build));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["brisk", "build", "-C", "theme/brisk.toml", "-V"]);
        assert_eq!(cli.config, PathBuf::from("theme/brisk.toml"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_init_name() {
        let Commands::Init { name } = Cli::parse_from(["brisk", "init", "theme"]).command() else {
            panic!("expected init command");
        };
        assert_eq!(name, Some(PathBuf::from("theme")));
    }
}
