//! Command line surface of the `meow` binary

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::context::OutputOptions;

/// The paw-friendly Cheshire Cat AI Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "meow", version)]
#[command(
    about = "The paw-friendly Cheshire Cat AI Command Line Interface",
    long_about = "The paw-friendly Cheshire Cat AI Command Line Interface.\n\n\
The Cheshire Cat is an open-source, hackable and production-ready framework that \
allows developing intelligent personal AI assistant agents on top of Large Language Models (LLMs).\n\n\
More information at https://cheshirecat.ai and https://cheshire-cat-ai.github.io/docs."
)]
pub struct Args {
    /// Config file (default is $HOME/.meow-cli.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output - incompatible with --quiet
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only output errors - incompatible with --verbose
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSON formatted output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Install the container runtime the cat needs on this machine
    Install {
        /// Download the installer again even if it is already present
        #[arg(long)]
        reinstall: bool,

        /// Print the install steps without performing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage the Cheshire Cat container
    Cat {
        #[command(subcommand)]
        action: CatCmd,
    },
    /// Print the version number of meow
    Version,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatCmd {
    /// Pull the configured cat image
    Pull,
    /// Pull the image, start the container and wait until it stops
    Start,
    /// Stop the running container
    Stop,
    /// Force-remove the container (volumes are kept)
    Rm,
}

impl Args {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            verbose: self.verbose,
            quiet: self.quiet,
            json: self.json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeowError;

    #[test]
    fn install_flags() {
        let args = Args::try_parse_from(["meow", "install", "--reinstall", "--dry-run"]).unwrap();
        assert_eq!(
            args.command,
            Cmd::Install {
                reinstall: true,
                dry_run: true
            }
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["meow", "cat", "start", "--json", "--config", "/tmp/m.yaml"])
                .unwrap();
        assert_eq!(args.command, Cmd::Cat { action: CatCmd::Start });
        assert!(args.json);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/m.yaml")));
    }

    #[test]
    fn verbose_with_quiet_parses_but_fails_validation() {
        let args = Args::try_parse_from(["meow", "-v", "-q", "install"]).unwrap();
        let err = args.output().validate().unwrap_err();
        assert!(matches!(err, MeowError::Validation(_)));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Args::try_parse_from(["meow"]).is_err());
    }
}
