//! # biocascade CLI Module
//!
//! This module implements the CLI interface for biocascade.
//!
//! ## Available Commands
//!
//! - `analyze` - Analyze a biomarker panel from a JSON file
//! - `rules` - List derivable targets and candidate methods
//! - `states` - List physiological state definitions
//! - `check` - Validate the data pack and report registry sizes
//! - `server` - Start the HTTP server

mod commands;

use crate::config;
use biocascade_core::CascadeError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// biocascade - Biomarker Cascade Engine
///
/// Derives every biomarker reachable from a partial panel, scores each
/// derivation, checks the panel for consistency and classifies latent
/// physiological states.
#[derive(Parser, Debug)]
#[command(name = "biocascade")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML data pack (overrides BIOCASCADE_CONFIG)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Analyze a biomarker panel
    Analyze {
        /// Path to a JSON object mapping biomarker names to values
        #[arg(short, long)]
        file: PathBuf,

        /// Number of findings and suggestions to report
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// List derivable targets
    Rules,

    /// List physiological state definitions
    States,

    /// Validate the data pack
    Check,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CascadeError> {
    let json_mode = cli.json_mode;
    let pack_path = config::resolve_pack_path(cli.config.as_deref());
    let engine = config::build_engine(pack_path.as_deref())?;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(engine, &host, port).await,
        Some(Commands::Analyze { file, top_n }) => {
            cmd_analyze(&engine, json_mode, cli.verbose, &file, top_n)
        }
        Some(Commands::Rules) => cmd_rules(&engine, json_mode),
        Some(Commands::States) => cmd_states(&engine, json_mode),
        Some(Commands::Check) => cmd_check(&engine, pack_path.as_deref(), json_mode),
        None => {
            // No subcommand - report what is loaded
            cmd_check(&engine, pack_path.as_deref(), json_mode)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "biocascade",
            "--json-mode",
            "analyze",
            "-f",
            "panel.json",
            "-n",
            "3",
        ])
        .expect("parse");
        assert!(cli.json_mode);
        match cli.command {
            Some(Commands::Analyze { file, top_n }) => {
                assert_eq!(file, PathBuf::from("panel.json"));
                assert_eq!(top_n, Some(3));
            }
            other => unreachable!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_server_defaults() {
        let cli = Cli::try_parse_from(["biocascade", "server"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Server { ref host, port: 8080 }) if host == "127.0.0.1"
        ));
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["biocascade", "check", "--config", "pack.toml", "-q"])
            .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("pack.toml")));
        assert!(cli.quiet);
    }

    #[test]
    fn test_analyze_requires_file() {
        assert!(Cli::try_parse_from(["biocascade", "analyze"]).is_err());
    }
}
