//! tablefsm - Command-line tools for table-driven state machines
//!
//! Checks, normalizes, converts, merges and drives transition documents.

mod commands;
mod config;
mod engine;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::{Config, EngineKind, OutputFormat};
use std::path::PathBuf;
use tablefsm_document::ParseMode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tablefsm")]
#[command(about = "Tools for table-driven state machine documents")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "TABLEFSM_CONFIG")]
    config: Option<PathBuf>,

    /// Accept legacy documents and skip unknown tags
    #[arg(long)]
    lenient: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a document and load it into both engines
    Check {
        /// Document file (.json, .yaml or .yml)
        file: PathBuf,
    },

    /// Print a document in canonical form
    Normalize {
        /// Document file
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a document between JSON and YAML
    Convert {
        /// Document file
        file: PathBuf,

        /// Target format
        #[arg(long, value_enum)]
        to: OutputFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Send messages through a machine and print each state change
    Run {
        /// Document file
        file: PathBuf,

        /// Engine to drive (defaults to the configured engine)
        #[arg(short, long, value_enum)]
        engine: Option<EngineKind>,

        /// Message names, in order
        messages: Vec<String>,
    },

    /// Compose fragments into a base machine
    Merge {
        /// Base document
        base: PathBuf,

        /// Fragment documents, merged in order
        #[arg(required = true)]
        fragments: Vec<PathBuf>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start an interactive session on a machine
    Repl {
        /// Document file
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };
    if cli.lenient {
        config.parser.mode = ParseMode::Lenient;
    }
    tracing::debug!("Using configuration {:?}", config);

    match cli.command {
        Commands::Repl { file } => {
            repl::run(&file, &config)?;
        }
        cmd => match commands::execute(&config, cmd) {
            Ok(output) => {
                println!("{}", output);
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
