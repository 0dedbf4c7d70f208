//! docindex
//!
//! Ingests JSON-lines documents into a search index.
//!
//! # Usage
//!
//! ```bash
//! docindex ingest --schema schema.json --input docs.jsonl [--db-path PATH] [--replace]
//! docindex config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/docindex/config.toml)
//! 3. Environment variables (DOCINDEX_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use docindex_cli::{run_ingest, show_config, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Ingest(args) => {
            run_ingest(cli.config.as_deref(), cli.log_level.as_deref(), args)?;
        }
        Commands::Config => {
            show_config(cli.config.as_deref(), cli.log_level.as_deref())?;
        }
    }

    Ok(())
}
