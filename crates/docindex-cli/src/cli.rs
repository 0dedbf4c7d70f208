//! CLI argument parsing for the docindex binary.
//!
//! CLI flags override every other configuration source.

use clap::{Args, Parser, Subcommand};

use docindex_ingest::AddOptions;

/// Document ingestion for docindex
#[derive(Parser, Debug)]
#[command(name = "docindex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/docindex/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest JSON-lines documents into an index
    Ingest(IngestArgs),

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// JSON schema definition of the index
    #[arg(long)]
    pub schema: String,

    /// File with one JSON document per line
    #[arg(short, long)]
    pub input: String,

    /// Override document store path
    #[arg(long)]
    pub db_path: Option<String>,

    /// Treat every document as a partial update
    #[arg(long)]
    pub partial: bool,

    /// Replace documents whose key is already indexed
    #[arg(long)]
    pub replace: bool,

    /// Do not write fields to the document store
    #[arg(long)]
    pub no_save: bool,

    /// Index every document on the calling thread
    #[arg(long)]
    pub no_block: bool,
}

impl IngestArgs {
    pub fn options(&self) -> AddOptions {
        AddOptions {
            partial: self.partial,
            replace: self.replace,
            no_save: self.no_save,
            no_block: self.no_block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_ingest() {
        let cli = Cli::parse_from([
            "docindex",
            "ingest",
            "--schema",
            "schema.json",
            "--input",
            "docs.jsonl",
        ]);
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.schema, "schema.json");
                assert_eq!(args.input, "docs.jsonl");
                assert_eq!(args.db_path, None);
                assert_eq!(args.options(), AddOptions::default());
            }
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_cli_ingest_flags() {
        let cli = Cli::parse_from([
            "docindex",
            "ingest",
            "--schema",
            "s.json",
            "-i",
            "d.jsonl",
            "--db-path",
            "/tmp/db",
            "--partial",
            "--no-save",
            "--no-block",
        ]);
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.db_path, Some("/tmp/db".to_string()));
                let options = args.options();
                assert!(options.partial && options.no_save && options.no_block);
                assert!(!options.replace);
                assert!(options.is_replace());
            }
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["docindex", "config", "--config", "/etc/docindex.toml", "-l", "debug"]);
        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(cli.config, Some("/etc/docindex.toml".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_ingest_requires_schema() {
        assert!(Cli::try_parse_from(["docindex", "ingest", "--input", "d.jsonl"]).is_err());
    }
}
