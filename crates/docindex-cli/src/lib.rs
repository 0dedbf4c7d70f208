//! docindex command-line library.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (ingest, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, IngestArgs};
pub use commands::{
    ingest_file, init_logging, load_settings, run_ingest, show_config, DocumentReport,
    IngestSummary,
};
