//! Command implementations for the docindex binary.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use docindex_ingest::{AddDocumentCtx, AddOptions, ExecutionScope, IngestPipeline};
use docindex_types::{Document, ErrorCode, IndexSchema, Settings};

use crate::cli::IngestArgs;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Load settings and apply CLI overrides.
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    db_path_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    if let Some(db_path) = db_path_override {
        settings.db_path = db_path.to_string();
    }
    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Outcome line printed for each input document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub line: usize,
    pub key: Option<String>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DocumentReport {
    fn failed(line: usize, key: Option<String>, code: &str, detail: impl Into<String>) -> Self {
        Self {
            line,
            key,
            ok: false,
            code: Some(code.to_string()),
            detail: Some(detail.into()),
        }
    }
}

/// Totals printed after ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSummary {
    pub submitted: usize,
    pub indexed: usize,
    pub failed: usize,
    pub num_docs: usize,
    pub num_terms: usize,
    pub max_doc_id: u64,
}

/// `docindex ingest`
pub fn run_ingest(config_path: Option<&str>, log_level: Option<&str>, args: &IngestArgs) -> Result<()> {
    let settings = load_settings(config_path, log_level, args.db_path.as_deref())?;
    init_logging(&settings.log_level)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = ingest_file(
        &settings,
        Path::new(&args.schema),
        Path::new(&args.input),
        args.options(),
        &mut out,
    )?;
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    Ok(())
}

/// Ingest every line of `input` and write one report per line to `out`.
pub fn ingest_file<W: Write>(
    settings: &Settings,
    schema_path: &Path,
    input: &Path,
    options: AddOptions,
    out: &mut W,
) -> Result<IngestSummary> {
    let schema_json = fs::read_to_string(schema_path)
        .with_context(|| format!("Failed to read schema {}", schema_path.display()))?;
    let schema = IndexSchema::from_json(&schema_json).context("Invalid schema")?;

    let db_path = settings.expanded_db_path();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let pipeline = IngestPipeline::open(settings, schema).context("Failed to open pipeline")?;

    let file = fs::File::open(input)
        .with_context(|| format!("Failed to open input {}", input.display()))?;

    info!(input = %input.display(), ?options, "Ingesting documents");
    let mut summary = IngestSummary::default();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        summary.submitted += 1;

        let report = ingest_line(&pipeline, i + 1, &line, options);
        if report.ok {
            summary.indexed += 1;
        } else {
            summary.failed += 1;
        }
        writeln!(out, "{}", serde_json::to_string(&report)?)?;
    }

    let stats = pipeline.stats()?;
    summary.num_docs = stats.num_docs;
    summary.num_terms = stats.num_terms;
    summary.max_doc_id = stats.max_doc_id;
    info!(
        submitted = summary.submitted,
        indexed = summary.indexed,
        failed = summary.failed,
        "Ingestion finished"
    );
    Ok(summary)
}

fn ingest_line(pipeline: &IngestPipeline, line: usize, json: &str, options: AddOptions) -> DocumentReport {
    let doc: Document = match serde_json::from_str(json) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(line, error = %e, "Skipping malformed document");
            return DocumentReport::failed(line, None, "invalid json", e.to_string());
        }
    };
    let key = doc.key.clone();

    let (tx, rx) = mpsc::channel();
    let done = Box::new(move |ctx: &AddDocumentCtx, _scope: ExecutionScope| {
        let error = ctx.status().error().cloned();
        let _ = tx.send(error);
    });

    match pipeline.add_document(doc, options, done) {
        Ok(submission) => submission.wait(),
        Err(e) => {
            let code = e.ingest_error().map_or("rejected", |err| err.code.as_str());
            return DocumentReport::failed(line, Some(key), code, e.to_string());
        }
    }

    match rx.recv() {
        Ok(None) => DocumentReport {
            line,
            key: Some(key),
            ok: true,
            code: None,
            detail: None,
        },
        Ok(Some(err)) => DocumentReport::failed(
            line,
            Some(key),
            err.code.as_str(),
            err.detail.unwrap_or_default(),
        ),
        Err(_) => DocumentReport::failed(line, Some(key), ErrorCode::IndexGeneric.as_str(), "Document was not completed"),
    }
}

/// `docindex config`
pub fn show_config(config_path: Option<&str>, log_level: Option<&str>) -> Result<()> {
    let settings = load_settings(config_path, log_level, None)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
