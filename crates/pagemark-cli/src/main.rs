// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagemark: stamps the markers of a JSON manifest onto a PDF, appends the
// marker index and saves the result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use pagemark_core::{LayoutConfig, MarkerSet, RunReport};
use pagemark_document::{MarkerEngine, PdfDocument, RecordingSink};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pagemark")]
#[command(author, version, about = "Place link markers on PDF pages and append a marker index", long_about = None)]
struct Args {
    /// PDF to mark
    input: PathBuf,

    /// JSON array of markers: {"page", "link", "artifact", "label"?}
    markers: PathBuf,

    /// Output PDF (default: <input>-marked.pdf next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON layout configuration; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lay the markers out without writing a PDF
    #[arg(long)]
    dry_run: bool,

    /// Write the run report as JSON
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Rewrite artifact paths under this directory...
    #[arg(long, requires = "relocate_to")]
    relocate_from: Option<PathBuf>,

    /// ...to the same relative paths under this one
    #[arg(long, requires = "relocate_from")]
    relocate_to: Option<PathBuf>,

    /// Use debug logging level
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let report = run(&args)?;
    println!("{}", report.summary());

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("failed to serialise run report")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!(path = %path.display(), "Run report written");
    }
    Ok(())
}

fn run(args: &Args) -> Result<RunReport> {
    let config = match &args.config {
        Some(path) => LayoutConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LayoutConfig::default(),
    };
    let mut engine = MarkerEngine::new(config).context("invalid layout configuration")?;

    let manifest = fs::read(&args.markers)
        .with_context(|| format!("failed to read markers {}", args.markers.display()))?;
    let mut markers = MarkerSet::from_json(&manifest)
        .with_context(|| format!("invalid marker manifest {}", args.markers.display()))?;
    if let (Some(from), Some(to)) = (&args.relocate_from, &args.relocate_to) {
        let moved = markers.relocate_artifacts(from, to);
        info!(moved, from = %from.display(), to = %to.display(), "Artifact references relocated");
    }

    let mut document = PdfDocument::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;

    if args.dry_run {
        let geometries = document.page_geometries();
        document.close();
        let mut preview = RecordingSink::new(geometries?).verifying_artifacts();
        let report = engine.run(&mut preview, &markers)?;
        info!(pages = report.final_pages(), "Dry run finished, nothing written");
        return Ok(report);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input));
    let outcome = engine
        .run(&mut document, &markers)
        .and_then(|report| document.save(&output).map(|written| (report, written)));
    document.close();

    let (report, written) = outcome.context("placement run failed")?;
    for skip in &report.skipped {
        warn!(page = skip.page, link = %skip.link, reason = %skip.reason, "Marker not drawn");
    }
    info!(path = %written.display(), "Marked document written");
    Ok(report)
}

/// `<dir>/<stem>-marked.pdf` beside the input.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{stem}-marked.pdf"))
}
