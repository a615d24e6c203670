// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: run attribute mappings against a document snapshot
//!
//! Usage:
//!   zonemap <document.json> --configs <configs.json> [options]

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;
use zonemap_processing::{ConfigStore, ElementId, EngineSettings, InMemoryDocument, Orchestrator, ProgressUpdate};

struct Args {
    document: PathBuf,
    configs: PathBuf,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    only: Vec<ElementId>,
    verbose: bool,
    log_json: bool,
}

fn main() -> Result<()> {
    let raw: Vec<String> = env::args().collect();
    if raw.len() < 2 || raw[1] == "--help" || raw[1] == "-h" {
        print_usage();
        return Ok(());
    }
    let args = parse_args(&raw)?;

    let default_filter = if args.verbose {
        "info,zonemap_processing=debug"
    } else {
        "warn,zonemap_processing=info"
    };
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into());
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let settings = EngineSettings::from_env();
    tracing::info!(
        cell_size = settings.cell_size,
        probe_epsilon = settings.probe_epsilon,
        worker_threads = settings.worker_threads,
        "Starting ZoneMap"
    );

    let store = ConfigStore::load(&args.configs)
        .with_context(|| format!("Failed to load configurations from {}", args.configs.display()))?;
    if store.is_empty() {
        bail!("No configurations in {}", args.configs.display());
    }
    let mut document = InMemoryDocument::load(&args.document)
        .with_context(|| format!("Failed to load document {}", args.document.display()))?;

    let orchestrator = Orchestrator::new(settings).with_progress(|update: &ProgressUpdate<'_>| {
        tracing::debug!(
            config = update.configuration,
            step = update.index + 1,
            of = update.count,
            percent = update.percent(),
            "Progress"
        );
    });

    let report = if args.only.is_empty() {
        orchestrator.run(store.configurations(), &mut document)
    } else {
        orchestrator.run_scoped(store.configurations(), &mut document, &args.only)
    };
    println!("{}", report);

    if let Some(path) = &args.output {
        document
            .save(path)
            .with_context(|| format!("Failed to write document to {}", path.display()))?;
        eprintln!("Document written to {}", path.display());
    }
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
        eprintln!("Report written to {}", path.display());
    }
    Ok(())
}

fn parse_args(raw: &[String]) -> Result<Args> {
    let mut args = Args {
        document: PathBuf::from(&raw[1]),
        configs: PathBuf::new(),
        output: None,
        report: None,
        only: Vec::new(),
        verbose: false,
        log_json: false,
    };
    let mut configs = None;

    let mut i = 2;
    while i < raw.len() {
        match raw[i].as_str() {
            "--configs" => {
                i += 1;
                configs = Some(PathBuf::from(value(raw, i, "--configs")?));
            }
            "--output" => {
                i += 1;
                args.output = Some(PathBuf::from(value(raw, i, "--output")?));
            }
            "--report" => {
                i += 1;
                args.report = Some(PathBuf::from(value(raw, i, "--report")?));
            }
            "--only" => {
                i += 1;
                for id in value(raw, i, "--only")?.split(',').filter(|s| !s.is_empty()) {
                    let id: i64 = id.trim().parse().with_context(|| format!("Invalid element id '{}'", id))?;
                    args.only.push(ElementId(id));
                }
            }
            "--verbose" | "-v" => {
                args.verbose = true;
            }
            "--log-json" => {
                args.log_json = true;
            }
            other => {
                print_usage();
                bail!("Unknown option: {}", other);
            }
        }
        i += 1;
    }

    args.configs = configs.context("--configs is required")?;
    Ok(args)
}

fn value<'a>(raw: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    raw.get(i)
        .map(String::as_str)
        .with_context(|| format!("{} expects a value", flag))
}

fn print_usage() {
    eprintln!("ZoneMap - copy zone attributes onto the elements they contain");
    eprintln!();
    eprintln!("Usage: zonemap <document.json> --configs <configs.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --configs <path>   Mapping configurations (JSON)");
    eprintln!("  --output <path>    Write the updated document snapshot");
    eprintln!("  --report <path>    Write the run report as JSON");
    eprintln!("  --only <ids>       Comma-separated element ids to restrict targets to");
    eprintln!("  --verbose, -v      Debug logging (RUST_LOG overrides)");
    eprintln!("  --log-json         Emit logs as JSON lines");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ZONEMAP_CELL_SIZE, ZONEMAP_PROBE_EPSILON, ZONEMAP_DEFAULT_HEIGHT,");
    eprintln!("  ZONEMAP_CURVE_OFFSET, ZONEMAP_BOUNDARY_TOLERANCE, ZONEMAP_PROGRESS_STEPS,");
    eprintln!("  ZONEMAP_WORKER_THREADS");
}
