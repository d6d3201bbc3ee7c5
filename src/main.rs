// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use the_rowcheck::config::{load_and_validate_config, load_dataset};
use the_rowcheck::dataset::{Dataset, Note};
use the_rowcheck::engine::{Platform, ProgressHandle};
use the_rowcheck::jobs::{self, JobSettings, PromoEntry};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <config.yaml> <dataset.json>", args[0]);
        eprintln!("Example: {} demos/promo-checks.yaml demos/promos.json", args[0]);
        std::process::exit(1);
    }
    let (config_path, dataset_path) = (&args[1], Path::new(&args[2]));
    let started = Instant::now();

    let config = load_and_validate_config(config_path)
        .with_context(|| format!("loading {config_path}"))?;
    let settings = JobSettings::from_options(&config.options)?;
    let rows: Vec<PromoEntry> = load_dataset(dataset_path)
        .with_context(|| format!("loading {}", dataset_path.display()))?;
    info!(rows = rows.len(), jobs = config.jobs.len(), "inputs loaded");

    let platform = Arc::new(Platform::new(
        jobs::registry(&settings)?,
        config.executor_options.clone(),
    ));
    let pipeline = platform.new_pipeline(&config.jobs)?;
    let reporter = tokio::spawn(report_progress(pipeline.progress()));

    let interrupt = {
        let platform = platform.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling run");
                platform.shutdown();
            }
        })
    };

    let dataset = Arc::new(Dataset::new(rows));
    let outcome = platform.start_pipeline(pipeline, dataset.clone()).await;
    reporter.abort();
    interrupt.abort();

    let notes = dataset.annotations().notes();
    print_notes(&notes);
    let notes_path = notes_path(dataset_path);
    write_notes(&notes_path, &notes)?;
    println!(
        "{} notes written to {} in {:.2?}",
        notes.len(),
        notes_path.display(),
        started.elapsed()
    );

    if let Err(error) = outcome {
        bail!("run aborted: {error}");
    }
    Ok(())
}

async fn report_progress(progress: ProgressHandle) {
    let mut ticks = tokio::time::interval(PROGRESS_INTERVAL);
    loop {
        ticks.tick().await;
        let snapshot = progress.snapshot();
        info!(percent = (snapshot.overall() * 100.0).round(), "progress");
    }
}

fn print_notes(notes: &[Note]) {
    for note in notes {
        let job = note.job.as_ref().map(|job| job.as_str()).unwrap_or("-");
        match &note.column {
            Some(column) => println!("row {:>5} [{job}] {column}: {}", note.row, note.message),
            None => println!("row {:>5} [{job}] {}", note.row, note.message),
        }
    }
}

/// `data/promos.json` -> `data/promos_notes.json`
fn notes_path(dataset: &Path) -> PathBuf {
    let stem = dataset
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    dataset.with_file_name(format!("{stem}_notes.json"))
}

fn write_notes(path: &Path, notes: &[Note]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), notes)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
