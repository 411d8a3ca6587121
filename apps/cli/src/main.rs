// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! puzzlecut - cut a closed solid into interlocking printable pieces.
//!
//! Loads an STL, repairs it, splits its bounding box into a grid and writes
//! one STL per non-empty cell, with keys and sockets on the shared faces.
//! The output directory also receives the repaired input, preview images
//! and a `report.json` describing every cell.

mod config;
mod error;

use anyhow::Context;
use clap::Parser;
use config::{parse_log_level, CliArgs, Config, LogFormat};
use puzzlecut_geometry::CsgKernel;
use puzzlecut_processing::{DecompositionPipeline, ProgressUpdate, PuzzleReport};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const REPORT_FILE: &str = "report.json";

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let level = parse_log_level(&args.log_level)?;
    init_logging(level, args.log_format);

    let config = Config::from_args(&args)?;
    let params = &config.params;
    tracing::info!(
        input = %params.input.display(),
        output_dir = %params.output_dir.display(),
        divisions = ?params.divisions,
        locks_per_face = params.locks_per_face,
        seed = params.seed,
        style = %params.style,
        mating = %params.mating,
        parallel = config.options.parallel,
        worker_threads = ?config.options.worker_threads,
        "Starting puzzlecut"
    );

    let observer = |update: ProgressUpdate| {
        if let Some(event) = &update.piece_event {
            tracing::debug!(percent = ?update.percent, "{}", event);
        }
    };

    let pipeline = DecompositionPipeline::new(CsgKernel::new(), config.options.clone());
    let report = pipeline
        .run(params, Some(&observer))
        .with_context(|| format!("Failed to decompose {}", params.input.display()))?;

    let report_path = params.output_dir.join(REPORT_FILE);
    write_report(&report, &report_path)?;
    print_summary(&report, &report_path);
    Ok(())
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,puzzlecut={level},puzzlecut_processing={level},puzzlecut_geometry={level}"
        ))
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn write_report(report: &PuzzleReport, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Cannot write {}", path.display()))?;
    Ok(())
}

fn print_summary(report: &PuzzleReport, report_path: &Path) {
    let info = &report.mesh_info;
    println!(
        "Pieces: {} of {} ({})",
        info.piece_count, info.total_possible_pieces, info.success_rate_percent
    );
    println!(
        "Empty cells: {}, failed cells: {}",
        report.empty_count, report.failed_count
    );
    println!(
        "Interlocks: {} applied, {} failed",
        report.interlocks_attempted - report.interlocks_failed,
        report.interlocks_failed
    );
    println!(
        "Input: {} ({})",
        report.repaired_mesh.display(),
        if info.watertight { "watertight" } else { "not watertight" }
    );
    if let Some(error) = &report.repair.hole_fill_error {
        println!("Hole filling failed: {}", error);
    }
    for failure in report.failures() {
        println!(
            "  cell {}: {}",
            failure.cell,
            failure.reason.as_deref().unwrap_or("unknown error")
        );
    }
    match &report.render_error {
        Some(error) => println!("Previews: failed ({})", error),
        None => println!("Previews: {}", report.previews.len()),
    }
    println!("Report: {}", report_path.display());
}
