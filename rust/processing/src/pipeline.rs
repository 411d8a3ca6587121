// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decomposition pipeline with optional parallel cell assembly.

use crate::assembler::{CellAssembly, PieceAssembler, PieceResult};
use crate::error::{PipelineError, Result};
use crate::grid::{CellIndex, Grid};
use crate::interlock::InterlockBuilder;
use crate::params::{PipelineOptions, PuzzleParams};
use crate::progress::{assembly_percent, PipelineStage, ProgressObserver, ProgressReporter};
use crate::report::{MeshInfo, PieceOutcome, PieceStatus, PuzzleReport, RepairReport};
use crate::roles::FacePlan;
use puzzlecut_geometry::repair::repair_solid;
use puzzlecut_geometry::stl::{load_stl, save_stl};
use puzzlecut_geometry::{CsgKernel, Mesh, SnapshotRenderer, SolidKernel, DEFAULT_VIEWS};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// File name of the repaired input solid.
pub const REPAIRED_MESH_FILE: &str = "input_filled.stl";

/// Runs a full decomposition with a given boolean kernel.
pub struct DecompositionPipeline<K: SolidKernel = CsgKernel> {
    kernel: K,
    options: PipelineOptions,
}

impl Default for DecompositionPipeline<CsgKernel> {
    fn default() -> Self {
        Self::new(CsgKernel::new(), PipelineOptions::default())
    }
}

impl<K: SolidKernel> DecompositionPipeline<K> {
    pub fn new(kernel: K, options: PipelineOptions) -> Self {
        Self { kernel, options }
    }

    /// Load, decompose, export and render.
    ///
    /// Returns `Err` only when the run could not start or the input could not
    /// be loaded; per-piece and per-interlock problems end up in the report.
    pub fn run(
        &self,
        params: &PuzzleParams,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<PuzzleReport> {
        let total_start = Instant::now();
        params.validate()?;
        std::fs::create_dir_all(&params.output_dir).map_err(|source| PipelineError::OutputDir {
            path: params.output_dir.clone(),
            source,
        })?;
        let progress = ProgressReporter::new(observer);

        // Load and repair
        progress.status(
            PipelineStage::Load,
            5,
            format!("Loading {}", params.input.display()),
        );
        let mut solid = load_stl(&params.input).map_err(|source| PipelineError::Load {
            path: params.input.clone(),
            source,
        })?;
        let summary = repair_solid(&mut solid, &self.options.repair);
        let hole_status = match &summary.hole_fill_error {
            Some(e) => format!("Hole filling failed: {}", e),
            None => format!("Filled {} holes", summary.holes_filled),
        };
        progress.status(PipelineStage::Load, 10, hole_status);
        progress.status(
            PipelineStage::Load,
            15,
            format!("Mesh cleaned: {}", summary),
        );

        let repaired_mesh = params.output_dir.join(REPAIRED_MESH_FILE);
        save_stl(&solid, &repaired_mesh).map_err(|source| PipelineError::Export {
            path: repaired_mesh.clone(),
            source,
        })?;

        // Grid and shared faces
        let bounds = solid.bounds();
        let grid = Grid::new(bounds, params.divisions);
        let plan = FacePlan::build(
            &grid,
            params.locks_per_face,
            params.edge_margin,
            params.seed,
            params.style,
        );
        plan.verify_complementary()?;
        tracing::info!(
            cells = grid.cell_count(),
            faces = plan.len(),
            interlocks = plan.instance_count(),
            seed = params.seed,
            "Face plan ready"
        );
        progress.status(
            PipelineStage::GridCompute,
            20,
            format!(
                "Grid {}x{}x{} with {} internal faces",
                params.divisions.nx,
                params.divisions.ny,
                params.divisions.nz,
                plan.len()
            ),
        );

        // Per-cell assembly
        let assembly_start = Instant::now();
        let builder = InterlockBuilder::new(params.dimensions(), params.tessellation);
        let assemblies = self.assemble_cells(&grid, &solid, &plan, &builder, params, &progress)?;
        tracing::info!(
            cells = assemblies.len(),
            assembly_time_ms = assembly_start.elapsed().as_millis() as u64,
            parallel = self.options.parallel,
            "Cell assembly complete"
        );

        // Export in cell order
        let export = export_pieces(assemblies, &params.output_dir);
        let mesh_info = MeshInfo::new(
            &bounds,
            summary.watertight,
            export.pieces.len(),
            grid.cell_count(),
        );
        progress.status(
            PipelineStage::Aggregate,
            85,
            format!(
                "Exported {} of {} pieces ({})",
                mesh_info.piece_count,
                mesh_info.total_possible_pieces,
                mesh_info.success_rate_percent
            ),
        );

        let (previews, render_error) = self.render(&export.meshes, &params.output_dir, &progress);
        progress.status(PipelineStage::Done, 100, "Finished");

        let report = PuzzleReport {
            repaired_mesh,
            pieces: export.pieces,
            previews,
            mesh_info,
            outcomes: export.outcomes,
            empty_count: export.empty_count,
            failed_count: export.failed_count,
            interlocks_attempted: export.interlocks_attempted,
            interlocks_failed: export.interlocks_failed,
            repair: RepairReport::from(&summary),
            render_error,
            seed: params.seed,
            divisions: params.divisions,
            total_time_ms: total_start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            pieces = report.mesh_info.piece_count,
            empty = report.empty_count,
            failed = report.failed_count,
            interlocks_failed = report.interlocks_failed,
            total_time_ms = report.total_time_ms,
            "Decomposition complete"
        );
        Ok(report)
    }

    fn assemble_cells(
        &self,
        grid: &Grid,
        solid: &Mesh,
        plan: &FacePlan,
        builder: &InterlockBuilder,
        params: &PuzzleParams,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<CellAssembly>> {
        let assembler = PieceAssembler::new(&self.kernel, builder, params.mating);
        let cells: Vec<CellIndex> = grid.cells().collect();
        let total = cells.len();
        let done = AtomicUsize::new(0);

        progress.status(
            PipelineStage::PerCellAssembly,
            25,
            format!("Assembling {} cells", total),
        );

        let assemble = |cell: CellIndex| {
            let assembly = assembler.assemble(cell, &grid.cell_box(cell), solid, plan);
            let finished = done.fetch_add(1, Ordering::AcqRel) + 1;
            progress.piece(assembly_percent(finished, total), piece_event(&assembly));
            assembly
        };

        if !self.options.parallel {
            return Ok(cells.iter().map(|&cell| assemble(cell)).collect());
        }

        let run = || -> Vec<CellAssembly> {
            cells.par_iter().map(|&cell| assemble(cell)).collect()
        };
        match self.options.worker_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                tracing::debug!(threads, "Assembling on a dedicated pool");
                Ok(pool.install(run))
            }
            None => Ok(run()),
        }
    }

    fn render(
        &self,
        meshes: &[Mesh],
        output_dir: &Path,
        progress: &ProgressReporter<'_>,
    ) -> (Vec<PathBuf>, Option<String>) {
        if !self.options.render || meshes.is_empty() {
            tracing::debug!(pieces = meshes.len(), "Skipping previews");
            return (Vec::new(), None);
        }

        progress.status(
            PipelineStage::Render,
            90,
            format!("Rendering {} pieces", meshes.len()),
        );
        let (width, height) = self.options.image_size;
        let renderer = SnapshotRenderer::new(width, height);
        match renderer.render_views(meshes, &DEFAULT_VIEWS, output_dir) {
            Ok(rendered) => {
                progress.status(
                    PipelineStage::Render,
                    95,
                    format!("Wrote {} previews", rendered.written.len()),
                );
                let error = (!rendered.failed.is_empty()).then(|| {
                    rendered
                        .failed
                        .iter()
                        .map(|(path, reason)| format!("{}: {}", path.display(), reason))
                        .collect::<Vec<_>>()
                        .join("; ")
                });
                (rendered.written, error)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Preview rendering failed");
                (Vec::new(), Some(e.to_string()))
            }
        }
    }
}

/// Run with the csgrs kernel and default options.
pub fn run_puzzle(
    params: &PuzzleParams,
    observer: Option<&dyn ProgressObserver>,
) -> Result<PuzzleReport> {
    DecompositionPipeline::default().run(params, observer)
}

fn piece_event(assembly: &CellAssembly) -> String {
    match &assembly.result {
        PieceResult::Ready(_) if assembly.interlocks_failed() > 0 => format!(
            "Piece {} ready, {} of {} interlocks failed",
            assembly.cell,
            assembly.interlocks_failed(),
            assembly.interlocks_attempted()
        ),
        PieceResult::Ready(_) => format!("Piece {} ready", assembly.cell),
        PieceResult::Empty => format!("Piece {} empty, skipped", assembly.cell),
        PieceResult::Failed(reason) => format!("Piece {} failed: {}", assembly.cell, reason),
    }
}

#[derive(Default)]
struct ExportSummary {
    pieces: Vec<PathBuf>,
    meshes: Vec<Mesh>,
    outcomes: Vec<PieceOutcome>,
    empty_count: usize,
    failed_count: usize,
    interlocks_attempted: usize,
    interlocks_failed: usize,
}

fn export_pieces(assemblies: Vec<CellAssembly>, output_dir: &Path) -> ExportSummary {
    let mut summary = ExportSummary::default();

    for assembly in assemblies {
        summary.interlocks_attempted += assembly.interlocks_attempted();
        summary.interlocks_failed += assembly.interlocks_failed();
        let CellAssembly {
            cell,
            result,
            interlocks,
            cleanup_error,
        } = assembly;

        let (status, path, reason) = match result {
            PieceResult::Ready(mesh) => {
                let path = output_dir.join(cell.piece_file_name());
                match save_stl(&mesh, &path) {
                    Ok(()) => {
                        tracing::debug!(%cell, path = %path.display(), "Exported piece");
                        summary.pieces.push(path.clone());
                        summary.meshes.push(mesh);
                        (PieceStatus::Exported, Some(path), None)
                    }
                    Err(e) => {
                        tracing::warn!(%cell, error = %e, "Piece export failed");
                        summary.failed_count += 1;
                        (PieceStatus::ExportFailed, None, Some(e.to_string()))
                    }
                }
            }
            PieceResult::Empty => {
                summary.empty_count += 1;
                (PieceStatus::Empty, None, None)
            }
            PieceResult::Failed(reason) => {
                summary.failed_count += 1;
                (PieceStatus::Failed, None, Some(reason))
            }
        };

        summary.outcomes.push(PieceOutcome {
            cell,
            status,
            path,
            reason,
            cleanup_error,
            interlocks,
        });
    }

    summary
}
