// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run report types.

use crate::assembler::InterlockRecord;
use crate::grid::{CellIndex, Divisions};
use puzzlecut_geometry::{Aabb, RepairSummary};
use serde::Serialize;
use std::path::PathBuf;

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PuzzleReport {
    /// Repaired input solid.
    pub repaired_mesh: PathBuf,
    /// Exported pieces, in cell order.
    pub pieces: Vec<PathBuf>,
    /// Preview images, in view order.
    pub previews: Vec<PathBuf>,
    /// Summary of the decomposition.
    pub mesh_info: MeshInfo,
    /// One entry per grid cell, in cell order.
    pub outcomes: Vec<PieceOutcome>,
    /// Cells that did not overlap the solid.
    pub empty_count: usize,
    /// Cells whose intersection or export failed.
    pub failed_count: usize,
    /// Interlock booleans attempted over all pieces.
    pub interlocks_attempted: usize,
    /// Interlock booleans that failed and were skipped.
    pub interlocks_failed: usize,
    /// What load-time repair changed.
    pub repair: RepairReport,
    /// Set when preview rendering failed.
    pub render_error: Option<String>,
    pub seed: u64,
    pub divisions: Divisions,
    /// Wall time of the run (ms).
    pub total_time_ms: u64,
}

impl PuzzleReport {
    /// Outcomes that did not end in an exported piece.
    pub fn failures(&self) -> impl Iterator<Item = &PieceOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, PieceStatus::Failed | PieceStatus::ExportFailed))
    }
}

/// Decomposition summary.
#[derive(Debug, Clone, Serialize)]
pub struct MeshInfo {
    pub bounds_min: [f64; 3],
    pub bounds_max: [f64; 3],
    /// Whether the repaired input is closed.
    pub watertight: bool,
    /// Number of exported pieces.
    pub piece_count: usize,
    /// `nx * ny * nz`.
    pub total_possible_pieces: usize,
    pub success_rate: f64,
    /// `success_rate` as a percentage string, e.g. `"87.5%"`.
    pub success_rate_percent: String,
}

impl MeshInfo {
    pub fn new(
        bounds: &Aabb,
        watertight: bool,
        piece_count: usize,
        total_possible_pieces: usize,
    ) -> Self {
        let success_rate = if total_possible_pieces == 0 {
            0.0
        } else {
            piece_count as f64 / total_possible_pieces as f64
        };
        let success_rate_percent = if total_possible_pieces == 0 {
            "0%".to_string()
        } else {
            format!("{:.1}%", success_rate * 100.0)
        };
        Self {
            bounds_min: [bounds.min.x, bounds.min.y, bounds.min.z],
            bounds_max: [bounds.max.x, bounds.max.y, bounds.max.z],
            watertight,
            piece_count,
            total_possible_pieces,
            success_rate,
            success_rate_percent,
        }
    }
}

/// Load-time repair counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    pub initial_faces: usize,
    pub final_faces: usize,
    pub degenerates_removed: usize,
    pub duplicates_removed: usize,
    pub vertices_welded: usize,
    pub holes_filled: usize,
    /// Set when hole filling was attempted and failed.
    pub hole_fill_error: Option<String>,
}

impl From<&RepairSummary> for RepairReport {
    fn from(summary: &RepairSummary) -> Self {
        Self {
            initial_faces: summary.initial_faces,
            final_faces: summary.final_faces,
            degenerates_removed: summary.degenerates_removed,
            duplicates_removed: summary.duplicates_removed,
            vertices_welded: summary.vertices_welded,
            holes_filled: summary.holes_filled,
            hole_fill_error: summary.hole_fill_error.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceStatus {
    Exported,
    Empty,
    Failed,
    ExportFailed,
}

/// What happened to one cell.
#[derive(Debug, Clone, Serialize)]
pub struct PieceOutcome {
    pub cell: CellIndex,
    pub status: PieceStatus,
    /// Exported STL, when there is one.
    pub path: Option<PathBuf>,
    /// Failure reason for failed cells.
    pub reason: Option<String>,
    /// Cleanup problem; the uncleaned piece was exported.
    pub cleanup_error: Option<String>,
    pub interlocks: Vec<InterlockRecord>,
}
