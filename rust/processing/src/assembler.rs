// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-cell piece assembly
//!
//! Cuts the solid down to one cell, then adds keys and carves sockets for
//! every face the cell takes part in. Each boolean is allowed to fail on
//! its own; only a failed cell intersection fails the piece.

use crate::grid::CellIndex;
use crate::interlock::InterlockBuilder;
use crate::roles::{FacePlan, InterlockInstance, InternalFace, MatingMode, Role};
use puzzlecut_geometry::primitives::cuboid;
use puzzlecut_geometry::{Aabb, Axis, BooleanOp, Mesh, SolidKernel};
use serde::Serialize;
use tracing::{debug, warn};

/// Outcome of assembling one cell
#[derive(Debug, Clone)]
pub enum PieceResult {
    Ready(Mesh),
    /// The cell does not overlap the solid
    Empty,
    /// The cell intersection itself failed
    Failed(String),
}

/// Why one interlock could not be applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterlockFailure {
    pub op: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InterlockOutcome {
    Applied,
    Failed(InterlockFailure),
}

/// One attempted interlock on a piece
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterlockRecord {
    /// Owner of the face the interlock sits on
    pub face_owner: CellIndex,
    pub axis: Axis,
    pub n: usize,
    pub role: Role,
    pub center: [f64; 3],
    pub outcome: InterlockOutcome,
}

impl InterlockRecord {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, InterlockOutcome::Failed(_))
    }
}

/// Everything that happened to one cell
#[derive(Debug, Clone)]
pub struct CellAssembly {
    pub cell: CellIndex,
    pub result: PieceResult,
    pub interlocks: Vec<InterlockRecord>,
    pub cleanup_error: Option<String>,
}

impl CellAssembly {
    fn without_piece(cell: CellIndex, result: PieceResult) -> Self {
        Self {
            cell,
            result,
            interlocks: Vec::new(),
            cleanup_error: None,
        }
    }

    pub fn interlocks_attempted(&self) -> usize {
        self.interlocks.len()
    }

    pub fn interlocks_failed(&self) -> usize {
        self.interlocks.iter().filter(|r| r.failed()).count()
    }
}

/// Builds the piece for a cell
pub struct PieceAssembler<'a> {
    kernel: &'a dyn SolidKernel,
    builder: &'a InterlockBuilder,
    mating: MatingMode,
}

impl<'a> PieceAssembler<'a> {
    pub fn new(
        kernel: &'a dyn SolidKernel,
        builder: &'a InterlockBuilder,
        mating: MatingMode,
    ) -> Self {
        Self {
            kernel,
            builder,
            mating,
        }
    }

    pub fn assemble(
        &self,
        cell: CellIndex,
        cell_box: &Aabb,
        solid: &Mesh,
        plan: &FacePlan,
    ) -> CellAssembly {
        if cell_box.is_degenerate() {
            debug!(%cell, "zero-volume cell");
            return CellAssembly::without_piece(cell, PieceResult::Empty);
        }

        let clipped = if cell_box.contains(&solid.bounds(), 0.0) {
            // Box encloses the whole solid
            Ok(solid.clone())
        } else {
            self.kernel.intersection(solid, &cuboid(cell_box))
        };
        let mut piece = match clipped {
            Ok(mesh) if mesh.is_empty() => {
                debug!(%cell, "cell does not intersect the solid");
                return CellAssembly::without_piece(cell, PieceResult::Empty);
            }
            Ok(mesh) => mesh,
            Err(e) => {
                warn!(%cell, error = %e, "cell intersection failed");
                return CellAssembly::without_piece(cell, PieceResult::Failed(e.to_string()));
            }
        };

        let mut interlocks = Vec::new();
        for face in plan.owned_faces(cell) {
            for instance in &face.instances {
                let (role, flip_dir) = match self.mating {
                    MatingMode::OwnerOnly => (instance.role, instance.role == Role::Socket),
                    MatingMode::Complementary => (instance.role, false),
                };
                interlocks.push(self.apply(&mut piece, cell, face, instance, role, flip_dir));
            }
        }
        if self.mating == MatingMode::Complementary {
            for face in plan.mated_faces(cell) {
                for instance in &face.instances {
                    let role = instance.mate_role();
                    interlocks.push(self.apply(&mut piece, cell, face, instance, role, false));
                }
            }
        }

        let cleanup_error = match self.kernel.cleanup(&piece) {
            Ok(cleaned) if !cleaned.is_empty() => {
                piece = cleaned;
                None
            }
            Ok(_) => {
                warn!(%cell, "cleanup emptied the piece, keeping it uncleaned");
                Some("cleanup produced an empty mesh".to_string())
            }
            Err(e) => {
                warn!(%cell, error = %e, "cleanup failed, keeping it uncleaned");
                Some(e.to_string())
            }
        };

        let failed = interlocks.iter().filter(|r| r.failed()).count();
        debug!(
            %cell,
            triangles = piece.triangle_count(),
            interlocks = interlocks.len(),
            failed,
            "piece assembled"
        );

        CellAssembly {
            cell,
            result: PieceResult::Ready(piece),
            interlocks,
            cleanup_error,
        }
    }

    /// Add or carve one interlock; the piece is left untouched on failure
    fn apply(
        &self,
        piece: &mut Mesh,
        cell: CellIndex,
        face: &InternalFace,
        instance: &InterlockInstance,
        role: Role,
        flip_dir: bool,
    ) -> InterlockRecord {
        let geometry = self.builder.build(&instance.spec(role, flip_dir), self.kernel);
        let op = match role {
            Role::Key => BooleanOp::Union,
            Role::Socket => BooleanOp::Difference,
        };

        let outcome = match self.kernel.boolean(op, piece, &geometry) {
            Ok(mesh) if !mesh.is_empty() => {
                *piece = mesh;
                InterlockOutcome::Applied
            }
            Ok(_) => {
                warn!(
                    %cell,
                    axis = ?face.axis,
                    n = instance.n,
                    %op,
                    "interlock left an empty piece, skipped"
                );
                InterlockOutcome::Failed(InterlockFailure {
                    op: op.name(),
                    reason: "result was empty".to_string(),
                })
            }
            Err(e) => {
                warn!(
                    %cell,
                    axis = ?face.axis,
                    n = instance.n,
                    %op,
                    error = %e,
                    "interlock failed, continuing"
                );
                InterlockOutcome::Failed(InterlockFailure {
                    op: op.name(),
                    reason: e.to_string(),
                })
            }
        };

        InterlockRecord {
            face_owner: face.owner,
            axis: face.axis,
            n: instance.n,
            role,
            center: [instance.center.x, instance.center.y, instance.center.z],
            outcome,
        }
    }
}
