// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! puzzlecut processing
//!
//! Splits a closed solid into a grid of printable pieces joined by
//! key/socket interlocks.
//!
//! ```rust,no_run
//! use puzzlecut_processing::{run_puzzle, Divisions, PuzzleParams};
//!
//! let mut params = PuzzleParams::new("model.stl");
//! params.divisions = Divisions::new(3, 2, 2);
//! let report = run_puzzle(&params, None)?;
//! println!("{} pieces", report.mesh_info.piece_count);
//! # Ok::<(), puzzlecut_processing::PipelineError>(())
//! ```

pub mod assembler;
pub mod error;
pub mod grid;
pub mod interlock;
pub mod params;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod roles;

pub use assembler::{CellAssembly, InterlockOutcome, InterlockRecord, PieceAssembler, PieceResult};
pub use error::{PipelineError, Result};
pub use grid::{CellIndex, Divisions, Grid};
pub use interlock::{
    InterlockBuilder, InterlockDimensions, InterlockSpec, InterlockStyle, StyleSelection,
    Tessellation,
};
pub use params::{
    PipelineOptions, PuzzleParams, MAX_DIVISIONS, MAX_LOCKS_PER_FACE, MAX_SPHERE_SUBDIVISIONS,
};
pub use pipeline::{run_puzzle, DecompositionPipeline, REPAIRED_MESH_FILE};
pub use progress::{PipelineStage, ProgressObserver, ProgressUpdate};
pub use report::{MeshInfo, PieceOutcome, PieceStatus, PuzzleReport, RepairReport};
pub use roles::{is_key, role_for, FacePlan, InterlockInstance, InternalFace, MatingMode, Role};
