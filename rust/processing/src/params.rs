// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run parameters and their validation

use crate::error::{PipelineError, Result};
use crate::grid::Divisions;
use crate::interlock::{InterlockDimensions, StyleSelection, Tessellation};
use crate::roles::MatingMode;
use puzzlecut_geometry::{Axis, RepairParams};
use std::path::PathBuf;

/// Largest accepted division count per axis
pub const MAX_DIVISIONS: usize = 32;
/// Largest accepted number of interlocks per face
pub const MAX_LOCKS_PER_FACE: usize = 16;
/// Deepest accepted dome subdivision (20 * 4^5 faces)
pub const MAX_SPHERE_SUBDIVISIONS: u32 = 5;

/// What to decompose and how
#[derive(Debug, Clone)]
pub struct PuzzleParams {
    pub input: PathBuf,
    pub divisions: Divisions,
    pub locks_per_face: usize,
    pub cyl_radius: f64,
    pub cyl_height: f64,
    pub sphere_radius: f64,
    pub socket_tolerance: f64,
    pub seed: u64,
    pub output_dir: PathBuf,
    /// Fraction of each face edge kept free of interlocks, per side
    pub edge_margin: f64,
    pub style: StyleSelection,
    pub mating: MatingMode,
    pub tessellation: Tessellation,
}

impl PuzzleParams {
    /// Defaults for everything but the input path
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let dims = InterlockDimensions::default();
        Self {
            input: input.into(),
            divisions: Divisions::default(),
            locks_per_face: 3,
            cyl_radius: dims.cyl_radius,
            cyl_height: dims.cyl_height,
            sphere_radius: dims.sphere_radius,
            socket_tolerance: dims.socket_tolerance,
            seed: 42,
            output_dir: PathBuf::from("printable_puzzle"),
            edge_margin: 0.2,
            style: StyleSelection::default(),
            mating: MatingMode::default(),
            tessellation: Tessellation::default(),
        }
    }

    pub fn dimensions(&self) -> InterlockDimensions {
        InterlockDimensions {
            cyl_radius: self.cyl_radius,
            cyl_height: self.cyl_height,
            sphere_radius: self.sphere_radius,
            socket_tolerance: self.socket_tolerance,
        }
    }

    /// Reject anything outside the supported ranges before a run starts
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(PipelineError::invalid("input", "no input mesh given"));
        }

        for axis in Axis::ALL {
            let n = self.divisions.along(axis);
            if !(1..=MAX_DIVISIONS).contains(&n) {
                return Err(PipelineError::invalid(
                    "divisions",
                    format!("{} divisions must be in 1..={}, got {}", axis, MAX_DIVISIONS, n),
                ));
            }
        }

        if !(1..=MAX_LOCKS_PER_FACE).contains(&self.locks_per_face) {
            return Err(PipelineError::invalid(
                "locks_per_face",
                format!("must be in 1..={}, got {}", MAX_LOCKS_PER_FACE, self.locks_per_face),
            ));
        }

        for (name, value) in [
            ("cyl_radius", self.cyl_radius),
            ("cyl_height", self.cyl_height),
            ("sphere_radius", self.sphere_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::invalid(
                    name,
                    format!("must be a positive number, got {}", value),
                ));
            }
        }

        if !self.socket_tolerance.is_finite() || self.socket_tolerance <= 1.0 {
            return Err(PipelineError::invalid(
                "socket_tolerance",
                format!("must be greater than 1, got {}", self.socket_tolerance),
            ));
        }

        if !self.edge_margin.is_finite() || !(0.0..0.5).contains(&self.edge_margin) {
            return Err(PipelineError::invalid(
                "edge_margin",
                format!("must be in [0, 0.5), got {}", self.edge_margin),
            ));
        }

        if self.tessellation.cylinder_sections < 3 {
            return Err(PipelineError::invalid(
                "tessellation",
                format!(
                    "cylinders need at least 3 sections, got {}",
                    self.tessellation.cylinder_sections
                ),
            ));
        }

        if self.tessellation.sphere_subdivisions > MAX_SPHERE_SUBDIVISIONS {
            return Err(PipelineError::invalid(
                "tessellation",
                format!(
                    "sphere subdivisions must be at most {}, got {}",
                    MAX_SPHERE_SUBDIVISIONS, self.tessellation.sphere_subdivisions
                ),
            ));
        }

        Ok(())
    }
}

/// How a run is executed
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Assemble cells on the rayon pool
    pub parallel: bool,
    /// Dedicated pool size; the global pool is used when unset
    pub worker_threads: Option<usize>,
    pub render: bool,
    pub image_size: (u32, u32),
    pub repair: RepairParams,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            worker_threads: None,
            render: true,
            image_size: (1200, 900),
            repair: RepairParams::default(),
        }
    }
}
