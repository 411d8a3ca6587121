// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grid partitioning of the solid's bounding box

use puzzlecut_geometry::{Aabb, Axis, Point3};
use serde::Serialize;
use std::fmt;

/// Number of cells along each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Divisions {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl Divisions {
    pub const fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    #[inline]
    pub fn along(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.nx,
            Axis::Y => self.ny,
            Axis::Z => self.nz,
        }
    }

    /// `nx * ny * nz`
    pub fn total(&self) -> usize {
        self.nx * self.ny * self.nz
    }
}

impl Default for Divisions {
    fn default() -> Self {
        Self::new(2, 2, 2)
    }
}

/// Integer cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellIndex {
    pub i: usize,
    pub j: usize,
    pub k: usize,
}

impl CellIndex {
    pub const fn new(i: usize, j: usize, k: usize) -> Self {
        Self { i, j, k }
    }

    #[inline]
    pub fn along(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.i,
            Axis::Y => self.j,
            Axis::Z => self.k,
        }
    }

    /// Export name of the piece for this cell
    pub fn piece_file_name(&self) -> String {
        format!("piece_{}_{}_{}.stl", self.i, self.j, self.k)
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.i, self.j, self.k)
    }
}

/// Uniform cut planes over a bounding box
#[derive(Debug, Clone)]
pub struct Grid {
    bounds: Aabb,
    divisions: Divisions,
    cuts: [Vec<f64>; 3],
}

/// `n + 1` uniformly spaced coordinates, last one pinned to `max`
fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    let step = (max - min) / n as f64;
    let mut cuts: Vec<f64> = (0..=n).map(|t| min + t as f64 * step).collect();
    if let Some(last) = cuts.last_mut() {
        *last = max;
    }
    cuts
}

impl Grid {
    /// Divisions must be at least 1 per axis; parameters are validated
    /// before a grid is built. Degenerate bounds give zero-volume cells.
    pub fn new(bounds: Aabb, divisions: Divisions) -> Self {
        let cuts = Axis::ALL.map(|axis| {
            let (min, max) = bounds.range(axis);
            linspace(min, max, divisions.along(axis).max(1))
        });
        Self {
            bounds,
            divisions,
            cuts,
        }
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn divisions(&self) -> Divisions {
        self.divisions
    }

    /// Cut coordinates along one axis
    pub fn cuts(&self, axis: Axis) -> &[f64] {
        &self.cuts[axis.index()]
    }

    pub fn cell_count(&self) -> usize {
        self.divisions.total()
    }

    /// All cells, `i` outermost, `k` innermost
    pub fn cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        let Divisions { nx, ny, nz } = self.divisions;
        (0..nx).flat_map(move |i| {
            (0..ny).flat_map(move |j| (0..nz).map(move |k| CellIndex::new(i, j, k)))
        })
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.i < self.divisions.nx && cell.j < self.divisions.ny && cell.k < self.divisions.nz
    }

    /// Box of one cell
    pub fn cell_box(&self, cell: CellIndex) -> Aabb {
        let [x, y, z] = &self.cuts;
        Aabb::new(
            Point3::new(x[cell.i], y[cell.j], z[cell.k]),
            Point3::new(x[cell.i + 1], y[cell.j + 1], z[cell.k + 1]),
        )
    }

    /// The cell across the `+axis` face, if there is one
    pub fn neighbor(&self, cell: CellIndex, axis: Axis) -> Option<CellIndex> {
        let next = match axis {
            Axis::X => CellIndex::new(cell.i + 1, cell.j, cell.k),
            Axis::Y => CellIndex::new(cell.i, cell.j + 1, cell.k),
            Axis::Z => CellIndex::new(cell.i, cell.j, cell.k + 1),
        };
        self.contains(next).then_some(next)
    }

    /// Number of faces shared by two cells
    pub fn internal_face_count(&self) -> usize {
        let Divisions { nx, ny, nz } = self.divisions;
        nx.saturating_sub(1) * ny * nz
            + nx * ny.saturating_sub(1) * nz
            + nx * ny * nz.saturating_sub(1)
    }
}
