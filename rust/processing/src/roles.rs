// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key/socket roles and the internal-face table
//!
//! Every face shared by two cells is created once, owned by the cell on
//! its `-axis` side. Interlock centres are drawn from a generator private
//! to the owner cell, so the plan does not depend on processing order.

use crate::grid::{CellIndex, Grid};
use crate::interlock::{InterlockSpec, InterlockStyle, StyleSelection};
use puzzlecut_geometry::{Axis, Point3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Which half of an interlock pair a cell receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Protrusion added by union
    Key,
    /// Cavity removed by difference
    Socket,
}

impl Role {
    pub fn opposite(self) -> Role {
        match self {
            Role::Key => Role::Socket,
            Role::Socket => Role::Key,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Key => "key",
            Role::Socket => "socket",
        })
    }
}

/// Parity rule for instance `n` on a face owned by cell `(i, j, k)`
#[inline]
pub fn is_key(i: usize, j: usize, k: usize, n: usize) -> bool {
    ((i + j + k) % 2 == 0) ^ (n % 2 == 1)
}

/// Role of instance `n` as seen from `cell`
#[inline]
pub fn role_for(cell: CellIndex, n: usize) -> Role {
    if is_key(cell.i, cell.j, cell.k, n) {
        Role::Key
    } else {
        Role::Socket
    }
}

/// Which cells act on a shared interlock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatingMode {
    /// Only the owner applies its instance: a key is pushed into the owner
    /// side, a socket into the neighbour side
    #[default]
    OwnerOnly,
    /// Both cells apply the same instance with opposite roles
    Complementary,
}

impl FromStr for MatingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "owner-only" | "owner" => Ok(MatingMode::OwnerOnly),
            "complementary" => Ok(MatingMode::Complementary),
            other => Err(format!(
                "unknown mating mode '{}', expected owner-only or complementary",
                other
            )),
        }
    }
}

impl fmt::Display for MatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatingMode::OwnerOnly => "owner-only",
            MatingMode::Complementary => "complementary",
        })
    }
}

/// One interlock on an internal face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterlockInstance {
    pub n: usize,
    pub center: Point3<f64>,
    pub axis: Axis,
    /// Role for the owner cell
    pub role: Role,
    pub style: InterlockStyle,
}

impl InterlockInstance {
    /// Role for the neighbour cell
    pub fn mate_role(&self) -> Role {
        self.role.opposite()
    }

    /// Placement for the given role and push direction
    pub fn spec(&self, role: Role, flip_dir: bool) -> InterlockSpec {
        InterlockSpec {
            center: self.center,
            axis: self.axis,
            role,
            style: self.style,
            flip_dir,
        }
    }
}

/// Face between `owner` and `neighbor` across `+axis`
#[derive(Debug, Clone)]
pub struct InternalFace {
    pub owner: CellIndex,
    pub neighbor: CellIndex,
    pub axis: Axis,
    pub instances: Vec<InterlockInstance>,
}

/// Both sides of a face were handed the same role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceConflict {
    pub owner: CellIndex,
    pub neighbor: CellIndex,
    pub axis: Axis,
    pub n: usize,
}

impl fmt::Display for FaceConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cells {} and {} share the same role for interlock {} on the {} face",
            self.owner, self.neighbor, self.n, self.axis
        )
    }
}

impl std::error::Error for FaceConflict {}

/// Deterministic generator for one owner cell
pub fn cell_rng(seed: u64, cell: CellIndex) -> ChaCha8Rng {
    let mixed = [cell.i, cell.j, cell.k]
        .iter()
        .fold(splitmix64(seed), |acc, &c| splitmix64(acc ^ c as u64));
    ChaCha8Rng::seed_from_u64(mixed)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Every internal face of a grid with its interlock instances
#[derive(Debug, Clone, Default)]
pub struct FacePlan {
    faces: Vec<InternalFace>,
    owned: FxHashMap<CellIndex, [Option<usize>; 3]>,
    mated: FxHashMap<CellIndex, [Option<usize>; 3]>,
}

impl FacePlan {
    /// Create all faces; `edge_margin` is the excluded border fraction per side
    pub fn build(
        grid: &Grid,
        locks_per_face: usize,
        edge_margin: f64,
        seed: u64,
        style_selection: StyleSelection,
    ) -> Self {
        let mut plan = FacePlan::default();

        for owner in grid.cells() {
            let cell_box = grid.cell_box(owner);
            let mut rng = cell_rng(seed, owner);

            for axis in Axis::ALL {
                let Some(neighbor) = grid.neighbor(owner, axis) else {
                    continue;
                };
                let style = style_selection.style_for(owner);
                let (u_axis, v_axis) = axis.in_plane();

                let instances = (0..locks_per_face)
                    .map(|n| {
                        let mut center = Point3::origin();
                        center[axis.index()] = cell_box.max[axis.index()];
                        for in_plane in [u_axis, v_axis] {
                            let (lo, hi) = cell_box.range(in_plane);
                            let inset = (hi - lo) * edge_margin;
                            let t: f64 = rng.gen();
                            center[in_plane.index()] = lo + inset + t * (hi - lo - 2.0 * inset);
                        }
                        InterlockInstance {
                            n,
                            center,
                            axis,
                            role: role_for(owner, n),
                            style,
                        }
                    })
                    .collect();

                let index = plan.faces.len();
                plan.owned.entry(owner).or_default()[axis.index()] = Some(index);
                plan.mated.entry(neighbor).or_default()[axis.index()] = Some(index);
                plan.faces.push(InternalFace {
                    owner,
                    neighbor,
                    axis,
                    instances,
                });
            }
        }

        plan
    }

    pub fn faces(&self) -> &[InternalFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn instance_count(&self) -> usize {
        self.faces.iter().map(|f| f.instances.len()).sum()
    }

    /// Faces on the `+X`, `+Y`, `+Z` sides of `cell`, in that order
    pub fn owned_faces(&self, cell: CellIndex) -> impl Iterator<Item = &InternalFace> + '_ {
        self.lookup(&self.owned, cell)
    }

    /// Faces on the `-X`, `-Y`, `-Z` sides of `cell`, in that order
    pub fn mated_faces(&self, cell: CellIndex) -> impl Iterator<Item = &InternalFace> + '_ {
        self.lookup(&self.mated, cell)
    }

    fn lookup<'a>(
        &'a self,
        table: &'a FxHashMap<CellIndex, [Option<usize>; 3]>,
        cell: CellIndex,
    ) -> impl Iterator<Item = &'a InternalFace> + 'a {
        table
            .get(&cell)
            .into_iter()
            .flat_map(|slots| slots.iter().flatten())
            .map(move |&index| &self.faces[index])
    }

    /// Check that no face gives both of its cells the same role, including
    /// when the neighbour recomputes its role from its own parity
    pub fn verify_complementary(&self) -> Result<(), FaceConflict> {
        for face in &self.faces {
            for instance in &face.instances {
                let owner_role = role_for(face.owner, instance.n);
                let neighbor_role = role_for(face.neighbor, instance.n);
                if instance.role != owner_role
                    || instance.mate_role() == instance.role
                    || neighbor_role != instance.mate_role()
                {
                    return Err(FaceConflict {
                        owner: face.owner,
                        neighbor: face.neighbor,
                        axis: face.axis,
                        n: instance.n,
                    });
                }
            }
        }
        Ok(())
    }
}
