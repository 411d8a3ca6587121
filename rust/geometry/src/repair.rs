// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh repair
//!
//! Light-weight clean-up for STL input and boolean output: degenerate and
//! duplicate face removal, vertex welding, boundary-loop hole filling and a
//! watertightness check. STL files store a triangle soup, so every entry
//! point welds coincident vertices before reasoning about topology.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::triangulation::{calculate_polygon_normal, project_to_2d, triangulate_polygon};
use nalgebra::{Point3, Vector3};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

/// Default distance under which vertices are considered coincident
pub const DEFAULT_WELD_EPSILON: f64 = 1e-6;

/// Parameters for [`repair_solid`]
#[derive(Debug, Clone)]
pub struct RepairParams {
    /// Vertices closer than this are merged
    pub weld_epsilon: f64,
    /// Triangles with a smaller area are dropped
    pub degenerate_area_threshold: f64,
    /// Whether to try closing boundary loops
    pub fill_holes: bool,
    /// Boundary loops with more edges are left open
    pub max_hole_edges: usize,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            weld_epsilon: DEFAULT_WELD_EPSILON,
            degenerate_area_threshold: 1e-12,
            fill_holes: true,
            max_hole_edges: 100,
        }
    }
}

/// What [`repair_solid`] changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub initial_faces: usize,
    pub final_vertices: usize,
    pub final_faces: usize,
    pub degenerates_removed: usize,
    pub vertices_welded: usize,
    pub duplicates_removed: usize,
    pub unreferenced_removed: usize,
    pub holes_filled: usize,
    /// Set when hole filling was attempted and did not fully succeed
    pub hole_fill_error: Option<String>,
    /// Every edge shared by exactly two faces after repair
    pub watertight: bool,
}

impl RepairSummary {
    pub fn had_changes(&self) -> bool {
        self.degenerates_removed > 0
            || self.vertices_welded > 0
            || self.duplicates_removed > 0
            || self.unreferenced_removed > 0
            || self.holes_filled > 0
    }
}

impl std::fmt::Display for RepairSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} faces ({} degenerate, {} duplicate removed, {} holes filled), {} verts ({} welded)",
            self.final_faces,
            self.degenerates_removed,
            self.duplicates_removed,
            self.holes_filled,
            self.final_vertices,
            self.vertices_welded
        )
    }
}

/// Run the load-time repair sequence in place
pub fn repair_solid(mesh: &mut Mesh, params: &RepairParams) -> RepairSummary {
    let mut solid = IndexedSolid::from_mesh(mesh);
    let mut summary = RepairSummary {
        initial_faces: solid.faces.len(),
        ..Default::default()
    };

    summary.degenerates_removed = solid.remove_degenerate(params.degenerate_area_threshold);
    summary.vertices_welded = solid.weld(params.weld_epsilon);
    summary.duplicates_removed = solid.remove_duplicate_faces();
    summary.unreferenced_removed = solid.remove_unreferenced();

    if params.fill_holes {
        match solid.fill_holes(params.max_hole_edges) {
            Ok(filled) => summary.holes_filled = filled,
            Err(e) => {
                warn!(error = %e, "hole filling failed, continuing with open mesh");
                summary.hole_fill_error = Some(e.to_string());
            }
        }
    }

    summary.watertight = solid.is_watertight();
    summary.final_vertices = solid.vertices.len();
    summary.final_faces = solid.faces.len();
    debug!(%summary, "mesh repaired");

    *mesh = solid.into_mesh();
    summary
}

/// Revalidate a mesh and drop degenerate/duplicate faces
pub fn cleanup(mesh: &Mesh, weld_epsilon: f64) -> Mesh {
    let mut solid = IndexedSolid::from_mesh(mesh);
    solid.remove_degenerate(0.0);
    solid.weld(weld_epsilon);
    solid.remove_duplicate_faces();
    solid.remove_unreferenced();
    solid.into_mesh()
}

/// Close boundary loops of up to `max_hole_edges` edges.
///
/// Returns the number of loops filled. Loops that could not be
/// triangulated produce an error after all other loops have been filled.
pub fn fill_holes(mesh: &mut Mesh, max_hole_edges: usize) -> Result<usize> {
    let mut solid = IndexedSolid::from_mesh(mesh);
    solid.weld(DEFAULT_WELD_EPSILON);
    let result = solid.fill_holes(max_hole_edges);
    *mesh = solid.into_mesh();
    result
}

/// True when every edge is shared by exactly two faces
pub fn is_watertight(mesh: &Mesh) -> bool {
    let mut solid = IndexedSolid::from_mesh(mesh);
    solid.weld(DEFAULT_WELD_EPSILON);
    solid.is_watertight()
}

/// Shared-vertex working representation
struct IndexedSolid {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
}

impl IndexedSolid {
    fn from_mesh(mesh: &Mesh) -> Self {
        Self {
            vertices: (0..mesh.vertex_count()).map(|i| mesh.position(i)).collect(),
            faces: mesh
                .indices
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .collect(),
        }
    }

    fn into_mesh(self) -> Mesh {
        let mut mesh = Mesh::with_capacity(self.vertices.len(), self.faces.len() * 3);
        for v in &self.vertices {
            mesh.add_vertex(*v, Vector3::z());
        }
        for [a, b, c] in self.faces {
            mesh.add_triangle(a, b, c);
        }
        mesh.recompute_normals();
        mesh
    }

    fn corners(&self, face: &[u32; 3]) -> [Point3<f64>; 3] {
        [
            self.vertices[face[0] as usize],
            self.vertices[face[1] as usize],
            self.vertices[face[2] as usize],
        ]
    }

    fn remove_degenerate(&mut self, area_threshold: f64) -> usize {
        let before = self.faces.len();
        let vertices = &self.vertices;
        self.faces.retain(|&[a, b, c]| {
            if a == b || b == c || a == c {
                return false;
            }
            let (p0, p1, p2) = (
                vertices[a as usize],
                vertices[b as usize],
                vertices[c as usize],
            );
            (p1 - p0).cross(&(p2 - p0)).norm() * 0.5 > area_threshold
        });
        before - self.faces.len()
    }

    /// Merge vertices closer than `epsilon` using a spatial hash
    fn weld(&mut self, epsilon: f64) -> usize {
        if self.vertices.is_empty() || epsilon <= 0.0 {
            return 0;
        }

        let cell_size = epsilon * 2.0;
        let cell_of = |p: &Point3<f64>| {
            (
                (p.x / cell_size).floor() as i64,
                (p.y / cell_size).floor() as i64,
                (p.z / cell_size).floor() as i64,
            )
        };

        let mut spatial_hash: FxHashMap<(i64, i64, i64), Vec<u32>> = FxHashMap::default();
        for (idx, p) in self.vertices.iter().enumerate() {
            spatial_hash.entry(cell_of(p)).or_default().push(idx as u32);
        }

        let mut remap: Vec<u32> = (0..self.vertices.len() as u32).collect();
        let mut merged = 0;
        for (idx, p) in self.vertices.iter().enumerate() {
            let idx = idx as u32;
            if remap[idx as usize] != idx {
                continue;
            }
            let cell = cell_of(p);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(candidates) =
                            spatial_hash.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                        else {
                            continue;
                        };
                        for &other in candidates {
                            if other <= idx || remap[other as usize] != other {
                                continue;
                            }
                            if (p - self.vertices[other as usize]).norm() < epsilon {
                                remap[other as usize] = idx;
                                merged += 1;
                            }
                        }
                    }
                }
            }
        }

        if merged == 0 {
            return 0;
        }

        for face in &mut self.faces {
            for corner in face.iter_mut() {
                *corner = remap[*corner as usize];
            }
        }
        self.faces
            .retain(|&[a, b, c]| a != b && b != c && a != c);
        merged
    }

    /// Drop faces repeating an existing vertex triple in either winding
    fn remove_duplicate_faces(&mut self) -> usize {
        let before = self.faces.len();
        let mut seen: FxHashSet<[u32; 3]> = FxHashSet::default();
        self.faces.retain(|&[a, b, c]| {
            let fwd = normalize_face([a, b, c]);
            let rev = normalize_face([a, c, b]);
            if seen.contains(&fwd) || seen.contains(&rev) {
                false
            } else {
                seen.insert(fwd);
                true
            }
        });
        before - self.faces.len()
    }

    fn remove_unreferenced(&mut self) -> usize {
        let mut new_index = vec![u32::MAX; self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.vertices.len());
        for face in &mut self.faces {
            for corner in face.iter_mut() {
                let slot = &mut new_index[*corner as usize];
                if *slot == u32::MAX {
                    *slot = vertices.len() as u32;
                    vertices.push(self.vertices[*corner as usize]);
                }
                *corner = *slot;
            }
        }
        let removed = self.vertices.len() - vertices.len();
        self.vertices = vertices;
        removed
    }

    fn is_watertight(&self) -> bool {
        if self.faces.is_empty() {
            return false;
        }
        let mut edge_faces: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        for &[a, b, c] in &self.faces {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *edge_faces.entry((u.min(v), u.max(v))).or_insert(0) += 1;
            }
        }
        edge_faces.values().all(|&count| count == 2)
    }

    /// Trace boundary loops in the winding a filling patch must use
    fn boundary_loops(&self) -> Vec<Vec<u32>> {
        let mut directed: FxHashSet<(u32, u32)> = FxHashSet::default();
        for &[a, b, c] in &self.faces {
            directed.extend([(a, b), (b, c), (c, a)]);
        }

        // For each open half-edge a->b the patch needs b->a
        let mut next: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        let mut starts = Vec::new();
        for &(a, b) in &directed {
            if !directed.contains(&(b, a)) {
                next.entry(b).or_default().push(a);
                starts.push(b);
            }
        }
        starts.sort_unstable();

        let mut loops = Vec::new();
        for start in starts {
            let mut current = start;
            let mut path = Vec::new();
            loop {
                let Some(step) = next.get_mut(&current).and_then(Vec::pop) else {
                    // Dangling chain on a non-manifold boundary
                    path.clear();
                    break;
                };
                path.push(current);
                current = step;
                if current == start {
                    break;
                }
            }
            if path.len() >= 3 {
                loops.push(path);
            }
        }
        loops
    }

    fn fill_holes(&mut self, max_hole_edges: usize) -> Result<usize> {
        let loops = self.boundary_loops();
        if loops.is_empty() {
            return Ok(0);
        }
        debug!(loops = loops.len(), "found boundary loops");

        let mut filled = 0;
        let mut failures = Vec::new();
        for hole in &loops {
            if hole.len() > max_hole_edges {
                warn!(
                    edges = hole.len(),
                    max = max_hole_edges,
                    "skipping hole larger than the fill limit"
                );
                continue;
            }
            match self.patch(hole) {
                Ok(patch) => {
                    self.faces.extend(patch);
                    filled += 1;
                }
                Err(e) => failures.push(e.to_string()),
            }
        }

        if failures.is_empty() {
            Ok(filled)
        } else {
            Err(Error::HoleFill(format!(
                "{} of {} boundary loops could not be filled: {}",
                failures.len(),
                loops.len(),
                failures.join("; ")
            )))
        }
    }

    fn patch(&self, hole: &[u32]) -> Result<Vec<[u32; 3]>> {
        if hole.len() == 3 {
            return Ok(vec![[hole[0], hole[1], hole[2]]]);
        }

        let points: Vec<Point3<f64>> = hole.iter().map(|&v| self.vertices[v as usize]).collect();
        let normal = calculate_polygon_normal(&points);
        let indices = triangulate_polygon(&project_to_2d(&points, &normal))?;

        let mut faces = Vec::with_capacity(indices.len() / 3);
        for tri in indices.chunks_exact(3) {
            let face = [hole[tri[0]], hole[tri[1]], hole[tri[2]]];
            let [p0, p1, p2] = self.corners(&face);
            if (p1 - p0).cross(&(p2 - p0)).dot(&normal) < 0.0 {
                faces.push([face[0], face[2], face[1]]);
            } else {
                faces.push(face);
            }
        }
        Ok(faces)
    }
}

/// Rotate a face so the smallest vertex index comes first
fn normalize_face(face: [u32; 3]) -> [u32; 3] {
    let min_idx = if face[0] <= face[1] && face[0] <= face[2] {
        0
    } else if face[1] <= face[2] {
        1
    } else {
        2
    };
    [
        face[min_idx],
        face[(min_idx + 1) % 3],
        face[(min_idx + 2) % 3],
    ]
}
