// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSG (Constructive Solid Geometry) Operations
//!
//! Boolean operations backed by csgrs. Panics raised inside the BSP code
//! are caught and reported as [`Error::BooleanFailed`] so that one bad
//! interlock never takes a whole run down.

use crate::error::{Error, Result};
use crate::kernel::{BooleanOp, SolidKernel};
use crate::mesh::Mesh;
use crate::repair;
use crate::triangulation::{calculate_polygon_normal, project_to_2d, triangulate_polygon};
use nalgebra::{Point3, Vector3};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// csgrs-backed solid kernel
#[derive(Debug, Clone, Copy)]
pub struct CsgKernel {
    /// Distance under which vertices are merged during cleanup
    pub weld_epsilon: f64,
}

impl CsgKernel {
    pub fn new() -> Self {
        Self { weld_epsilon: 1e-6 }
    }

    /// Convert our Mesh format to csgrs Mesh format
    fn mesh_to_csgrs(mesh: &Mesh) -> Result<csgrs::mesh::Mesh<()>> {
        use csgrs::mesh::{polygon::Polygon, vertex::Vertex, Mesh as CSGMesh};

        if !mesh.is_valid() {
            return Err(Error::InvalidMesh(
                "non-finite coordinate or out-of-range index".to_string(),
            ));
        }

        let mut polygons = Vec::with_capacity(mesh.triangle_count());
        for [v0, v1, v2] in mesh.triangles() {
            // Zero-area faces would poison the BSP planes with NaN
            let face_normal = match (v1 - v0).cross(&(v2 - v0)).try_normalize(1e-10) {
                Some(n) => n,
                None => continue,
            };

            let vertices = vec![
                Vertex::new(v0, face_normal),
                Vertex::new(v1, face_normal),
                Vertex::new(v2, face_normal),
            ];
            polygons.push(Polygon::new(vertices, None));
        }

        Ok(CSGMesh::from_polygons(&polygons, None))
    }

    /// Convert csgrs Mesh format back to our Mesh format
    fn csgrs_to_mesh(csg_mesh: &csgrs::mesh::Mesh<()>) -> Mesh {
        let mut mesh = Mesh::new();

        for polygon in &csg_mesh.polygons {
            let vertices = &polygon.vertices;
            if vertices.len() < 3 {
                continue;
            }

            let points_3d: Vec<Point3<f64>> = vertices
                .iter()
                .map(|v| Point3::new(v.pos[0], v.pos[1], v.pos[2]))
                .collect();

            let raw_normal = Vector3::new(
                vertices[0].normal[0],
                vertices[0].normal[1],
                vertices[0].normal[2],
            );
            let normal = match raw_normal.try_normalize(1e-10) {
                Some(n) if n.iter().all(|c| c.is_finite()) => n,
                _ => match calculate_polygon_normal(&points_3d).try_normalize(1e-10) {
                    Some(n) => n,
                    None => continue,
                },
            };

            let base = mesh.vertex_count() as u32;
            for p in &points_3d {
                mesh.add_vertex(*p, normal);
            }

            if points_3d.len() == 3 {
                mesh.add_triangle(base, base + 1, base + 2);
                continue;
            }

            let points_2d = project_to_2d(&points_3d, &normal);
            let indices = match triangulate_polygon(&points_2d) {
                Ok(idx) => idx,
                Err(_) => continue,
            };

            for tri in indices.chunks_exact(3) {
                let (a, b, c) = (tri[0], tri[1], tri[2]);
                // earcut output follows the 2D orientation, re-align with the polygon normal
                let face = (points_3d[b] - points_3d[a]).cross(&(points_3d[c] - points_3d[a]));
                if face.dot(&normal) < 0.0 {
                    mesh.add_triangle(base + a as u32, base + c as u32, base + b as u32);
                } else {
                    mesh.add_triangle(base + a as u32, base + b as u32, base + c as u32);
                }
            }
        }

        mesh
    }

    /// Run the boolean inside csgrs, converting panics into errors
    fn run(op: BooleanOp, a: &Mesh, b: &Mesh) -> Result<Mesh> {
        use csgrs::traits::CSG;

        let lhs = Self::mesh_to_csgrs(a)?;
        let rhs = Self::mesh_to_csgrs(b)?;

        let result = panic::catch_unwind(AssertUnwindSafe(|| match op {
            BooleanOp::Intersection => lhs.intersection(&rhs),
            BooleanOp::Union => lhs.union(&rhs),
            BooleanOp::Difference => lhs.difference(&rhs),
        }))
        .map_err(|payload| Error::BooleanFailed {
            op: op.name(),
            reason: panic_message(payload),
        })?;

        let mesh = Self::csgrs_to_mesh(&result);
        if !mesh.is_valid() {
            return Err(Error::BooleanFailed {
                op: op.name(),
                reason: "result contains non-finite coordinates".to_string(),
            });
        }
        Ok(mesh)
    }
}

impl Default for CsgKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl SolidKernel for CsgKernel {
    fn boolean(&self, op: BooleanOp, a: &Mesh, b: &Mesh) -> Result<Mesh> {
        // Trivial cases skip the BSP build entirely
        let disjoint = a.is_empty() || b.is_empty() || !a.bounds().overlaps(&b.bounds());
        match op {
            BooleanOp::Intersection if disjoint => return Ok(Mesh::new()),
            BooleanOp::Difference if a.is_empty() => return Ok(Mesh::new()),
            BooleanOp::Difference if disjoint => return Ok(a.clone()),
            BooleanOp::Union if a.is_empty() => return Ok(b.clone()),
            BooleanOp::Union if b.is_empty() => return Ok(a.clone()),
            _ => {}
        }

        let result = Self::run(op, a, b);
        if let Err(ref e) = result {
            tracing::debug!(op = %op, error = %e, "boolean operation failed");
        }
        result
    }

    fn cleanup(&self, mesh: &Mesh) -> Result<Mesh> {
        if !mesh.is_valid() {
            return Err(Error::InvalidMesh(
                "non-finite coordinate or out-of-range index".to_string(),
            ));
        }
        Ok(repair::cleanup(mesh, self.weld_epsilon))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("csgrs panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("csgrs panicked: {}", s)
    } else {
        "csgrs panicked".to_string()
    }
}
