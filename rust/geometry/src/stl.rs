// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STL import/export via `stl_io`
//!
//! Both ASCII and binary files are accepted on load; output is always
//! binary STL with per-face normals.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use stl_io::{Normal, Triangle, Vertex};

/// Load a mesh from an STL file
pub fn load_stl(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::new(file);
    let indexed = stl_io::read_stl(&mut reader)
        .map_err(|e| Error::Stl(format!("{}: {}", path.display(), e)))?;

    if indexed.faces.is_empty() {
        return Err(Error::EmptyMesh(format!("{} has no facets", path.display())));
    }

    let mut mesh = Mesh::with_capacity(indexed.vertices.len(), indexed.faces.len() * 3);
    for v in &indexed.vertices {
        mesh.add_vertex(
            Point3::new(v[0] as f64, v[1] as f64, v[2] as f64),
            Vector3::z(),
        );
    }
    for face in &indexed.faces {
        let [a, b, c] = face.vertices;
        if a >= indexed.vertices.len() || b >= indexed.vertices.len() || c >= indexed.vertices.len()
        {
            return Err(Error::InvalidMesh(format!(
                "{}: facet references missing vertex",
                path.display()
            )));
        }
        mesh.add_triangle(a as u32, b as u32, c as u32);
    }
    mesh.recompute_normals();

    if !mesh.is_valid() {
        return Err(Error::InvalidMesh(format!(
            "{} contains non-finite coordinates",
            path.display()
        )));
    }

    tracing::debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "loaded STL"
    );
    Ok(mesh)
}

/// Write a mesh as binary STL
pub fn save_stl(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if mesh.is_empty() {
        return Err(Error::EmptyMesh(format!(
            "refusing to write {} with no triangles",
            path.display()
        )));
    }

    let triangles: Vec<Triangle> = mesh
        .triangles()
        .map(|[a, b, c]| {
            let n = (b - a).cross(&(c - a)).try_normalize(1e-12).unwrap_or_else(Vector3::z);
            Triangle {
                normal: Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [
                    Vertex::new([a.x as f32, a.y as f32, a.z as f32]),
                    Vertex::new([b.x as f32, b.y as f32, b.z as f32]),
                    Vertex::new([c.x as f32, c.y as f32, c.z as f32]),
                ],
            }
        })
        .collect();

    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| Error::io(path, e))?;
    writer.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}
