// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Primitive solids
//!
//! All primitives are closed, outward-wound triangle meshes. Cylinders and
//! cones are built along +Z starting at the origin; spheres are centred on
//! the origin.

use crate::bounds::Aabb;
use crate::mesh::Mesh;
use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;
use std::f64::consts::TAU;

/// Create a box mesh from AABB min/max bounds
/// Returns a mesh with 12 triangles (2 per face, 6 faces)
pub fn cuboid(bounds: &Aabb) -> Mesh {
    let (min, max) = (bounds.min, bounds.max);
    let v0 = Point3::new(min.x, min.y, min.z);
    let v1 = Point3::new(max.x, min.y, min.z);
    let v2 = Point3::new(max.x, max.y, min.z);
    let v3 = Point3::new(min.x, max.y, min.z);
    let v4 = Point3::new(min.x, min.y, max.z);
    let v5 = Point3::new(max.x, min.y, max.z);
    let v6 = Point3::new(max.x, max.y, max.z);
    let v7 = Point3::new(min.x, max.y, max.z);

    Mesh::from_triangles([
        // z = min
        [v0, v2, v1],
        [v0, v3, v2],
        // z = max
        [v4, v5, v6],
        [v4, v6, v7],
        // x = min
        [v0, v4, v7],
        [v0, v7, v3],
        // x = max
        [v1, v2, v6],
        [v1, v6, v5],
        // y = min
        [v0, v1, v5],
        [v0, v5, v4],
        // y = max
        [v3, v7, v6],
        [v3, v6, v2],
    ])
}

fn ring(radius: f64, z: f64, sections: usize) -> Vec<Point3<f64>> {
    (0..sections)
        .map(|s| {
            let theta = TAU * s as f64 / sections as f64;
            Point3::new(radius * theta.cos(), radius * theta.sin(), z)
        })
        .collect()
}

/// Closed cylinder from z = 0 to z = `height`
pub fn cylinder(radius: f64, height: f64, sections: usize) -> Mesh {
    let sections = sections.max(3);
    let bottom = ring(radius, 0.0, sections);
    let top = ring(radius, height, sections);
    let bottom_center = Point3::origin();
    let top_center = Point3::new(0.0, 0.0, height);

    let mut mesh = Mesh::with_capacity(sections * 12, sections * 12);
    for s in 0..sections {
        let n = (s + 1) % sections;
        mesh.push_triangle([bottom_center, bottom[n], bottom[s]]);
        mesh.push_triangle([top_center, top[s], top[n]]);
        mesh.push_triangle([bottom[s], bottom[n], top[n]]);
        mesh.push_triangle([bottom[s], top[n], top[s]]);
    }
    mesh
}

/// Closed cone with its base disc at z = 0 and apex at z = `height`
pub fn cone(radius: f64, height: f64, sections: usize) -> Mesh {
    let sections = sections.max(3);
    let base = ring(radius, 0.0, sections);
    let apex = Point3::new(0.0, 0.0, height);
    let center = Point3::origin();

    let mut mesh = Mesh::with_capacity(sections * 6, sections * 6);
    for s in 0..sections {
        let n = (s + 1) % sections;
        mesh.push_triangle([center, base[n], base[s]]);
        mesh.push_triangle([base[s], base[n], apex]);
    }
    mesh
}

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Geodesic sphere made by subdividing an icosahedron.
///
/// `subdivisions = 0` is the bare icosahedron (20 faces); each level
/// quadruples the face count.
pub fn icosphere(radius: f64, subdivisions: u32) -> Mesh {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let mut vertices: Vec<Vector3<f64>> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vector3::new(x, y, z).normalize())
    .collect();
    let mut faces: Vec<[u32; 3]> = ICOSAHEDRON_FACES.to_vec();

    for _ in 0..subdivisions {
        let mut midpoints: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        let mut midpoint = |a: u32, b: u32, vertices: &mut Vec<Vector3<f64>>| -> u32 {
            let key = if a < b { (a, b) } else { (b, a) };
            *midpoints.entry(key).or_insert_with(|| {
                let mid = (vertices[a as usize] + vertices[b as usize]).normalize();
                vertices.push(mid);
                (vertices.len() - 1) as u32
            })
        };

        let mut next = Vec::with_capacity(faces.len() * 4);
        for &[a, b, c] in &faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            next.push([a, ab, ca]);
            next.push([b, bc, ab]);
            next.push([c, ca, bc]);
            next.push([ab, bc, ca]);
        }
        faces = next;
    }

    let mut mesh = Mesh::with_capacity(vertices.len(), faces.len() * 3);
    for v in &vertices {
        mesh.add_vertex(Point3::from(v * radius), *v);
    }
    for [a, b, c] in faces {
        mesh.add_triangle(a, b, c);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_cuboid_is_outward_wound() {
        let cube = cuboid(&Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)));
        assert_eq!(cube.triangle_count(), 12);
        assert_relative_eq!(cube.volume(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cylinder_volume_approaches_analytic() {
        let cyl = cylinder(1.0, 2.0, 64);
        let analytic = PI * 2.0;
        assert!(cyl.volume() > 0.0);
        assert!((cyl.volume() - analytic).abs() / analytic < 0.01);
        let b = cyl.bounds();
        assert_relative_eq!(b.min.z, 0.0);
        assert_relative_eq!(b.max.z, 2.0);
    }

    #[test]
    fn test_cone_volume_positive() {
        let c = cone(1.0, 3.0, 48);
        let analytic = PI / 3.0 * 3.0;
        assert!((c.volume() - analytic).abs() / analytic < 0.02);
    }

    #[test]
    fn test_icosphere_face_counts() {
        assert_eq!(icosphere(1.0, 0).triangle_count(), 20);
        assert_eq!(icosphere(1.0, 1).triangle_count(), 80);
        let sphere = icosphere(1.0, 2);
        assert_eq!(sphere.triangle_count(), 320);
        assert_eq!(sphere.vertex_count(), 162);
    }

    #[test]
    fn test_icosphere_radius_and_volume() {
        let sphere = icosphere(0.5, 3);
        for i in 0..sphere.vertex_count() {
            assert_relative_eq!(sphere.position(i).coords.norm(), 0.5, epsilon = 1e-6);
        }
        let analytic = 4.0 / 3.0 * PI * 0.125;
        assert!((sphere.volume() - analytic).abs() / analytic < 0.03);
    }
}
