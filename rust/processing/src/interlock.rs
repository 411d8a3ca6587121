// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interlock geometry
//!
//! Every interlock is modelled along local +Z with its base disc at the
//! origin, then scaled (sockets only), rotated onto the face axis, pushed
//! along that axis and moved to the instance centre.

use crate::grid::CellIndex;
use crate::roles::Role;
use puzzlecut_geometry::primitives::{cone, cylinder, icosphere};
use puzzlecut_geometry::{Axis, Matrix4, Mesh, Point3, SolidKernel, Vector3};
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Interlock shape family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterlockStyle {
    /// Cylinder capped by a dome
    Standard,
    /// Cylinder, cone and a smaller dome at the tip
    Tapered,
    /// Domes on both ends of the cylinder
    DoubleDome,
    /// Cylinder with a dome stretched along the axis
    Keyhole,
}

impl InterlockStyle {
    pub const ALL: [InterlockStyle; 4] = [
        InterlockStyle::Standard,
        InterlockStyle::Tapered,
        InterlockStyle::DoubleDome,
        InterlockStyle::Keyhole,
    ];

    /// Fraction of the cylinder height the shape is pushed back from the face
    pub fn offset_factor(self) -> f64 {
        match self {
            InterlockStyle::Standard | InterlockStyle::Tapered => 0.8,
            InterlockStyle::DoubleDome => 0.6,
            InterlockStyle::Keyhole => 0.7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InterlockStyle::Standard => "standard",
            InterlockStyle::Tapered => "tapered",
            InterlockStyle::DoubleDome => "double-dome",
            InterlockStyle::Keyhole => "keyhole",
        }
    }
}

impl fmt::Display for InterlockStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a face picks its interlock style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleSelection {
    Fixed(InterlockStyle),
    /// Cycle through all styles by owner cell
    Alternating,
}

impl StyleSelection {
    pub fn style_for(&self, owner: CellIndex) -> InterlockStyle {
        match self {
            StyleSelection::Fixed(style) => *style,
            StyleSelection::Alternating => {
                InterlockStyle::ALL[(owner.i + 2 * owner.j + 3 * owner.k) % 4]
            }
        }
    }
}

impl Default for StyleSelection {
    fn default() -> Self {
        StyleSelection::Fixed(InterlockStyle::Standard)
    }
}

impl FromStr for StyleSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("alternating") {
            return Ok(StyleSelection::Alternating);
        }
        InterlockStyle::ALL
            .into_iter()
            .find(|style| {
                style.name().eq_ignore_ascii_case(s) || style.name().replace('-', "_") == s
            })
            .map(StyleSelection::Fixed)
            .ok_or_else(|| {
                format!(
                    "unknown style '{}', expected standard, tapered, double-dome, keyhole or alternating",
                    s
                )
            })
    }
}

impl fmt::Display for StyleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleSelection::Fixed(style) => write!(f, "{}", style),
            StyleSelection::Alternating => f.write_str("alternating"),
        }
    }
}

/// Physical interlock size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterlockDimensions {
    pub cyl_radius: f64,
    pub cyl_height: f64,
    pub sphere_radius: f64,
    /// Uniform scale applied to sockets
    pub socket_tolerance: f64,
}

impl Default for InterlockDimensions {
    fn default() -> Self {
        Self {
            cyl_radius: 0.3,
            cyl_height: 0.5,
            sphere_radius: 0.4,
            socket_tolerance: 1.06,
        }
    }
}

/// Primitive resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tessellation {
    pub cylinder_sections: usize,
    pub sphere_subdivisions: u32,
}

impl Default for Tessellation {
    fn default() -> Self {
        Self {
            cylinder_sections: 24,
            sphere_subdivisions: 2,
        }
    }
}

/// Everything needed to place one interlock solid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterlockSpec {
    pub center: Point3<f64>,
    pub axis: Axis,
    pub role: Role,
    pub style: InterlockStyle,
    /// Push towards +axis instead of -axis
    pub flip_dir: bool,
}

/// Builds placed interlock meshes
#[derive(Debug, Clone)]
pub struct InterlockBuilder {
    dimensions: InterlockDimensions,
    tessellation: Tessellation,
}

impl InterlockBuilder {
    pub fn new(dimensions: InterlockDimensions, tessellation: Tessellation) -> Self {
        Self {
            dimensions,
            tessellation,
        }
    }

    /// Placed interlock solid for one instance
    pub fn build(&self, spec: &InterlockSpec, kernel: &dyn SolidKernel) -> Mesh {
        let mut mesh = self.base_shape(spec.style, kernel);
        mesh.transform(&self.placement(spec));
        mesh
    }

    /// World transform: scale, orient, offset, then translate
    ///
    /// Sockets pushed towards -axis scale about the face plane; sockets pushed
    /// into the neighbour scale about their base.
    pub fn placement(&self, spec: &InterlockSpec) -> Matrix4<f64> {
        let push = spec.style.offset_factor() * self.dimensions.cyl_height;
        let scale = match (spec.role, spec.flip_dir) {
            (Role::Key, _) => Matrix4::identity(),
            (Role::Socket, true) => Matrix4::new_scaling(self.dimensions.socket_tolerance),
            (Role::Socket, false) => {
                let pivot = Vector3::new(0.0, 0.0, push);
                Matrix4::new_translation(&pivot)
                    * Matrix4::new_scaling(self.dimensions.socket_tolerance)
                    * Matrix4::new_translation(&-pivot)
            }
        };
        let orient = match spec.axis {
            Axis::X => Matrix4::from_scaled_axis(Vector3::y() * FRAC_PI_2),
            Axis::Y => Matrix4::from_scaled_axis(Vector3::x() * -FRAC_PI_2),
            Axis::Z => Matrix4::identity(),
        };
        let direction = if spec.flip_dir { 1.0 } else { -1.0 };
        let offset = spec.axis.unit() * (push * direction);

        Matrix4::new_translation(&(spec.center.coords + offset)) * orient * scale
    }

    /// Unplaced shape in the local frame
    pub fn base_shape(&self, style: InterlockStyle, kernel: &dyn SolidKernel) -> Mesh {
        let InterlockDimensions {
            cyl_radius: r,
            cyl_height: h,
            sphere_radius: s,
            ..
        } = self.dimensions;
        let Tessellation {
            cylinder_sections,
            sphere_subdivisions,
        } = self.tessellation;

        let dome = |radius: f64, z: f64| {
            let mut sphere = icosphere(radius, sphere_subdivisions);
            sphere.translate(Vector3::new(0.0, 0.0, z));
            sphere
        };

        let body = cylinder(r, h, cylinder_sections);
        let parts = match style {
            InterlockStyle::Standard => vec![dome(s, h)],
            InterlockStyle::Tapered => {
                let mut taper = cone(r, 0.3 * h, cylinder_sections);
                taper.translate(Vector3::new(0.0, 0.0, h));
                vec![taper, dome(0.8 * s, 1.3 * h)]
            }
            InterlockStyle::DoubleDome => vec![dome(s, h), dome(0.7 * s, 0.0)],
            InterlockStyle::Keyhole => {
                let mut lobe = icosphere(s, sphere_subdivisions);
                lobe.transform(&Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, 1.3)));
                lobe.translate(Vector3::new(0.0, 0.0, h));
                vec![lobe]
            }
        };

        parts.iter().fold(body, |acc, part| fuse(kernel, acc, part, style))
    }
}

/// Union two parts; on failure keep them as touching, separate shells
fn fuse(kernel: &dyn SolidKernel, acc: Mesh, part: &Mesh, style: InterlockStyle) -> Mesh {
    match kernel.union(&acc, part) {
        Ok(fused) if !fused.is_empty() => fused,
        Ok(_) => {
            debug!(%style, "interlock union came back empty, concatenating parts");
            concat(acc, part)
        }
        Err(e) => {
            debug!(%style, error = %e, "interlock union failed, concatenating parts");
            concat(acc, part)
        }
    }
}

fn concat(mut acc: Mesh, part: &Mesh) -> Mesh {
    acc.merge(part);
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use puzzlecut_geometry::{BooleanOp, CsgKernel, Error, Result};

    /// Kernel whose booleans always fail
    struct BrokenKernel;

    impl SolidKernel for BrokenKernel {
        fn boolean(&self, op: BooleanOp, _a: &Mesh, _b: &Mesh) -> Result<Mesh> {
            Err(Error::BooleanFailed {
                op: op.name(),
                reason: "broken".into(),
            })
        }

        fn cleanup(&self, mesh: &Mesh) -> Result<Mesh> {
            Ok(mesh.clone())
        }
    }

    fn spec(axis: Axis, role: Role, flip_dir: bool) -> InterlockSpec {
        InterlockSpec {
            center: Point3::new(1.0, 2.0, 3.0),
            axis,
            role,
            style: InterlockStyle::Standard,
            flip_dir,
        }
    }

    fn builder() -> InterlockBuilder {
        InterlockBuilder::new(InterlockDimensions::default(), Tessellation::default())
    }

    #[test]
    fn test_standard_key_spans_face_along_axis() {
        let kernel = CsgKernel::new();
        for axis in Axis::ALL {
            let mesh = builder().build(&spec(axis, Role::Key, false), &kernel);
            let bounds = mesh.bounds();
            let (lo, hi) = bounds.range(axis);
            let c = Point3::new(1.0, 2.0, 3.0)[axis.index()];
            // Base 0.8*h behind the face, dome tip h*0.2 + r in front
            assert_relative_eq!(lo, c - 0.4, epsilon = 1e-5);
            assert_relative_eq!(hi, c + 0.1 + 0.4, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_socket_is_larger_than_key() {
        let kernel = CsgKernel::new();
        let b = builder();
        let key = b.build(&spec(Axis::X, Role::Key, false), &kernel);
        let socket = b.build(&spec(Axis::X, Role::Socket, true), &kernel);
        assert!(socket.volume() > key.volume());
        let (klo, khi) = key.bounds().range(Axis::X);
        let (slo, shi) = socket.bounds().range(Axis::X);
        assert!(shi - slo > khi - klo);
        // flip_dir pushes the socket into the neighbour
        assert_relative_eq!(slo, 1.0 + 0.4, epsilon = 1e-5);
    }

    #[test]
    fn test_mated_socket_clears_key_on_both_ends() {
        let b = builder();
        let kernel = BrokenKernel;
        for style in InterlockStyle::ALL {
            for axis in Axis::ALL {
                let at = |role| InterlockSpec {
                    style,
                    ..spec(axis, role, false)
                };
                let (klo, khi) = b.build(&at(Role::Key), &kernel).bounds().range(axis);
                let (slo, shi) = b.build(&at(Role::Socket), &kernel).bounds().range(axis);
                assert!(slo < klo - 1e-3, "{} {:?}: {} vs {}", style, axis, slo, klo);
                assert!(shi > khi + 1e-3, "{} {:?}: {} vs {}", style, axis, shi, khi);
            }
        }
    }

    #[test]
    fn test_mated_socket_keeps_face_plane_fixed() {
        // Scaling about the face plane: base 0.8*h*1.06 behind the face
        let s = builder().placement(&spec(Axis::Z, Role::Socket, false));
        let base = s.transform_point(&Point3::origin());
        assert_relative_eq!(base.z, 3.0 - 0.4 * 1.06, epsilon = 1e-9);
        let face = s.transform_point(&Point3::new(0.0, 0.0, 0.4));
        assert_relative_eq!(face.z, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_union_failure_falls_back_to_concatenation() {
        let b = builder();
        let fused = b.base_shape(InterlockStyle::Standard, &CsgKernel::new());
        let loose = b.base_shape(InterlockStyle::Standard, &BrokenKernel);
        let sections = Tessellation::default().cylinder_sections;
        assert_eq!(loose.triangle_count(), sections * 4 + 320);
        assert!(!fused.is_empty());
        assert_relative_eq!(
            loose.bounds().max.z,
            fused.bounds().max.z,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let kernel = CsgKernel::new();
        let s = spec(Axis::Z, Role::Socket, true);
        let a = builder().build(&s, &kernel);
        let b = builder().build(&s, &kernel);
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn test_style_extents() {
        let b = builder();
        let kernel = BrokenKernel;
        let h = 0.5;
        let tapered = b.base_shape(InterlockStyle::Tapered, &kernel).bounds();
        assert_relative_eq!(tapered.max.z, 1.3 * h + 0.8 * 0.4, epsilon = 1e-5);
        let double = b.base_shape(InterlockStyle::DoubleDome, &kernel).bounds();
        assert_relative_eq!(double.min.z, -0.7 * 0.4, epsilon = 1e-5);
        let keyhole = b.base_shape(InterlockStyle::Keyhole, &kernel).bounds();
        assert_relative_eq!(keyhole.max.z, h + 1.3 * 0.4, epsilon = 1e-5);
    }

    #[test]
    fn test_style_selection() {
        assert_eq!(
            StyleSelection::Alternating.style_for(CellIndex::new(1, 0, 0)),
            InterlockStyle::Tapered
        );
        assert_eq!(
            StyleSelection::Alternating.style_for(CellIndex::new(0, 1, 1)),
            InterlockStyle::Keyhole
        );
        assert_eq!(
            "double-dome".parse::<StyleSelection>().unwrap(),
            StyleSelection::Fixed(InterlockStyle::DoubleDome)
        );
        assert_eq!(
            "alternating".parse::<StyleSelection>().unwrap(),
            StyleSelection::Alternating
        );
        assert!("wobbly".parse::<StyleSelection>().is_err());
    }
}
