// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Preview snapshots
//!
//! A small orthographic, z-buffered rasteriser with flat Lambert shading.
//! Camera angles follow the usual elevation/azimuth convention: azimuth is
//! measured in the XY plane from +X, elevation from the XY plane towards +Z.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use image::{Rgb, RgbImage};
use nalgebra::{Point3, Vector3};
use std::path::{Path, PathBuf};

/// 20-colour categorical palette, assigned to pieces by export order
pub const PALETTE: [[u8; 3]; 20] = [
    [31, 119, 180],
    [174, 199, 232],
    [255, 127, 14],
    [255, 187, 120],
    [44, 160, 44],
    [152, 223, 138],
    [214, 39, 40],
    [255, 152, 150],
    [148, 103, 189],
    [197, 176, 213],
    [140, 86, 75],
    [196, 156, 148],
    [227, 119, 194],
    [247, 182, 210],
    [127, 127, 127],
    [199, 199, 199],
    [188, 189, 34],
    [219, 219, 141],
    [23, 190, 207],
    [158, 218, 229],
];

/// Colour for the `index`-th piece
pub fn palette_color(index: usize) -> [u8; 3] {
    PALETTE[index % PALETTE.len()]
}

/// Camera direction in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewAngle {
    pub elevation: f64,
    pub azimuth: f64,
}

impl ViewAngle {
    pub const fn new(elevation: f64, azimuth: f64) -> Self {
        Self { elevation, azimuth }
    }

    /// Preview file name for the `index`-th view (0-based)
    pub fn file_name(&self, index: usize) -> String {
        format!(
            "puzzle_view_{}_e{}_a{}.png",
            index + 1,
            self.elevation,
            self.azimuth
        )
    }

    /// Orthonormal (towards viewer, right, up) frame
    fn basis(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let (e, a) = (self.elevation.to_radians(), self.azimuth.to_radians());
        let forward = Vector3::new(e.cos() * a.cos(), e.cos() * a.sin(), e.sin());
        let right = Vector3::new(-a.sin(), a.cos(), 0.0);
        let up = Vector3::new(-e.sin() * a.cos(), -e.sin() * a.sin(), e.cos());
        (forward, right, up)
    }
}

/// The five standard preview angles
pub const DEFAULT_VIEWS: [ViewAngle; 5] = [
    ViewAngle::new(20.0, 30.0),
    ViewAngle::new(90.0, 0.0),
    ViewAngle::new(0.0, 0.0),
    ViewAngle::new(0.0, 90.0),
    ViewAngle::new(45.0, 45.0),
];

/// Renders coloured meshes to PNG files
#[derive(Debug, Clone)]
pub struct SnapshotRenderer {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 3],
}

impl Default for SnapshotRenderer {
    fn default() -> Self {
        Self::new(1200, 900)
    }
}

impl SnapshotRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: [255, 255, 255],
        }
    }

    fn check_scene(&self, scene: &[(&Mesh, [u8; 3])]) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Render(format!(
                "invalid image size {}x{}",
                self.width, self.height
            )));
        }
        if scene.iter().all(|(mesh, _)| mesh.is_empty()) {
            return Err(Error::Render("nothing to render".to_string()));
        }
        Ok(())
    }

    /// Render the scene from one angle
    pub fn render(&self, scene: &[(&Mesh, [u8; 3])], view: ViewAngle) -> Result<RgbImage> {
        self.check_scene(scene)?;

        let (forward, right, up) = view.basis();
        let project = |p: &Point3<f64>| {
            (
                p.coords.dot(&right),
                p.coords.dot(&up),
                p.coords.dot(&forward),
            )
        };

        let (mut min_x, mut max_x, mut min_y, mut max_y) =
            (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for (mesh, _) in scene {
            for i in 0..mesh.vertex_count() {
                let (x, y, _) = project(&mesh.position(i));
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }

        let (w, h) = (self.width as f64, self.height as f64);
        let span_x = (max_x - min_x).max(1e-9);
        let span_y = (max_y - min_y).max(1e-9);
        let scale = (w * 0.9 / span_x).min(h * 0.9 / span_y);
        let (cx, cy) = ((min_x + max_x) * 0.5, (min_y + max_y) * 0.5);
        let to_screen = |p: &Point3<f64>| {
            let (x, y, depth) = project(p);
            (w * 0.5 + (x - cx) * scale, h * 0.5 - (y - cy) * scale, depth)
        };

        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb(self.background));
        let mut depth_buffer = vec![f64::NEG_INFINITY; (self.width * self.height) as usize];

        for (mesh, color) in scene {
            for tri in mesh.triangles() {
                let edge_cross = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
                let Some(normal) = edge_cross.try_normalize(1e-12) else {
                    continue;
                };
                let shade = 0.35 + 0.65 * normal.dot(&forward).abs();
                let pixel = Rgb([
                    (color[0] as f64 * shade).round().min(255.0) as u8,
                    (color[1] as f64 * shade).round().min(255.0) as u8,
                    (color[2] as f64 * shade).round().min(255.0) as u8,
                ]);
                let screen = [to_screen(&tri[0]), to_screen(&tri[1]), to_screen(&tri[2])];
                self.fill_triangle(&mut image, &mut depth_buffer, screen, pixel);
            }
        }

        Ok(image)
    }

    fn fill_triangle(
        &self,
        image: &mut RgbImage,
        depth_buffer: &mut [f64],
        [a, b, c]: [(f64, f64, f64); 3],
        pixel: Rgb<u8>,
    ) {
        let area = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
        if area.abs() < 1e-12 {
            return;
        }

        let x0 = a.0.min(b.0).min(c.0).floor().max(0.0) as u32;
        let y0 = a.1.min(b.1).min(c.1).floor().max(0.0) as u32;
        let x1 = (a.0.max(b.0).max(c.0).ceil() as i64).min(self.width as i64 - 1);
        let y1 = (a.1.max(b.1).max(c.1).ceil() as i64).min(self.height as i64 - 1);
        if x1 < 0 || y1 < 0 {
            return;
        }

        for y in y0..=y1 as u32 {
            for x in x0..=x1 as u32 {
                let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
                let w0 = ((b.0 - px) * (c.1 - py) - (b.1 - py) * (c.0 - px)) / area;
                let w1 = ((c.0 - px) * (a.1 - py) - (c.1 - py) * (a.0 - px)) / area;
                let w2 = 1.0 - w0 - w1;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let depth = w0 * a.2 + w1 * b.2 + w2 * c.2;
                let slot = (y * self.width + x) as usize;
                if depth > depth_buffer[slot] {
                    depth_buffer[slot] = depth;
                    image.put_pixel(x, y, pixel);
                }
            }
        }
    }

    /// Render every view and write PNGs into `dir`
    ///
    /// Fails only when the scene cannot be rendered at all. A view that fails
    /// to render or save is skipped and listed in [`RenderedViews::failed`].
    pub fn render_views(
        &self,
        pieces: &[Mesh],
        views: &[ViewAngle],
        dir: &Path,
    ) -> Result<RenderedViews> {
        let scene: Vec<(&Mesh, [u8; 3])> = pieces
            .iter()
            .enumerate()
            .map(|(idx, mesh)| (mesh, palette_color(idx)))
            .collect();
        self.check_scene(&scene)?;

        let mut rendered = RenderedViews::default();
        for (idx, view) in views.iter().enumerate() {
            let path = dir.join(view.file_name(idx));
            let saved = self
                .render(&scene, *view)
                .and_then(|image| image.save(&path).map_err(Error::from));
            match saved {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "wrote preview");
                    rendered.written.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "preview skipped");
                    rendered.failed.push((path, e.to_string()));
                }
            }
        }
        Ok(rendered)
    }
}

/// Outcome of [`SnapshotRenderer::render_views`]
#[derive(Debug, Clone, Default)]
pub struct RenderedViews {
    pub written: Vec<PathBuf>,
    /// Views that could not be written, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Aabb;
    use crate::primitives::cuboid;

    #[test]
    fn test_view_file_names() {
        let names: Vec<String> = DEFAULT_VIEWS
            .iter()
            .enumerate()
            .map(|(i, v)| v.file_name(i))
            .collect();
        assert_eq!(names[0], "puzzle_view_1_e20_a30.png");
        assert_eq!(names[1], "puzzle_view_2_e90_a0.png");
        assert_eq!(names[4], "puzzle_view_5_e45_a45.png");
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), palette_color(20));
        assert_ne!(palette_color(0), palette_color(1));
    }

    #[test]
    fn test_render_draws_piece_in_centre() {
        let cube = cuboid(&Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)));
        let renderer = SnapshotRenderer::new(64, 48);
        let image = renderer
            .render(&[(&cube, PALETTE[0])], ViewAngle::new(90.0, 0.0))
            .unwrap();
        assert_eq!(image.dimensions(), (64, 48));
        assert_ne!(image.get_pixel(32, 24).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_render_rejects_empty_scene() {
        let renderer = SnapshotRenderer::new(16, 16);
        assert!(renderer.render(&[], DEFAULT_VIEWS[0]).is_err());
    }

    #[test]
    fn test_render_views_writes_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let cube = cuboid(&Aabb::new(Point3::origin(), Point3::new(1.0, 2.0, 1.0)));
        let renderer = SnapshotRenderer::new(32, 32);
        let rendered = renderer
            .render_views(&[cube], &DEFAULT_VIEWS, dir.path())
            .unwrap();
        assert_eq!(rendered.written.len(), 5);
        assert!(rendered.failed.is_empty());
        assert!(rendered.written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_unwritable_view_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the second preview should go
        let blocked = dir.path().join(DEFAULT_VIEWS[1].file_name(1));
        std::fs::create_dir(&blocked).unwrap();

        let cube = cuboid(&Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)));
        let rendered = SnapshotRenderer::new(32, 32)
            .render_views(&[cube], &DEFAULT_VIEWS, dir.path())
            .unwrap();
        assert_eq!(rendered.written.len(), 4);
        assert!(!rendered.written.contains(&blocked));
        assert_eq!(rendered.failed.len(), 1);
        assert_eq!(rendered.failed[0].0, blocked);
        assert!(rendered.written.iter().all(|p| p.is_file()));
    }

    #[test]
    fn test_render_views_rejects_zero_size() {
        let dir = tempfile::tempdir().unwrap();
        let cube = cuboid(&Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)));
        let result = SnapshotRenderer::new(0, 0).render_views(&[cube], &DEFAULT_VIEWS, dir.path());
        assert!(matches!(result, Err(Error::Render(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
