// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! puzzlecut geometry
//!
//! Triangle meshes, primitive solids, csgrs-backed booleans, mesh repair,
//! STL I/O and preview rendering for the puzzle decomposition pipeline.

pub mod bounds;
pub mod csg;
pub mod error;
pub mod kernel;
pub mod mesh;
pub mod primitives;
pub mod render;
pub mod repair;
pub mod stl;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector3};

pub use bounds::{Aabb, Axis};
pub use csg::CsgKernel;
pub use error::{Error, Result};
pub use kernel::{BooleanOp, SolidKernel};
pub use mesh::Mesh;
pub use render::{RenderedViews, SnapshotRenderer, ViewAngle, DEFAULT_VIEWS, PALETTE};
pub use repair::{RepairParams, RepairSummary};
pub use triangulation::triangulate_polygon;
