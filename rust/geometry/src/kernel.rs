// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solid kernel trait
//!
//! The decomposition code talks to boolean operations only through this
//! trait, so every call site gets a `Result` it must handle and tests can
//! swap in a kernel that fails on demand.

use crate::{Mesh, Result};
use std::fmt;

/// Boolean operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    Intersection,
    Union,
    Difference,
}

impl BooleanOp {
    pub fn name(self) -> &'static str {
        match self {
            BooleanOp::Intersection => "intersection",
            BooleanOp::Union => "union",
            BooleanOp::Difference => "difference",
        }
    }
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fallible boolean and clean-up operations on closed meshes
pub trait SolidKernel: Send + Sync {
    /// Run one boolean operation
    fn boolean(&self, op: BooleanOp, a: &Mesh, b: &Mesh) -> Result<Mesh>;

    /// Revalidate a mesh and drop degenerate/duplicate faces
    fn cleanup(&self, mesh: &Mesh) -> Result<Mesh>;

    fn intersection(&self, a: &Mesh, b: &Mesh) -> Result<Mesh> {
        self.boolean(BooleanOp::Intersection, a, b)
    }

    fn union(&self, a: &Mesh, b: &Mesh) -> Result<Mesh> {
        self.boolean(BooleanOp::Union, a, b)
    }

    fn difference(&self, a: &Mesh, b: &Mesh) -> Result<Mesh> {
        self.boolean(BooleanOp::Difference, a, b)
    }
}

impl<K: SolidKernel + ?Sized> SolidKernel for &K {
    fn boolean(&self, op: BooleanOp, a: &Mesh, b: &Mesh) -> Result<Mesh> {
        (**self).boolean(op, a, b)
    }

    fn cleanup(&self, mesh: &Mesh) -> Result<Mesh> {
        (**self).cleanup(mesh)
    }
}
