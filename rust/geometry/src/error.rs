// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("STL error: {0}")]
    Stl(String),

    #[error("Empty mesh: {0}")]
    EmptyMesh(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Boolean {op} failed: {reason}")]
    BooleanFailed { op: &'static str, reason: String },

    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Hole filling failed: {0}")]
    HoleFill(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
