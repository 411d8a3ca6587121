// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline runs
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Reasons a run did not produce a report
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot load input mesh {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: puzzlecut_geometry::Error,
    },

    #[error("Cannot export {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: puzzlecut_geometry::Error,
    },

    #[error("Inconsistent face plan: {0}")]
    FacePlan(#[from] crate::roles::FaceConflict),

    #[error("Cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        PipelineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
