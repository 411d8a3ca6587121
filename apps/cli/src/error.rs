// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line option errors.

use thiserror::Error;

/// Option values clap accepted but the run cannot use.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid image size '{0}': expected WIDTHxHEIGHT, e.g. 1200x900")]
    ImageSize(String),

    #[error("Invalid log level '{0}': expected trace, debug, info, warn or error")]
    LogLevel(String),

    #[error("Worker count must be at least 1")]
    NoWorkers,
}
