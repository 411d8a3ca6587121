// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run configuration from command-line arguments and `PUZZLECUT_*`
//! environment variables.

use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use puzzlecut_processing::{
    Divisions, MatingMode, PipelineOptions, PuzzleParams, StyleSelection, Tessellation,
};
use std::path::PathBuf;

/// Cut a closed STL solid into a grid of interlocking printable pieces.
#[derive(Debug, Parser)]
#[command(name = "puzzlecut")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cut a closed STL solid into interlocking printable pieces", long_about = None)]
pub struct CliArgs {
    /// Input STL mesh.
    #[arg(env = "PUZZLECUT_INPUT")]
    pub input: PathBuf,

    /// Cells along X, Y and Z.
    #[arg(long, num_args = 3, value_names = ["NX", "NY", "NZ"], default_values_t = [2, 2, 2])]
    pub divisions: Vec<usize>,

    /// Interlocks on every internal face.
    #[arg(long, env = "PUZZLECUT_LOCKS_PER_FACE", default_value_t = 3)]
    pub locks_per_face: usize,

    #[arg(long, env = "PUZZLECUT_CYL_RADIUS", default_value_t = 0.3)]
    pub cyl_radius: f64,

    #[arg(long, env = "PUZZLECUT_CYL_HEIGHT", default_value_t = 0.5)]
    pub cyl_height: f64,

    #[arg(long, env = "PUZZLECUT_SPHERE_RADIUS", default_value_t = 0.4)]
    pub sphere_radius: f64,

    /// Socket scale relative to the key (> 1).
    #[arg(long, env = "PUZZLECUT_SOCKET_TOLERANCE", default_value_t = 1.06)]
    pub socket_tolerance: f64,

    /// Seed for interlock placement.
    #[arg(long, env = "PUZZLECUT_SEED", default_value_t = 42)]
    pub seed: u64,

    #[arg(long, env = "PUZZLECUT_OUTPUT_DIR", default_value = "printable_puzzle")]
    pub output_dir: PathBuf,

    /// Border fraction of each face kept free of interlocks.
    #[arg(long, env = "PUZZLECUT_EDGE_MARGIN", default_value_t = 0.2)]
    pub edge_margin: f64,

    /// standard, tapered, double-dome, keyhole or alternating.
    #[arg(long, env = "PUZZLECUT_STYLE", default_value = "standard", value_parser = parse_style)]
    pub style: StyleSelection,

    /// owner-only or complementary.
    #[arg(long, env = "PUZZLECUT_MATING", default_value = "owner-only", value_parser = parse_mating)]
    pub mating: MatingMode,

    /// Side count of interlock cylinders.
    #[arg(long, env = "PUZZLECUT_CYLINDER_SECTIONS", default_value_t = 24)]
    pub cylinder_sections: usize,

    /// Subdivision level of interlock domes.
    #[arg(long, env = "PUZZLECUT_SPHERE_SUBDIVISIONS", default_value_t = 2)]
    pub sphere_subdivisions: u32,

    /// Assemble cells in parallel.
    #[arg(long, env = "PUZZLECUT_PARALLEL")]
    pub parallel: bool,

    /// Worker threads for --parallel (defaults to the CPU count).
    #[arg(long, env = "PUZZLECUT_WORKERS")]
    pub workers: Option<usize>,

    /// Skip the preview images.
    #[arg(long, env = "PUZZLECUT_NO_RENDER")]
    pub no_render: bool,

    /// Preview size as WIDTHxHEIGHT.
    #[arg(long, env = "PUZZLECUT_IMAGE_SIZE", default_value = "1200x900")]
    pub image_size: String,

    /// trace, debug, info, warn or error.
    #[arg(short, long, env = "PUZZLECUT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "PUZZLECUT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

fn parse_style(s: &str) -> Result<StyleSelection, String> {
    s.parse()
}

fn parse_mating(s: &str) -> Result<MatingMode, String> {
    s.parse()
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_image_size(s: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::ImageSize(s.to_string());
    let lower = s.to_ascii_lowercase();
    let (w, h) = lower.split_once('x').ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

/// Validated log level name.
pub fn parse_log_level(s: &str) -> Result<&'static str, ConfigError> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" => Ok("warn"),
        "error" => Ok("error"),
        _ => Err(ConfigError::LogLevel(s.to_string())),
    }
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub params: PuzzleParams,
    pub options: PipelineOptions,
}

impl Config {
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut params = PuzzleParams::new(args.input.clone());
        // clap guarantees exactly three values
        if let [nx, ny, nz] = args.divisions[..] {
            params.divisions = Divisions::new(nx, ny, nz);
        }
        params.locks_per_face = args.locks_per_face;
        params.cyl_radius = args.cyl_radius;
        params.cyl_height = args.cyl_height;
        params.sphere_radius = args.sphere_radius;
        params.socket_tolerance = args.socket_tolerance;
        params.seed = args.seed;
        params.output_dir = args.output_dir.clone();
        params.edge_margin = args.edge_margin;
        params.style = args.style;
        params.mating = args.mating;
        params.tessellation = Tessellation {
            cylinder_sections: args.cylinder_sections,
            sphere_subdivisions: args.sphere_subdivisions,
        };

        let worker_threads = match args.workers {
            Some(0) => return Err(ConfigError::NoWorkers),
            Some(n) => Some(n),
            None if args.parallel => Some(num_cpus::get()),
            None => None,
        };

        let options = PipelineOptions {
            parallel: args.parallel,
            worker_threads,
            render: !args.no_render,
            image_size: parse_image_size(&args.image_size)?,
            ..Default::default()
        };

        Ok(Self { params, options })
    }
}
