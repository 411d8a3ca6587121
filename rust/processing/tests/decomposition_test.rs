// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full runs of the decomposition pipeline on small box solids

use approx::assert_relative_eq;
use puzzlecut_geometry::primitives::cuboid;
use puzzlecut_geometry::stl::{load_stl, save_stl};
use puzzlecut_geometry::{Aabb, BooleanOp, CsgKernel, Mesh, Point3, SolidKernel};
use puzzlecut_processing::{
    DecompositionPipeline, Divisions, InterlockOutcome, MatingMode, PieceStatus, PipelineOptions,
    ProgressUpdate, PuzzleParams, PuzzleReport, Role, Tessellation,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

fn write_solid(dir: &Path, solid: &Mesh) -> std::path::PathBuf {
    let path = dir.join("input.stl");
    save_stl(solid, &path).unwrap();
    path
}

fn cube(min: [f64; 3], max: [f64; 3]) -> Mesh {
    cuboid(&Aabb::new(
        Point3::new(min[0], min[1], min[2]),
        Point3::new(max[0], max[1], max[2]),
    ))
}

/// Small interlocks sized for a unit cube
fn unit_params(dir: &Path, solid: &Mesh, divisions: Divisions) -> PuzzleParams {
    let mut params = PuzzleParams::new(write_solid(dir, solid));
    params.output_dir = dir.join("out");
    params.divisions = divisions;
    params.locks_per_face = 1;
    params.cyl_radius = 0.06;
    params.cyl_height = 0.1;
    params.sphere_radius = 0.08;
    params.tessellation = Tessellation {
        cylinder_sections: 12,
        sphere_subdivisions: 1,
    };
    params
}

fn no_render() -> PipelineOptions {
    PipelineOptions {
        render: false,
        ..Default::default()
    }
}

fn centers(report: &PuzzleReport) -> Vec<[f64; 3]> {
    report
        .outcomes
        .iter()
        .flat_map(|o| o.interlocks.iter().map(|r| r.center))
        .collect()
}

#[test]
fn test_unit_cube_two_by_two_by_two() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([0.0; 3], [1.0; 3]);
    let params = unit_params(dir.path(), &solid, Divisions::new(2, 2, 2));

    let pipeline = DecompositionPipeline::new(CsgKernel::new(), no_render());
    let report = pipeline.run(&params, None).unwrap();

    assert_eq!(report.mesh_info.total_possible_pieces, 8);
    assert_eq!(report.outcomes.len(), 8);
    assert_eq!(report.mesh_info.piece_count, 8);
    assert_eq!(report.pieces.len(), 8);
    assert_eq!(report.empty_count, 0);
    assert_eq!(report.failed_count, 0);
    assert_eq!(report.mesh_info.success_rate, 1.0);
    assert_eq!(report.mesh_info.success_rate_percent, "100.0%");
    assert!(report.mesh_info.watertight);
    assert!(report.repaired_mesh.exists());
    assert!(report.previews.is_empty());

    // 12 internal faces, one instance each, applied by the owner only
    assert_eq!(report.interlocks_attempted, 12);
    let records: Vec<_> = report.outcomes.iter().flat_map(|o| &o.interlocks).collect();
    assert_eq!(records.len(), 12);
    for record in &records {
        assert_eq!(record.n, 0);
        let c = record.center;
        assert_eq!(c[record.axis.index()], 0.5);
    }

    // Owner (0,0,0) has even parity, so its three faces carry keys
    let origin = &report.outcomes[0];
    assert!(origin.interlocks.iter().all(|r| r.role == Role::Key));
    // Owner (1,0,0) has odd parity
    let odd = report
        .outcomes
        .iter()
        .find(|o| (o.cell.i, o.cell.j, o.cell.k) == (1, 0, 0))
        .unwrap();
    assert!(odd.interlocks.iter().all(|r| r.role == Role::Socket));

    assert!(report.pieces[0].ends_with("piece_0_0_0.stl"));
    assert!(report.pieces[7].ends_with("piece_1_1_1.stl"));
    for path in &report.pieces {
        assert!(load_stl(path).unwrap().triangle_count() > 0);
    }
}

#[test]
fn test_single_cell_is_the_whole_solid() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([-1.0, 0.0, 2.0], [1.0, 3.0, 3.0]);
    let params = unit_params(dir.path(), &solid, Divisions::new(1, 1, 1));

    let pipeline = DecompositionPipeline::new(CsgKernel::new(), no_render());
    let report = pipeline.run(&params, None).unwrap();

    assert_eq!(report.mesh_info.piece_count, 1);
    assert_eq!(report.interlocks_attempted, 0);
    assert_eq!(report.mesh_info.bounds_min, [-1.0, 0.0, 2.0]);
    assert_eq!(report.mesh_info.bounds_max, [1.0, 3.0, 3.0]);
    let piece = load_stl(&report.pieces[0]).unwrap();
    assert_relative_eq!(piece.volume(), 6.0, epsilon = 1e-4);
}

#[test]
fn test_cells_outside_the_solid_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    // Two cubes on a diagonal leave two of four cells empty
    let mut solid = cube([0.0; 3], [1.0; 3]);
    solid.merge(&cube([2.0, 2.0, 0.0], [3.0, 3.0, 1.0]));
    let params = unit_params(dir.path(), &solid, Divisions::new(2, 2, 1));

    let pipeline = DecompositionPipeline::new(CsgKernel::new(), no_render());
    let report = pipeline.run(&params, None).unwrap();

    assert_eq!(report.mesh_info.total_possible_pieces, 4);
    assert_eq!(report.mesh_info.piece_count, 2);
    assert_eq!(report.empty_count, 2);
    assert_eq!(report.failed_count, 0);
    assert_eq!(report.mesh_info.success_rate, 0.5);
    assert_eq!(report.mesh_info.success_rate_percent, "50.0%");

    let statuses: Vec<PieceStatus> = report.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            PieceStatus::Exported,
            PieceStatus::Empty,
            PieceStatus::Empty,
            PieceStatus::Exported
        ]
    );
    assert!(report.failures().next().is_none());
}

#[test]
fn test_same_seed_reproduces_and_parallel_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([0.0; 3], [1.0; 3]);
    let mut params = unit_params(dir.path(), &solid, Divisions::new(3, 2, 2));
    params.locks_per_face = 2;

    let sequential = DecompositionPipeline::new(CsgKernel::new(), no_render());
    let first = sequential.run(&params, None).unwrap();
    let first_volumes: Vec<f64> = first
        .pieces
        .iter()
        .map(|p| load_stl(p).unwrap().volume())
        .collect();

    let again = sequential.run(&params, None).unwrap();
    assert_eq!(centers(&first), centers(&again));
    assert_eq!(first.mesh_info.piece_count, again.mesh_info.piece_count);

    let parallel = DecompositionPipeline::new(
        CsgKernel::new(),
        PipelineOptions {
            parallel: true,
            worker_threads: Some(3),
            render: false,
            ..Default::default()
        },
    );
    let par = parallel.run(&params, None).unwrap();
    assert_eq!(centers(&first), centers(&par));
    assert_eq!(first.pieces, par.pieces);
    assert_eq!(first.interlocks_failed, par.interlocks_failed);
    let par_volumes: Vec<f64> = par
        .pieces
        .iter()
        .map(|p| load_stl(p).unwrap().volume())
        .collect();
    for (a, b) in first_volumes.iter().zip(&par_volumes) {
        assert_relative_eq!(a, b, epsilon = 1e-9);
    }

    params.seed = 7;
    let reseeded = sequential.run(&params, None).unwrap();
    assert_ne!(centers(&first), centers(&reseeded));
}

/// Fails the first interlock union applied to the piece at the origin
struct FailingUnionKernel {
    inner: CsgKernel,
    tripped: AtomicBool,
}

impl SolidKernel for FailingUnionKernel {
    fn boolean(&self, op: BooleanOp, a: &Mesh, b: &Mesh) -> puzzlecut_geometry::Result<Mesh> {
        let at_origin = a.bounds().min == Point3::origin();
        if op == BooleanOp::Union && at_origin && !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(puzzlecut_geometry::Error::BooleanFailed {
                op: op.name(),
                reason: "injected".to_string(),
            });
        }
        self.inner.boolean(op, a, b)
    }

    fn cleanup(&self, mesh: &Mesh) -> puzzlecut_geometry::Result<Mesh> {
        self.inner.cleanup(mesh)
    }
}

#[test]
fn test_failed_union_does_not_stop_other_interlocks() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([0.0; 3], [4.0; 3]);
    let mut params = PuzzleParams::new(write_solid(dir.path(), &solid));
    params.output_dir = dir.path().join("out");
    params.divisions = Divisions::new(2, 1, 1);
    params.locks_per_face = 2;
    params.tessellation = Tessellation {
        cylinder_sections: 12,
        sphere_subdivisions: 1,
    };

    let kernel = FailingUnionKernel {
        inner: CsgKernel::new(),
        tripped: AtomicBool::new(false),
    };
    let report = DecompositionPipeline::new(kernel, no_render())
        .run(&params, None)
        .unwrap();

    assert_eq!(report.mesh_info.piece_count, 2);
    assert_eq!(report.interlocks_attempted, 2);
    assert_eq!(report.interlocks_failed, 1);

    let owner = &report.outcomes[0];
    assert_eq!(owner.status, PieceStatus::Exported);
    assert_eq!(owner.interlocks[0].role, Role::Key);
    match &owner.interlocks[0].outcome {
        InterlockOutcome::Failed(failure) => {
            assert_eq!(failure.op, "union");
            assert!(failure.reason.contains("injected"));
        }
        other => panic!("expected a failure, got {:?}", other),
    }
    assert_eq!(owner.interlocks[1].role, Role::Socket);
    assert_eq!(owner.interlocks[1].outcome, InterlockOutcome::Applied);
}

#[test]
fn test_complementary_mode_applies_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([0.0; 3], [1.0; 3]);
    let mut params = unit_params(dir.path(), &solid, Divisions::new(2, 1, 1));
    params.mating = MatingMode::Complementary;

    let report = DecompositionPipeline::new(CsgKernel::new(), no_render())
        .run(&params, None)
        .unwrap();

    assert_eq!(report.interlocks_attempted, 2);
    let owner = &report.outcomes[0].interlocks[0];
    let mate = &report.outcomes[1].interlocks[0];
    assert_eq!(owner.role, Role::Key);
    assert_eq!(mate.role, Role::Socket);
    assert_eq!(owner.center, mate.center);
    assert_eq!(owner.face_owner, mate.face_owner);
}

#[test]
fn test_progress_is_monotonic_and_previews_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([0.0; 3], [1.0; 3]);
    let params = unit_params(dir.path(), &solid, Divisions::new(2, 1, 1));

    let updates = Mutex::new(Vec::<ProgressUpdate>::new());
    let observer = |update: ProgressUpdate| updates.lock().unwrap().push(update);
    let pipeline = DecompositionPipeline::new(
        CsgKernel::new(),
        PipelineOptions {
            image_size: (160, 120),
            ..Default::default()
        },
    );
    let report = pipeline.run(&params, Some(&observer)).unwrap();

    assert_eq!(report.previews.len(), 5);
    assert!(report.render_error.is_none());
    assert!(report.previews[0].ends_with("puzzle_view_1_e20_a30.png"));
    assert!(report.previews[4].ends_with("puzzle_view_5_e45_a45.png"));
    assert!(report.previews.iter().all(|p| p.exists()));

    let updates = updates.into_inner().unwrap();
    let percents: Vec<u8> = updates.iter().filter_map(|u| u.percent).collect();
    assert_eq!(percents.first(), Some(&5));
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(updates.iter().filter(|u| u.piece_event.is_some()).count(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mesh_info"]["piece_count"], 2);
    assert_eq!(json["outcomes"][0]["interlocks"][0]["outcome"]["status"], "applied");
}

/// Fails the cell intersection for the cell at the origin and, optionally,
/// every cleanup
struct FaultyKernel {
    inner: CsgKernel,
    fail_origin_cell: bool,
    fail_cleanup: bool,
}

impl FaultyKernel {
    fn new(fail_origin_cell: bool, fail_cleanup: bool) -> Self {
        Self {
            inner: CsgKernel::new(),
            fail_origin_cell,
            fail_cleanup,
        }
    }
}

impl SolidKernel for FaultyKernel {
    fn boolean(&self, op: BooleanOp, a: &Mesh, b: &Mesh) -> puzzlecut_geometry::Result<Mesh> {
        let origin_box = b.bounds().min == Point3::origin();
        if op == BooleanOp::Intersection && origin_box && self.fail_origin_cell {
            return Err(puzzlecut_geometry::Error::BooleanFailed {
                op: op.name(),
                reason: "injected".to_string(),
            });
        }
        self.inner.boolean(op, a, b)
    }

    fn cleanup(&self, mesh: &Mesh) -> puzzlecut_geometry::Result<Mesh> {
        if self.fail_cleanup {
            return Err(puzzlecut_geometry::Error::InvalidMesh("injected".to_string()));
        }
        self.inner.cleanup(mesh)
    }
}

#[test]
fn test_failed_cell_intersection_moves_on_to_next_cell() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([0.0; 3], [1.0; 3]);
    let params = unit_params(dir.path(), &solid, Divisions::new(3, 1, 1));

    let report = DecompositionPipeline::new(FaultyKernel::new(true, false), no_render())
        .run(&params, None)
        .unwrap();

    assert_eq!(report.mesh_info.total_possible_pieces, 3);
    assert_eq!(report.mesh_info.piece_count, 2);
    assert_eq!(report.failed_count, 1);
    assert_eq!(report.empty_count, 0);

    let failed = &report.outcomes[0];
    assert_eq!(failed.status, PieceStatus::Failed);
    assert!(failed.interlocks.is_empty());
    assert!(failed.path.is_none());
    assert!(failed.reason.as_deref().unwrap().contains("injected"));
    assert_eq!(report.failures().count(), 1);

    // The middle cell still owns and applies its +X face
    assert_eq!(report.outcomes[1].status, PieceStatus::Exported);
    assert_eq!(report.outcomes[1].interlocks.len(), 1);
    assert_eq!(report.outcomes[2].status, PieceStatus::Exported);
    assert_eq!(report.interlocks_attempted, 1);
    assert!(report.pieces[0].ends_with("piece_1_0_0.stl"));
}

#[test]
fn test_failed_cleanup_exports_uncleaned_piece() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([0.0; 3], [1.0; 3]);
    let params = unit_params(dir.path(), &solid, Divisions::new(2, 1, 1));

    let report = DecompositionPipeline::new(FaultyKernel::new(false, true), no_render())
        .run(&params, None)
        .unwrap();

    assert_eq!(report.mesh_info.piece_count, 2);
    assert_eq!(report.failed_count, 0);
    for outcome in &report.outcomes {
        assert_eq!(outcome.status, PieceStatus::Exported);
        assert!(outcome.cleanup_error.as_deref().unwrap().contains("injected"));
        let piece = load_stl(outcome.path.as_ref().unwrap()).unwrap();
        assert!(piece.triangle_count() > 0);
    }
    // Owner key survives without cleanup
    assert_eq!(report.outcomes[0].interlocks[0].outcome, InterlockOutcome::Applied);
}

#[test]
fn test_render_failure_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([0.0; 3], [1.0; 3]);
    let params = unit_params(dir.path(), &solid, Divisions::new(2, 1, 1));

    let pipeline = DecompositionPipeline::new(
        CsgKernel::new(),
        PipelineOptions {
            image_size: (0, 0),
            ..Default::default()
        },
    );
    let report = pipeline.run(&params, None).unwrap();

    assert_eq!(report.mesh_info.piece_count, 2);
    assert!(report.previews.is_empty());
    let error = report.render_error.as_deref().unwrap();
    assert!(error.contains("invalid image size"), "{}", error);
    assert!(report.pieces.iter().all(|p| p.exists()));
}

#[test]
fn test_unwritable_preview_keeps_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let solid = cube([0.0; 3], [1.0; 3]);
    let params = unit_params(dir.path(), &solid, Divisions::new(2, 1, 1));
    let blocked = params.output_dir.join("puzzle_view_3_e0_a0.png");
    std::fs::create_dir_all(&blocked).unwrap();

    let pipeline = DecompositionPipeline::new(
        CsgKernel::new(),
        PipelineOptions {
            image_size: (80, 60),
            ..Default::default()
        },
    );
    let report = pipeline.run(&params, None).unwrap();

    assert_eq!(report.previews.len(), 4);
    assert!(!report.previews.contains(&blocked));
    assert!(report.previews.iter().all(|p| p.is_file()));
    let error = report.render_error.as_deref().unwrap();
    assert!(error.contains("puzzle_view_3_e0_a0.png"), "{}", error);
}
