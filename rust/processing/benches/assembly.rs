// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Benchmarks for face planning and per-cell assembly.
//!
//! Run with: cargo bench -p puzzlecut-processing --bench assembly

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use puzzlecut_geometry::primitives::icosphere;
use puzzlecut_geometry::CsgKernel;
use puzzlecut_processing::{
    CellIndex, Divisions, FacePlan, Grid, InterlockBuilder, InterlockDimensions, MatingMode,
    PieceAssembler, StyleSelection, Tessellation,
};

fn bench_face_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("face_plan");
    let bounds = icosphere(10.0, 1).bounds();

    // (divisions per axis, locks per face)
    for (n, locks) in [(2, 3), (8, 3), (16, 3), (32, 8)] {
        let grid = Grid::new(bounds, Divisions::new(n, n, n));
        group.throughput(Throughput::Elements((grid.internal_face_count() * locks) as u64));
        group.bench_with_input(
            BenchmarkId::new("build", format!("{n}^3_x{locks}")),
            &grid,
            |b, grid| {
                b.iter(|| {
                    FacePlan::build(black_box(grid), locks, 0.2, 42, StyleSelection::Alternating)
                })
            },
        );
    }

    group.finish();
}

fn bench_assemble_cell(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_cell");
    group.sample_size(10);

    let solid = icosphere(3.0, 2);
    let grid = Grid::new(solid.bounds(), Divisions::new(2, 2, 2));
    let plan = FacePlan::build(&grid, 2, 0.2, 42, StyleSelection::default());
    let kernel = CsgKernel::new();

    for sections in [12, 24] {
        let builder = InterlockBuilder::new(
            InterlockDimensions::default(),
            Tessellation {
                cylinder_sections: sections,
                sphere_subdivisions: 1,
            },
        );
        let assembler = PieceAssembler::new(&kernel, &builder, MatingMode::OwnerOnly);
        let cell = CellIndex::new(0, 0, 0);
        let cell_box = grid.cell_box(cell);
        group.bench_function(BenchmarkId::new("owner_only", sections), |b| {
            b.iter(|| assembler.assemble(cell, black_box(&cell_box), &solid, &plan))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_face_plan, bench_assemble_cell);
criterion_main!(benches);
