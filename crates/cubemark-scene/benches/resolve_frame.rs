use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use cubemark_core::{CalibrationParameters, MarkerId, MarkerPose};
use cubemark_scene::{BoardDims, CubeResolver, LayoutTable, RegistrationMode};
use nalgebra::Vector3;

fn board_frame() -> Vec<(MarkerId, MarkerPose)> {
    let offsets = [(-11.75, 6.5), (11.75, 6.5), (11.75, -6.5), (-11.75, -6.5)];
    let mut markers: Vec<_> = offsets
        .iter()
        .enumerate()
        .map(|(id, &(x, y))| {
            let rvec = Vector3::new(3.05, 0.02 * id as f64, -0.01);
            (id as MarkerId, MarkerPose::new(rvec, Vector3::new(x, y, 60.0)))
        })
        .collect();
    markers.push((4, MarkerPose::new(Vector3::new(3.1, 0.0, 0.0), Vector3::new(0.0, 0.0, 60.0))));
    markers
}

fn bench_resolve_frame(c: &mut Criterion) {
    let table = LayoutTable::standard(&BoardDims::default()).expect("layout table");
    let resolver = CubeResolver::new(table, 2.0).expect("resolver");
    let mut calib = CalibrationParameters::pinhole(920.0, 920.0, 640.0, 360.0);
    calib.distortion = vec![-0.12, 0.03, 0.0005, -0.0004, 0.0];
    let markers = board_frame();

    let mut group = c.benchmark_group("resolve_frame");
    for mode in [RegistrationMode::Incremental, RegistrationMode::UpFront] {
        group.bench_function(format!("{mode:?}"), |b| {
            b.iter(|| resolver.resolve_frame(black_box(&markers), &calib, mode))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve_frame);
criterion_main!(benches);
