use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::UVec2;

use traversability::types::{LAYER_ELEVATION, MapInfo};
use traversability::{Grid2d, RasterMap, TraversabilityConfig, TraversabilityMap};

fn terrain(size: u32) -> RasterMap {
    let info = MapInfo::square(size, 0.05);
    let elevation = Grid2d::par_from_fn(info.clone(), |c: UVec2| {
        let x = c.x as f64 * 0.05;
        let y = c.y as f64 * 0.05;
        let block = if (c.x / 16 + c.y / 16) % 5 == 0 { 0.2 } else { 0.0 };
        0.1 * (x * 1.7).sin() * (y * 0.9).cos() + block
    });
    let mut map = RasterMap::new(info);
    map.insert_layer(LAYER_ELEVATION, elevation)
        .expect("elevation layer matches map geometry");
    map
}

fn bench_compute(c: &mut Criterion) {
    let map = TraversabilityMap::new(TraversabilityConfig::default()).unwrap();
    map.set_elevation_map(terrain(128)).unwrap();

    let mut group = c.benchmark_group("footprint_precompute");
    group.sample_size(10);

    group.bench_function("compute_traversability_128x128", |b| {
        b.iter(|| {
            map.compute_traversability().unwrap();
            black_box(map.traversable_fraction().unwrap());
        });
    });

    group.bench_function("footprint_fixed_128x128", |b| {
        b.iter(|| map.traversability_footprint(black_box(0.7)).unwrap());
    });

    group.bench_function("footprint_radius_128x128", |b| {
        b.iter(|| {
            map.traversability_footprint_radius(black_box(0.3), 0.1)
                .unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_compute);
criterion_main!(benches);
