//! Benchmarks for the imagery and anomaly hot path

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pestwatch_algorithms::anomaly::{pest_risk_pipeline, PestRiskParams};
use pestwatch_algorithms::imagery::{evi, ndvi, EviParams};
use pestwatch_core::Raster;

fn gradient_band(size: usize, offset: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    for row in 0..size {
        for col in 0..size {
            let v = offset + ((row * size + col) % 100) as f64 * 0.003;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_indices(c: &mut Criterion) {
    let nir = gradient_band(512, 0.4);
    let red = gradient_band(512, 0.08);
    let blue = gradient_band(512, 0.04);

    c.bench_function("ndvi_512", |b| {
        b.iter(|| ndvi(black_box(&nir), black_box(&red)).unwrap())
    });

    c.bench_function("evi_512", |b| {
        b.iter(|| {
            evi(
                black_box(&nir),
                black_box(&red),
                black_box(&blue),
                EviParams::default(),
            )
            .unwrap()
        })
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let ndvi = gradient_band(256, 0.6);
    let evi = gradient_band(256, 0.45);
    let ndwi = gradient_band(256, -0.35);

    c.bench_function("pest_risk_pipeline_256", |b| {
        b.iter(|| {
            pest_risk_pipeline(
                black_box(&ndvi),
                black_box(&evi),
                black_box(&ndwi),
                &PestRiskParams::default(),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_indices, bench_pipeline);
criterion_main!(benches);
