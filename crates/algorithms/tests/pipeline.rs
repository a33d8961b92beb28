//! End-to-end pipeline test on a synthetic scene: cloud screening,
//! index computation, anomaly detection, refinement, and time-series
//! extraction all chained the way the CLI drives them.

use chrono::NaiveDate;
use pestwatch_algorithms::anomaly::{pest_risk_pipeline, PestRiskParams};
use pestwatch_algorithms::cloud::{apply_cloud_mask, detect_clouds, CloudScreenParams};
use pestwatch_algorithms::imagery::scene_indices;
use pestwatch_algorithms::statistics::{risk_fraction, risk_summary};
use pestwatch_algorithms::timeseries::{make_sequences, MaskSeries, PixelSeries};
use pestwatch_core::raster::{Band, BandStack, Raster};
use pestwatch_core::GeoTransform;

const SIZE: usize = 48;

/// A paddy scene: healthy reflectances everywhere, one stressed patch
/// with depressed NIR, and one cloudy corner.
fn synthetic_scene() -> BandStack {
    let gt = GeoTransform::from_bounds(79.0, 10.57, 79.047, 10.617, SIZE, SIZE);

    let band = |value: f64| {
        let mut r = Raster::filled(SIZE, SIZE, value);
        r.set_transform(gt);
        r
    };

    let mut blue = band(0.04);
    let green = band(0.08);
    let mut red = band(0.05);
    let mut nir = band(0.45);
    let mut swir = band(0.18);

    // Stress patch: chlorosis raises red (and slightly blue) reflectance
    // while the canopy structure is still intact, so NDVI deviates past
    // the anomaly threshold but EVI stays within it.
    for row in 20..26 {
        for col in 20..26 {
            blue.set(row, col, 0.12).unwrap();
            red.set(row, col, 0.16).unwrap();
            nir.set(row, col, 0.46).unwrap();
        }
    }

    // Cloudy corner: bright in blue and SWIR
    for row in 0..6 {
        for col in 0..6 {
            blue.set(row, col, 0.4).unwrap();
            swir.set(row, col, 0.45).unwrap();
        }
    }

    let mut stack = BandStack::new();
    stack.insert(Band::Blue, blue).unwrap();
    stack.insert(Band::Green, green).unwrap();
    stack.insert(Band::Red, red).unwrap();
    stack.insert(Band::Nir, nir).unwrap();
    stack.insert(Band::Swir1, swir).unwrap();
    stack
}

#[test]
fn scene_to_refined_mask() {
    let mut scene = synthetic_scene();

    // Cloud screening removes the bright corner from every band
    let clouds = detect_clouds(&scene, &CloudScreenParams::default()).unwrap();
    assert_eq!(clouds.get(2, 2).unwrap(), 1);
    assert_eq!(clouds.get(30, 30).unwrap(), 0);
    apply_cloud_mask(&mut scene, &clouds).unwrap();

    let indices = scene_indices(&scene).unwrap();

    // Cloud pixels are NaN in the indices, healthy paddy has high NDVI
    assert!(indices.ndvi.get(2, 2).unwrap().is_nan());
    assert!(indices.ndvi.get(30, 30).unwrap() > 0.7);
    // The stress patch has clearly lower NDVI than its surroundings
    assert!(indices.ndvi.get(22, 22).unwrap() < indices.ndvi.get(30, 30).unwrap());

    let out = pest_risk_pipeline(
        &indices.ndvi,
        &indices.evi,
        &indices.ndwi,
        &PestRiskParams::default(),
    )
    .unwrap();

    // The stressed patch is flagged as pest risk, healthy paddy is not
    assert_eq!(out.refined.get(22, 22).unwrap(), 1);
    assert_eq!(out.refined.get(35, 35).unwrap(), 0);

    // The refined mask flags a small share of the scene
    let fraction = risk_fraction(&out.refined);
    assert!(fraction > 0.0 && fraction < 0.1, "fraction = {}", fraction);
}

#[test]
fn masks_to_timeseries_and_summary() {
    let mut scene = synthetic_scene();
    let clouds = detect_clouds(&scene, &CloudScreenParams::default()).unwrap();
    apply_cloud_mask(&mut scene, &clouds).unwrap();
    let indices = scene_indices(&scene).unwrap();
    let out = pest_risk_pipeline(
        &indices.ndvi,
        &indices.evi,
        &indices.ndwi,
        &PestRiskParams::default(),
    )
    .unwrap();

    // Three acquisition dates: two clear scenes, then the outbreak
    let empty = out.refined.like(0);
    let mut series = MaskSeries::new();
    series
        .push(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), empty.clone())
        .unwrap();
    series
        .push(NaiveDate::from_ymd_opt(2024, 6, 11).unwrap(), empty)
        .unwrap();
    series
        .push(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(), out.refined.clone())
        .unwrap();

    let rows = risk_summary(&series);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].risk_pixels, 0);
    assert_eq!(rows[1].risk_pixels, 0);
    assert!(rows[2].risk_pixels > 0);
    assert!(rows[2].area_ha > 0.0);

    // Per-pixel series: a flagged patch pixel traces [0, 0, 1]
    let pixels = PixelSeries::from_masks(&series).unwrap();
    let flat = 22 * SIZE + 22;
    let row = pixels.row(flat).unwrap();
    assert_eq!(row, vec![0, 0, 1]);

    // Sequence windowing over the series
    let sequences = make_sequences(&pixels, 2, 1).unwrap();
    assert_eq!(sequences.len(), SIZE * SIZE);
    assert!(sequences.positive_fraction() > 0.0);
}
