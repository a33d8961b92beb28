//! Spectral vegetation and water indices
//!
//! The indices the risk workflow tracks per scene: NDVI for vegetation
//! vigor, EVI for canopy density with atmospheric correction, and a
//! SWIR-based NDWI for canopy moisture. All operate on single-band
//! reflectance rasters.
//!
//! Cloud screening fills masked pixels with 0, so a reflectance of exactly
//! 0 in any contributing band produces NaN in the index output.

use crate::maybe_rayon::*;
use ndarray::Array2;
use pestwatch_core::raster::{Band, BandStack, Raster};
use pestwatch_core::{Error, Result};

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1]. Pixels where either band is nodata or
/// the denominator vanishes are NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    two_band_index(band_a, band_b, false, |a, b| {
        let sum = a + b;
        if sum.abs() < 1e-10 {
            f64::NAN
        } else {
            (a - b) / sum
        }
    })
}

// ---------------------------------------------------------------------------
// NDVI
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
///
/// Pixels with zero reflectance in either band (cloud-masked) are NaN.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    two_band_index(nir, red, true, |n, r| {
        let sum = n + r;
        if sum.abs() < 1e-10 {
            f64::NAN
        } else {
            (n - r) / sum
        }
    })
}

// ---------------------------------------------------------------------------
// NDWI
// ---------------------------------------------------------------------------

/// Normalized Difference Water Index, SWIR variant
///
/// `NDWI = (Green - SWIR1) / (Green + SWIR1)`
///
/// The workflow uses the green/SWIR1 pairing (B03/B11): positive values
/// flag open water and saturated canopy, strongly negative values dry
/// vegetation and soil.
pub fn ndwi(green: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    two_band_index(green, swir, true, |g, s| {
        let sum = g + s;
        if sum.abs() < 1e-10 {
            f64::NAN
        } else {
            (g - s) / sum
        }
    })
}

// ---------------------------------------------------------------------------
// EVI
// ---------------------------------------------------------------------------

/// Parameters for EVI
#[derive(Debug, Clone)]
pub struct EviParams {
    /// Gain factor (default: 2.5)
    pub g: f64,
    /// Aerosol coefficient for the red band (default: 6.0)
    pub c1: f64,
    /// Aerosol coefficient for the blue band (default: 7.5)
    pub c2: f64,
    /// Canopy background adjustment (default: 1.0)
    pub l: f64,
}

impl Default for EviParams {
    fn default() -> Self {
        Self {
            g: 2.5,
            c1: 6.0,
            c2: 7.5,
            l: 1.0,
        }
    }
}

/// Enhanced Vegetation Index (Huete et al., 2002)
///
/// `EVI = G * (NIR - Red) / (NIR + C1 * Red - C2 * Blue + L)`
///
/// More sensitive than NDVI in high-biomass paddies and reduces
/// atmospheric and soil noise. Pixels with zero reflectance in any
/// contributing band are NaN.
pub fn evi(
    nir: &Raster<f64>,
    red: &Raster<f64>,
    blue: &Raster<f64>,
    params: EviParams,
) -> Result<Raster<f64>> {
    check_dimensions(nir, red)?;
    check_dimensions(nir, blue)?;

    let (rows, cols) = nir.shape();
    let nodata_nir = nir.nodata();
    let nodata_red = red.nodata();
    let nodata_blue = blue.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let n = unsafe { nir.get_unchecked(row, col) };
                let r = unsafe { red.get_unchecked(row, col) };
                let b = unsafe { blue.get_unchecked(row, col) };

                if is_masked(n, nodata_nir) || is_masked(r, nodata_red) || is_masked(b, nodata_blue)
                {
                    continue;
                }

                let denom = n + params.c1 * r - params.c2 * b + params.l;
                if denom.abs() < 1e-10 {
                    continue;
                }

                row_data[col] = params.g * (n - r) / denom;
            }
            row_data
        })
        .collect();

    build_output(nir, rows, cols, data)
}

// ---------------------------------------------------------------------------
// Per-scene convenience
// ---------------------------------------------------------------------------

/// The three index grids computed for every scene
#[derive(Debug, Clone)]
pub struct SceneIndices {
    pub ndvi: Raster<f64>,
    pub evi: Raster<f64>,
    pub ndwi: Raster<f64>,
}

/// Compute NDVI, EVI and NDWI from a band stack.
///
/// Requires the Blue, Green, Red, NIR and SWIR1 bands.
pub fn scene_indices(stack: &BandStack) -> Result<SceneIndices> {
    let blue = stack.require(Band::Blue)?;
    let green = stack.require(Band::Green)?;
    let red = stack.require(Band::Red)?;
    let nir = stack.require(Band::Nir)?;
    let swir = stack.require(Band::Swir1)?;

    Ok(SceneIndices {
        ndvi: ndvi(nir, red)?,
        evi: evi(nir, red, blue, EviParams::default())?,
        ndwi: ndwi(green, swir)?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn two_band_index<F>(
    a: &Raster<f64>,
    b: &Raster<f64>,
    zero_is_masked: bool,
    f: F,
) -> Result<Raster<f64>>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    check_dimensions(a, b)?;

    let (rows, cols) = a.shape();
    let nodata_a = a.nodata();
    let nodata_b = b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let va = unsafe { a.get_unchecked(row, col) };
                let vb = unsafe { b.get_unchecked(row, col) };

                if is_nodata_f64(va, nodata_a) || is_nodata_f64(vb, nodata_b) {
                    continue;
                }
                if zero_is_masked && (va == 0.0 || vb == 0.0) {
                    continue;
                }

                row_data[col] = f(va, vb);
            }
            row_data
        })
        .collect();

    build_output(a, rows, cols, data)
}

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

fn is_masked(value: f64, nodata: Option<f64>) -> bool {
    is_nodata_f64(value, nodata) || value == 0.0
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

pub(crate) fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pestwatch_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn normalized_difference_basic() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(5, 5, 0.2);

        let result = normalized_difference(&a, &b).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert!((val - 0.6).abs() < 1e-10, "Expected 0.6, got {}", val);
    }

    #[test]
    fn ndvi_dense_vegetation() {
        let nir = make_band(5, 5, 0.5);
        let red = make_band(5, 5, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        let val = result.get(2, 2).unwrap();

        let expected = (0.5 - 0.1) / (0.5 + 0.1);
        assert!(
            (val - expected).abs() < 1e-10,
            "Expected {}, got {}",
            expected,
            val
        );
    }

    #[test]
    fn ndvi_water_is_negative() {
        let nir = make_band(5, 5, 0.05);
        let red = make_band(5, 5, 0.15);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(2, 2).unwrap() < 0.0);
    }

    #[test]
    fn ndvi_masked_zero_band() {
        let mut nir = make_band(5, 5, 0.5);
        nir.set(2, 2, 0.0).unwrap();
        let red = make_band(5, 5, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        assert!(
            result.get(2, 2).unwrap().is_nan(),
            "Cloud-filled zero pixel should be NaN"
        );
        assert!(!result.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn ndwi_wet_canopy_positive() {
        let green = make_band(5, 5, 0.3);
        let swir = make_band(5, 5, 0.1);

        let result = ndwi(&green, &swir).unwrap();
        assert!(result.get(2, 2).unwrap() > 0.0);
    }

    #[test]
    fn evi_matches_formula() {
        let nir = make_band(5, 5, 0.5);
        let red = make_band(5, 5, 0.1);
        let blue = make_band(5, 5, 0.05);

        let result = evi(&nir, &red, &blue, EviParams::default()).unwrap();
        let val = result.get(2, 2).unwrap();

        let p = EviParams::default();
        let expected = p.g * (0.5 - 0.1) / (0.5 + p.c1 * 0.1 - p.c2 * 0.05 + p.l);
        assert!(
            (val - expected).abs() < 1e-10,
            "Expected {}, got {}",
            expected,
            val
        );
    }

    #[test]
    fn evi_masked_zero_blue() {
        let nir = make_band(5, 5, 0.5);
        let red = make_band(5, 5, 0.1);
        let mut blue = make_band(5, 5, 0.05);
        blue.set(1, 1, 0.0).unwrap();

        let result = evi(&nir, &red, &blue, EviParams::default()).unwrap();
        assert!(result.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn nodata_propagates() {
        let mut nir = make_band(5, 5, 0.5);
        nir.set_nodata(Some(-9999.0));
        nir.set(2, 2, -9999.0).unwrap();
        let red = make_band(5, 5, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let a = make_band(5, 5, 1.0);
        let b = make_band(5, 10, 1.0);
        assert!(normalized_difference(&a, &b).is_err());
    }

    #[test]
    fn scene_indices_requires_bands() {
        let mut stack = BandStack::new();
        stack.insert(Band::Nir, make_band(5, 5, 0.5)).unwrap();
        assert!(scene_indices(&stack).is_err());
    }

    #[test]
    fn scene_indices_all_three() {
        let mut stack = BandStack::new();
        stack.insert(Band::Blue, make_band(5, 5, 0.05)).unwrap();
        stack.insert(Band::Green, make_band(5, 5, 0.12)).unwrap();
        stack.insert(Band::Red, make_band(5, 5, 0.1)).unwrap();
        stack.insert(Band::Nir, make_band(5, 5, 0.5)).unwrap();
        stack.insert(Band::Swir1, make_band(5, 5, 0.2)).unwrap();

        let indices = scene_indices(&stack).unwrap();
        assert!(indices.ndvi.get(2, 2).unwrap() > 0.5);
        assert!(indices.evi.get(2, 2).unwrap() > 0.0);
        assert!(indices.ndwi.get(2, 2).unwrap() < 0.0);
    }
}
