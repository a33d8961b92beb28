//! Reflectance-threshold cloud screening
//!
//! Clouds are bright in the blue band and, unlike bright soil, also in
//! SWIR. A pixel is flagged as cloud where both bands exceed their
//! thresholds; stacks without a SWIR band fall back to the blue test
//! alone. Flagged pixels are excised from every band before index
//! computation so they surface as NaN downstream.

use crate::maybe_rayon::*;
use ndarray::Array2;
use pestwatch_core::raster::{Band, BandStack, Raster};
use pestwatch_core::{Algorithm, Error, Result};

/// Parameters for cloud screening
#[derive(Debug, Clone)]
pub struct CloudScreenParams {
    /// Blue reflectance above which a pixel may be cloud (default 0.2)
    pub blue_threshold: f64,
    /// SWIR1 reflectance above which a bright pixel is cloud (default 0.3)
    pub swir_threshold: f64,
}

impl Default for CloudScreenParams {
    fn default() -> Self {
        Self {
            blue_threshold: 0.2,
            swir_threshold: 0.3,
        }
    }
}

/// Cloud screening algorithm
#[derive(Debug, Clone, Default)]
pub struct CloudScreen;

impl Algorithm for CloudScreen {
    type Input = BandStack;
    type Output = Raster<u8>;
    type Params = CloudScreenParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "CloudScreen"
    }

    fn description(&self) -> &'static str {
        "Flag cloud pixels by blue/SWIR reflectance thresholds"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        detect_clouds(&input, &params)
    }
}

/// Detect cloud pixels in a scene.
///
/// Returns a binary raster: 1 where the pixel is cloud, 0 elsewhere.
/// Requires the Blue band; uses SWIR1 when present.
pub fn detect_clouds(stack: &BandStack, params: &CloudScreenParams) -> Result<Raster<u8>> {
    let blue = stack.require(Band::Blue)?;
    let swir = stack.get(Band::Swir1);

    let (rows, cols) = blue.shape();
    let blue_t = params.blue_threshold;
    let swir_t = params.swir_threshold;

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for col in 0..cols {
                let b = unsafe { blue.get_unchecked(row, col) };
                if !b.is_finite() || b <= blue_t {
                    continue;
                }

                let is_cloud = match swir {
                    Some(s) => {
                        let sv = unsafe { s.get_unchecked(row, col) };
                        sv.is_finite() && sv > swir_t
                    }
                    None => true,
                };

                if is_cloud {
                    row_data[col] = 1;
                }
            }
            row_data
        })
        .collect();

    let mut output = blue.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Excise cloud pixels from every band of a scene.
///
/// Cells flagged in `mask` are set to NaN in all bands. The mask must
/// match the stack's dimensions.
pub fn apply_cloud_mask(stack: &mut BandStack, mask: &Raster<u8>) -> Result<()> {
    let Some((rows, cols)) = stack.shape() else {
        return Ok(());
    };
    if mask.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: mask.rows(),
            ac: mask.cols(),
        });
    }

    for (_, raster) in stack.iter_mut() {
        raster.set_nodata(Some(f64::NAN));
        for row in 0..rows {
            for col in 0..cols {
                let flagged = unsafe { mask.get_unchecked(row, col) } == 1;
                if flagged {
                    unsafe { raster.set_unchecked(row, col, f64::NAN) };
                }
            }
        }
    }

    Ok(())
}
