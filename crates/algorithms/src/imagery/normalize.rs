//! Index normalization and threshold labeling
//!
//! Index grids live in [-1, 1]; downstream consumers (8-bit archives,
//! label masks for the sequence dataset) need them rescaled or binarized.

use crate::maybe_rayon::*;
use ndarray::Array2;
use pestwatch_core::raster::Raster;
use pestwatch_core::{Error, Result};

/// Rescale an index raster from [-1, 1] to 8-bit [0, 255].
///
/// Non-finite cells are treated as -1 before rescaling (they land on 0),
/// and values are clipped to [-1, 1] first.
pub fn normalize_index(raster: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = raster.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for col in 0..cols {
                let mut v = unsafe { raster.get_unchecked(row, col) };
                if !v.is_finite() {
                    v = -1.0;
                }
                let v = v.clamp(-1.0, 1.0);
                row_data[col] = (((v + 1.0) / 2.0) * 255.0) as u8;
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Binarize an index raster at a threshold.
///
/// Cells with `value >= threshold` become 1, all others (including NaN)
/// become 0. Used to derive vegetation labels from NDVI.
pub fn threshold_label(raster: &Raster<f64>, threshold: f64) -> Result<Raster<u8>> {
    let (rows, cols) = raster.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for col in 0..cols {
                let v = unsafe { raster.get_unchecked(row, col) };
                if v.is_finite() && v >= threshold {
                    row_data[col] = 1;
                }
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
