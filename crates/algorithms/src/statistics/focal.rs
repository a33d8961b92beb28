//! Focal (moving window) statistics
//!
//! Computes a statistic over a square window centered on each cell. The
//! window is truncated at raster edges; NaN cells are skipped. The median
//! at radius 7 is the spatial baseline estimator of the anomaly pipeline,
//! and the median at radius 1 doubles as the majority smoother for binary
//! masks.

use crate::maybe_rayon::*;
use ndarray::Array2;
use pestwatch_core::raster::Raster;
use pestwatch_core::{Error, Result};

/// Available focal statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocalStatistic {
    /// Arithmetic mean
    Mean,
    /// Standard deviation (population)
    StdDev,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Median value
    Median,
    /// Count of valid (non-NaN) values
    Count,
}

/// Parameters for focal statistics
#[derive(Debug, Clone)]
pub struct FocalParams {
    /// Window radius (window side = 2*radius + 1)
    pub radius: usize,
    /// Statistic to compute
    pub statistic: FocalStatistic,
}

impl Default for FocalParams {
    fn default() -> Self {
        Self {
            radius: 1,
            statistic: FocalStatistic::Mean,
        }
    }
}

/// Compute focal statistics on a raster.
///
/// # Arguments
/// * `raster` - Input raster
/// * `params` - Window radius and statistic
///
/// # Returns
/// Raster with the computed statistic at each cell; cells whose window
/// holds no valid value are NaN.
pub fn focal_statistics(raster: &Raster<f64>, params: FocalParams) -> Result<Raster<f64>> {
    if params.radius == 0 {
        return Err(Error::InvalidParameter {
            name: "radius",
            value: "0".to_string(),
            reason: "focal window radius must be at least 1".to_string(),
        });
    }

    let (rows, cols) = raster.shape();
    let r = params.radius as isize;
    let statistic = params.statistic;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values: Vec<f64> = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);

            for (col, out) in row_data.iter_mut().enumerate() {
                values.clear();

                let r0 = (row as isize - r).max(0) as usize;
                let r1 = ((row as isize + r) as usize).min(rows - 1);
                let c0 = (col as isize - r).max(0) as usize;
                let c1 = ((col as isize + r) as usize).min(cols - 1);

                for nr in r0..=r1 {
                    for nc in c0..=c1 {
                        let v = unsafe { raster.get_unchecked(nr, nc) };
                        if !v.is_nan() {
                            values.push(v);
                        }
                    }
                }

                if values.is_empty() {
                    continue;
                }

                *out = compute_statistic(&mut values, statistic);
            }

            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

fn compute_statistic(values: &mut [f64], stat: FocalStatistic) -> f64 {
    let n = values.len() as f64;

    match stat {
        FocalStatistic::Mean => values.iter().sum::<f64>() / n,
        FocalStatistic::StdDev => {
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            var.sqrt()
        }
        FocalStatistic::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
        FocalStatistic::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        FocalStatistic::Median => {
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = values.len() / 2;
            if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / 2.0
            } else {
                values[mid]
            }
        }
        FocalStatistic::Count => n,
    }
}
