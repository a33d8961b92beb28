//! Thresholding anomaly scores into smoothed binary masks

use crate::maybe_rayon::*;
use ndarray::Array2;
use pestwatch_core::raster::Raster;
use pestwatch_core::{Error, Result};

/// Parameters for anomaly mask creation
#[derive(Debug, Clone)]
pub struct AnomalyMaskParams {
    /// Score above which a pixel is anomalous (default 0.3)
    pub threshold: f64,
}

impl Default for AnomalyMaskParams {
    fn default() -> Self {
        Self { threshold: 0.3 }
    }
}

/// Threshold an anomaly score grid into a binary mask and smooth it.
///
/// A pixel is flagged where `score > threshold`; the raw mask then gets a
/// 3x3 median (majority) pass to drop single-pixel speckle and fill
/// single-pixel holes. Edge windows are truncated, with ties resolved to
/// 0.
pub fn anomaly_mask(score: &Raster<f64>, params: &AnomalyMaskParams) -> Result<Raster<u8>> {
    let (rows, cols) = score.shape();
    let threshold = params.threshold;

    let raw: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for col in 0..cols {
                let v = unsafe { score.get_unchecked(row, col) };
                if v.is_finite() && v > threshold {
                    row_data[col] = 1;
                }
            }
            row_data
        })
        .collect();

    let raw = Array2::from_shape_vec((rows, cols), raw)
        .map_err(|e| Error::Other(e.to_string()))?;

    let smoothed: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let r0 = row.saturating_sub(1);
                let r1 = (row + 1).min(rows - 1);
                let c0 = col.saturating_sub(1);
                let c1 = (col + 1).min(cols - 1);

                let mut ones = 0usize;
                let mut total = 0usize;
                for nr in r0..=r1 {
                    for nc in c0..=c1 {
                        total += 1;
                        ones += raw[(nr, nc)] as usize;
                    }
                }

                if ones * 2 > total {
                    *out = 1;
                }
            }
            row_data
        })
        .collect();

    let mut output = score.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), smoothed).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_grid(base: f64) -> Raster<f64> {
        Raster::filled(9, 9, base)
    }

    #[test]
    fn below_threshold_is_clear() {
        let score = score_grid(0.1);
        let mask = anomaly_mask(&score, &AnomalyMaskParams::default()).unwrap();
        assert_eq!(mask.get(4, 4).unwrap(), 0);
    }

    #[test]
    fn above_threshold_is_flagged() {
        let score = score_grid(0.5);
        let mask = anomaly_mask(&score, &AnomalyMaskParams::default()).unwrap();
        assert_eq!(mask.get(4, 4).unwrap(), 1);
        assert_eq!(mask.get(0, 0).unwrap(), 1);
    }

    #[test]
    fn threshold_is_exclusive() {
        let score = score_grid(0.3);
        let mask = anomaly_mask(&score, &AnomalyMaskParams::default()).unwrap();
        assert_eq!(mask.get(4, 4).unwrap(), 0);
    }

    #[test]
    fn speckle_is_smoothed_away() {
        let mut score = score_grid(0.0);
        score.set(4, 4, 0.9).unwrap();

        let mask = anomaly_mask(&score, &AnomalyMaskParams::default()).unwrap();
        // A lone anomalous pixel loses the 3x3 majority vote
        assert_eq!(mask.get(4, 4).unwrap(), 0);
    }

    #[test]
    fn solid_patch_survives_smoothing() {
        let mut score = score_grid(0.0);
        for r in 3..=5 {
            for c in 3..=5 {
                score.set(r, c, 0.9).unwrap();
            }
        }

        let mask = anomaly_mask(&score, &AnomalyMaskParams::default()).unwrap();
        assert_eq!(mask.get(4, 4).unwrap(), 1);
    }

    #[test]
    fn single_hole_is_filled() {
        let mut score = score_grid(0.9);
        score.set(4, 4, 0.0).unwrap();

        let mask = anomaly_mask(&score, &AnomalyMaskParams::default()).unwrap();
        assert_eq!(mask.get(4, 4).unwrap(), 1);
    }

    #[test]
    fn nan_scores_are_clear() {
        let mut score = score_grid(0.0);
        score.set(2, 2, f64::NAN).unwrap();
        let mask = anomaly_mask(&score, &AnomalyMaskParams::default()).unwrap();
        assert_eq!(mask.get(2, 2).unwrap(), 0);
    }
}
