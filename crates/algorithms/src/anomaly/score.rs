//! Anomaly scoring against a spatial baseline

use crate::imagery::build_output;
use crate::maybe_rayon::*;
use pestwatch_core::raster::Raster;
use pestwatch_core::{Error, Result};

/// Score each pixel's deviation from its spatial baseline:
///
/// `score = |value - baseline| / (baseline + 1e-6)`
///
/// The relative form keeps the score comparable between high- and
/// low-index regions. Pixels where either input is non-finite, or where
/// the guarded denominator still vanishes, score 0 so that data gaps
/// never read as anomalies.
pub fn anomaly_score(data: &Raster<f64>, baseline: &Raster<f64>) -> Result<Raster<f64>> {
    if data.shape() != baseline.shape() {
        return Err(Error::SizeMismatch {
            er: data.rows(),
            ec: data.cols(),
            ar: baseline.rows(),
            ac: baseline.cols(),
        });
    }

    let (rows, cols) = data.shape();

    let scores: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0.0f64; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { data.get_unchecked(row, col) };
                let b = unsafe { baseline.get_unchecked(row, col) };

                if !v.is_finite() || !b.is_finite() {
                    continue;
                }

                let score = (v - b).abs() / (b + 1e-6);
                if score.is_finite() {
                    *out = score;
                }
            }
            row_data
        })
        .collect();

    build_output(data, rows, cols, scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_baseline_scores_zero() {
        let data = Raster::filled(5, 5, 0.6);
        let baseline = Raster::filled(5, 5, 0.6);

        let score = anomaly_score(&data, &baseline).unwrap();
        assert!(score.get(2, 2).unwrap().abs() < 1e-9);
    }

    #[test]
    fn relative_deviation() {
        let mut data = Raster::filled(5, 5, 0.6);
        data.set(2, 2, 0.3).unwrap();
        let baseline = Raster::filled(5, 5, 0.6);

        let score = anomaly_score(&data, &baseline).unwrap();
        // |0.3 - 0.6| / (0.6 + 1e-6) ~= 0.5
        let v = score.get(2, 2).unwrap();
        assert!((v - 0.5).abs() < 1e-4, "Expected ~0.5, got {}", v);
    }

    #[test]
    fn data_gaps_score_zero() {
        let mut data = Raster::filled(5, 5, 0.6);
        data.set(1, 1, f64::NAN).unwrap();
        let mut baseline = Raster::filled(5, 5, 0.6);
        baseline.set(3, 3, f64::NAN).unwrap();

        let score = anomaly_score(&data, &baseline).unwrap();
        assert_eq!(score.get(1, 1).unwrap(), 0.0);
        assert_eq!(score.get(3, 3).unwrap(), 0.0);
    }

    #[test]
    fn degenerate_denominator_scores_zero() {
        let data = Raster::filled(3, 3, 0.5);
        let baseline = Raster::filled(3, 3, -1e-6);

        let score = anomaly_score(&data, &baseline).unwrap();
        assert_eq!(score.get(1, 1).unwrap(), 0.0);
    }

    #[test]
    fn shape_mismatch_rejected() {
        let data = Raster::filled(5, 5, 0.6);
        let baseline = Raster::filled(5, 4, 0.6);
        assert!(anomaly_score(&data, &baseline).is_err());
    }
}
