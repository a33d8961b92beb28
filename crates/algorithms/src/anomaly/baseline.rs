//! Spatial baseline estimation
//!
//! With at most a few cloud-free scenes per month there is no reliable
//! temporal baseline per pixel; the workflow instead takes the focal
//! median of the surrounding neighborhood as the expected value. Healthy
//! paddy is spatially homogeneous at the default 15x15 window, so
//! localized stress stands out against the median while gradual regional
//! gradients do not.

use crate::statistics::{focal_statistics, FocalParams, FocalStatistic};
use pestwatch_core::raster::Raster;
use pestwatch_core::{Algorithm, Error, Result};

/// Parameters for spatial baseline estimation
#[derive(Debug, Clone)]
pub struct BaselineParams {
    /// Focal window radius (default 7, a 15x15 window)
    pub radius: usize,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self { radius: 7 }
    }
}

/// Spatial baseline algorithm
#[derive(Debug, Clone, Default)]
pub struct SpatialBaseline;

impl Algorithm for SpatialBaseline {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = BaselineParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SpatialBaseline"
    }

    fn description(&self) -> &'static str {
        "Focal-median estimate of the locally expected index value"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        spatial_baseline(&input, params.radius)
    }
}

/// Estimate the spatial baseline of an index grid as the focal median
/// over a square window of the given radius.
pub fn spatial_baseline(raster: &Raster<f64>, radius: usize) -> Result<Raster<f64>> {
    focal_statistics(
        raster,
        FocalParams {
            radius,
            statistic: FocalStatistic::Median,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_of_uniform_field() {
        let r = Raster::filled(20, 20, 0.6);
        let baseline = spatial_baseline(&r, 7).unwrap();
        assert!((baseline.get(10, 10).unwrap() - 0.6).abs() < 1e-10);
    }

    #[test]
    fn baseline_suppresses_local_outlier() {
        let mut r = Raster::filled(20, 20, 0.6);
        r.set(10, 10, 0.1).unwrap();

        let baseline = spatial_baseline(&r, 7).unwrap();
        // One outlier in a 15x15 window does not move the median
        assert!((baseline.get(10, 10).unwrap() - 0.6).abs() < 1e-10);
    }

    #[test]
    fn zero_radius_rejected() {
        let r = Raster::filled(5, 5, 0.5);
        assert!(spatial_baseline(&r, 0).is_err());
    }
}
