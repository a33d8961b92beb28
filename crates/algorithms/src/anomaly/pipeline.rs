//! The full per-scene anomaly pipeline

use crate::anomaly::{anomaly_mask, anomaly_score, refine_pest_mask, spatial_baseline};
use crate::anomaly::mask::AnomalyMaskParams;
use pestwatch_core::raster::Raster;
use pestwatch_core::{Algorithm, Error, Result};

/// Parameters for the pest-risk pipeline
#[derive(Debug, Clone)]
pub struct PestRiskParams {
    /// Spatial baseline window radius (default 7, a 15x15 window)
    pub baseline_radius: usize,
    /// NDVI anomaly threshold (default 0.3)
    pub ndvi_threshold: f64,
    /// EVI anomaly threshold (default 0.3)
    pub evi_threshold: f64,
    /// NDWI anomaly threshold (default 0.3)
    pub ndwi_threshold: f64,
}

impl Default for PestRiskParams {
    fn default() -> Self {
        Self {
            baseline_radius: 7,
            ndvi_threshold: 0.3,
            evi_threshold: 0.3,
            ndwi_threshold: 0.3,
        }
    }
}

/// All masks produced for one scene
#[derive(Debug, Clone)]
pub struct PestRiskOutput {
    /// NDVI anomaly mask
    pub ndvi_mask: Raster<u8>,
    /// EVI anomaly mask
    pub evi_mask: Raster<u8>,
    /// NDWI anomaly mask
    pub ndwi_mask: Raster<u8>,
    /// Refined pest-risk mask
    pub refined: Raster<u8>,
}

/// Pest-risk pipeline algorithm
#[derive(Debug, Clone, Default)]
pub struct PestRisk;

impl Algorithm for PestRisk {
    type Input = (Raster<f64>, Raster<f64>, Raster<f64>);
    type Output = PestRiskOutput;
    type Params = PestRiskParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PestRisk"
    }

    fn description(&self) -> &'static str {
        "Baseline, score and threshold NDVI/EVI/NDWI anomalies, then refine to a pest-risk mask"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (ndvi, evi, ndwi) = input;
        pest_risk_pipeline(&ndvi, &evi, &ndwi, &params)
    }
}

/// Run the full anomaly pipeline for one scene.
///
/// For each of the three index grids: estimate the spatial baseline,
/// score deviations, threshold into a smoothed binary anomaly mask.
/// The refined pest-risk mask keeps NDVI anomalies not accompanied by
/// EVI or NDWI anomalies.
pub fn pest_risk_pipeline(
    ndvi: &Raster<f64>,
    evi: &Raster<f64>,
    ndwi: &Raster<f64>,
    params: &PestRiskParams,
) -> Result<PestRiskOutput> {
    let ndvi_mask = index_anomaly(ndvi, params.baseline_radius, params.ndvi_threshold)?;
    let evi_mask = index_anomaly(evi, params.baseline_radius, params.evi_threshold)?;
    let ndwi_mask = index_anomaly(ndwi, params.baseline_radius, params.ndwi_threshold)?;

    let refined = refine_pest_mask(&ndvi_mask, &evi_mask, &ndwi_mask)?;

    Ok(PestRiskOutput {
        ndvi_mask,
        evi_mask,
        ndwi_mask,
        refined,
    })
}

fn index_anomaly(index: &Raster<f64>, radius: usize, threshold: f64) -> Result<Raster<u8>> {
    let baseline = spatial_baseline(index, radius)?;
    let score = anomaly_score(index, &baseline)?;
    anomaly_mask(&score, &AnomalyMaskParams { threshold })
}
