//! # PestWatch Algorithms
//!
//! Analysis algorithms for the PestWatch pest-risk monitoring workflow.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: Spectral indices (NDVI, EVI, NDWI), normalization, labels
//! - **cloud**: Reflectance-threshold cloud screening
//! - **anomaly**: Spatial baselines, anomaly scoring, pest-risk mask refinement
//! - **statistics**: Focal statistics, risk summaries
//! - **timeseries**: Per-pixel mask series, CSV export, sequence windowing
//! - **vectorize**: Risk mask to GeoJSON polygons

pub mod anomaly;
pub mod cloud;
pub mod imagery;
mod maybe_rayon;
pub mod statistics;
pub mod timeseries;
pub mod vectorize;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::anomaly::{
        anomaly_mask, anomaly_score, pest_risk_pipeline, refine_pest_mask, spatial_baseline,
        PestRiskParams,
    };
    pub use crate::cloud::{apply_cloud_mask, detect_clouds, CloudScreenParams};
    pub use crate::imagery::{
        evi, ndvi, ndwi, normalize_index, normalized_difference, scene_indices, threshold_label,
        EviParams, SceneIndices,
    };
    pub use crate::statistics::{focal_statistics, risk_fraction, FocalParams, FocalStatistic};
    pub use crate::timeseries::{MaskSeries, PixelSeries};
    pub use pestwatch_core::prelude::*;
}
