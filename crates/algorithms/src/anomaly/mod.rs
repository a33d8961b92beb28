//! Anomaly detection and pest-risk mask refinement
//!
//! The decision core of the workflow. Per scene, each index grid is
//! compared against a local spatial baseline (focal median), deviations
//! are scored relative to the baseline, scores are thresholded into
//! smoothed binary anomaly masks, and the per-index masks are combined
//! into a refined pest-risk mask: NDVI-anomalous pixels that are *not*
//! also anomalous in EVI or NDWI, so that broad environmental stress
//! (drought, flooding) is excluded.

mod baseline;
mod mask;
mod pipeline;
mod refine;
mod score;

pub use baseline::{spatial_baseline, BaselineParams, SpatialBaseline};
pub use mask::{anomaly_mask, AnomalyMaskParams};
pub use pipeline::{pest_risk_pipeline, PestRisk, PestRiskOutput, PestRiskParams};
pub use refine::refine_pest_mask;
pub use score::anomaly_score;
