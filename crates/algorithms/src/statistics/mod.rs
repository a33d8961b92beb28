//! Statistical analysis for raster data
//!
//! - **focal**: Moving-window (focal) statistics
//! - **summary**: Risk fractions and per-date risk summaries

pub mod focal;
pub mod summary;

pub use focal::{focal_statistics, FocalParams, FocalStatistic};
pub use summary::{risk_fraction, risk_summary, write_summary_csv, RiskSummaryRow};
