//! Risk mask summaries
//!
//! Aggregate statistics over binary pest-risk masks: the share of flagged
//! pixels in a single mask, and per-date summary rows (pixel counts,
//! percentages, affected area) across a mask series.

use crate::timeseries::MaskSeries;
use chrono::NaiveDate;
use pestwatch_core::raster::Raster;
use pestwatch_core::{Error, Result};
use std::path::Path;

/// Mean radius approximations for geographic cell areas
const METERS_PER_DEG_LAT: f64 = 110_574.0;
const METERS_PER_DEG_LON_EQUATOR: f64 = 111_320.0;

/// Fraction of valid pixels flagged as risk (value == 1).
///
/// Pixels equal to the mask's nodata value are excluded from the
/// denominator. Returns 0 for an all-nodata mask.
pub fn risk_fraction(mask: &Raster<u8>) -> f64 {
    let mut valid = 0usize;
    let mut risk = 0usize;

    for &v in mask.data().iter() {
        if mask.is_nodata(v) {
            continue;
        }
        valid += 1;
        if v == 1 {
            risk += 1;
        }
    }

    if valid == 0 {
        0.0
    } else {
        risk as f64 / valid as f64
    }
}

/// One row of a per-date risk summary
#[derive(Debug, Clone)]
pub struct RiskSummaryRow {
    pub date: NaiveDate,
    pub risk_pixels: usize,
    pub risk_percent: f64,
    pub area_ha: f64,
}

/// Summarize a mask series: one row per date with the flagged pixel count,
/// percentage of valid pixels, and affected area in hectares.
///
/// Area is flagged-pixel count times cell area. Geographic grids (the
/// workflow's EPSG:4326 products) are converted with an equirectangular
/// approximation at the raster's center latitude; projected grids are
/// assumed to be in meters.
pub fn risk_summary(series: &MaskSeries) -> Vec<RiskSummaryRow> {
    series
        .iter()
        .map(|(date, mask)| {
            let risk_pixels = mask.data().iter().filter(|&&v| v == 1).count();
            let fraction = risk_fraction(mask);
            let area_ha = risk_pixels as f64 * cell_area_m2(mask) / 10_000.0;
            RiskSummaryRow {
                date,
                risk_pixels,
                risk_percent: fraction * 100.0,
                area_ha,
            }
        })
        .collect()
}

/// Write summary rows as CSV (`date,risk_pixels,risk_percent,area_ha`).
pub fn write_summary_csv<P: AsRef<Path>>(rows: &[RiskSummaryRow], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())
        .map_err(|e| Error::Other(format!("opening summary CSV: {}", e)))?;

    writer
        .write_record(["date", "risk_pixels", "risk_percent", "area_ha"])
        .map_err(|e| Error::Other(format!("writing summary header: {}", e)))?;

    for row in rows {
        writer
            .write_record([
                row.date.to_string(),
                row.risk_pixels.to_string(),
                format!("{:.4}", row.risk_percent),
                format!("{:.4}", row.area_ha),
            ])
            .map_err(|e| Error::Other(format!("writing summary row: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| Error::Other(format!("flushing summary CSV: {}", e)))?;
    Ok(())
}

/// Cell area in square meters.
pub(crate) fn cell_area_m2(mask: &Raster<u8>) -> f64 {
    let gt = mask.transform();
    let is_geographic = mask
        .crs()
        .map(|crs| crs.epsg() == Some(4326))
        .unwrap_or(true);

    if is_geographic {
        let (_, min_y, _, max_y) = mask.bounds();
        let center_lat = ((min_y + max_y) / 2.0).to_radians();
        let w_m = gt.pixel_width.abs() * METERS_PER_DEG_LON_EQUATOR * center_lat.cos();
        let h_m = gt.pixel_height.abs() * METERS_PER_DEG_LAT;
        w_m * h_m
    } else {
        gt.cell_area()
    }
}
