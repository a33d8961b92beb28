//! Per-pixel time series extraction and CSV round-trip

use crate::timeseries::MaskSeries;
use chrono::NaiveDate;
use ndarray::Array2;
use pestwatch_core::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

/// Per-pixel binary time series: one row per pixel, one column per date.
///
/// `pixel_ids` are row-major flat indices into the source mask grid, so a
/// series sampled down to a pixel subset still maps back onto the raster.
#[derive(Debug, Clone)]
pub struct PixelSeries {
    dates: Vec<NaiveDate>,
    pixel_ids: Vec<usize>,
    /// (pixel, time) values
    values: Array2<u8>,
}

impl PixelSeries {
    /// Extract the per-pixel series from a mask stack.
    pub fn from_masks(series: &MaskSeries) -> Result<Self> {
        let (rows, cols) = series
            .shape()
            .ok_or_else(|| Error::Other("empty mask series".into()))?;
        let n_pixels = rows * cols;
        let n_dates = series.len();

        let mut values = Array2::zeros((n_pixels, n_dates));
        for (t, (_, mask)) in series.iter().enumerate() {
            for (i, &v) in mask.data().iter().enumerate() {
                values[(i, t)] = v;
            }
        }

        Ok(Self {
            dates: series.dates(),
            pixel_ids: (0..n_pixels).collect(),
            values,
        })
    }

    /// Dates in ascending order
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Flat pixel ids, one per row
    pub fn pixel_ids(&self) -> &[usize] {
        &self.pixel_ids
    }

    /// Number of pixels (rows)
    pub fn n_pixels(&self) -> usize {
        self.values.nrows()
    }

    /// Number of time steps (columns)
    pub fn n_steps(&self) -> usize {
        self.values.ncols()
    }

    /// Value for a (pixel row, time step)
    pub fn value(&self, pixel: usize, step: usize) -> Option<u8> {
        self.values.get((pixel, step)).copied()
    }

    /// One pixel's full series
    pub fn row(&self, pixel: usize) -> Option<Vec<u8>> {
        if pixel >= self.n_pixels() {
            return None;
        }
        Some(self.values.row(pixel).to_vec())
    }

    /// Write the series as CSV: `pixel_id` column plus one column per date.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())
            .map_err(|e| Error::Other(format!("opening pixel CSV: {}", e)))?;

        let mut header = vec!["pixel_id".to_string()];
        header.extend(self.dates.iter().map(|d| d.to_string()));
        writer
            .write_record(&header)
            .map_err(|e| Error::Other(format!("writing pixel CSV header: {}", e)))?;

        for (row, &pixel_id) in self.pixel_ids.iter().enumerate() {
            let mut record = vec![pixel_id.to_string()];
            record.extend(self.values.row(row).iter().map(|v| v.to_string()));
            writer
                .write_record(&record)
                .map_err(|e| Error::Other(format!("writing pixel CSV row: {}", e)))?;
        }

        writer
            .flush()
            .map_err(|e| Error::Other(format!("flushing pixel CSV: {}", e)))?;
        Ok(())
    }

    /// Read a series back from CSV written by [`Self::write_csv`].
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())
            .map_err(|e| Error::Other(format!("opening pixel CSV: {}", e)))?;

        let headers = reader
            .headers()
            .map_err(|e| Error::Other(format!("reading pixel CSV header: {}", e)))?
            .clone();
        if headers.get(0) != Some("pixel_id") {
            return Err(Error::Other("pixel CSV missing pixel_id column".into()));
        }

        let dates: Vec<NaiveDate> = headers
            .iter()
            .skip(1)
            .map(|h| {
                NaiveDate::parse_from_str(h, "%Y-%m-%d")
                    .map_err(|e| Error::Other(format!("bad date column '{}': {}", h, e)))
            })
            .collect::<Result<_>>()?;

        let mut pixel_ids = Vec::new();
        let mut flat: Vec<u8> = Vec::new();

        for (row_no, record) in reader.records().enumerate() {
            let record =
                record.map_err(|e| Error::Other(format!("pixel CSV row {}: {}", row_no, e)))?;
            if record.len() != dates.len() + 1 {
                return Err(Error::Other(format!(
                    "pixel CSV row {} has {} fields, expected {}",
                    row_no,
                    record.len(),
                    dates.len() + 1
                )));
            }

            let id: usize = record[0]
                .parse()
                .map_err(|e| Error::Other(format!("bad pixel_id in row {}: {}", row_no, e)))?;
            pixel_ids.push(id);

            for field in record.iter().skip(1) {
                let v: u8 = field
                    .parse()
                    .map_err(|e| Error::Other(format!("bad value in row {}: {}", row_no, e)))?;
                flat.push(v);
            }
        }

        let values = Array2::from_shape_vec((pixel_ids.len(), dates.len()), flat)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            dates,
            pixel_ids,
            values,
        })
    }
}

/// Take a deterministic random subset of pixels without replacement.
///
/// `fraction` in (0, 1]; the subset keeps the original pixel ids and is
/// returned in ascending id order. At least one pixel is always kept.
pub fn sample_pixels(series: &PixelSeries, fraction: f64, seed: u64) -> Result<PixelSeries> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(Error::InvalidParameter {
            name: "fraction",
            value: fraction.to_string(),
            reason: "sampling fraction must be in (0, 1]".to_string(),
        });
    }

    let n = series.n_pixels();
    let amount = ((n as f64 * fraction) as usize).max(1).min(n);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked: Vec<usize> = rand::seq::index::sample(&mut rng, n, amount).into_vec();
    picked.sort_unstable();

    let mut values = Array2::zeros((picked.len(), series.n_steps()));
    let mut pixel_ids = Vec::with_capacity(picked.len());
    for (out_row, &src_row) in picked.iter().enumerate() {
        pixel_ids.push(series.pixel_ids[src_row]);
        for t in 0..series.n_steps() {
            values[(out_row, t)] = series.values[(src_row, t)];
        }
    }

    Ok(PixelSeries {
        dates: series.dates.clone(),
        pixel_ids,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pestwatch_core::raster::Raster;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn small_series() -> MaskSeries {
        let mut series = MaskSeries::new();
        let mut m1: Raster<u8> = Raster::new(2, 2);
        m1.set(0, 1, 1).unwrap();
        let mut m2: Raster<u8> = Raster::new(2, 2);
        m2.set(0, 1, 1).unwrap();
        m2.set(1, 0, 1).unwrap();
        series.push(date("2024-06-01"), m1).unwrap();
        series.push(date("2024-06-11"), m2).unwrap();
        series
    }

    #[test]
    fn extraction_is_row_major() {
        let pixels = PixelSeries::from_masks(&small_series()).unwrap();
        assert_eq!(pixels.n_pixels(), 4);
        assert_eq!(pixels.n_steps(), 2);

        // Pixel 1 is (0,1): flagged on both dates
        assert_eq!(pixels.row(1).unwrap(), vec![1, 1]);
        // Pixel 2 is (1,0): flagged only on the second date
        assert_eq!(pixels.row(2).unwrap(), vec![0, 1]);
        // Pixel 0 never flagged
        assert_eq!(pixels.row(0).unwrap(), vec![0, 0]);
    }

    #[test]
    fn csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel_timeseries.csv");

        let pixels = PixelSeries::from_masks(&small_series()).unwrap();
        pixels.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("pixel_id,2024-06-01,2024-06-11"));

        let back = PixelSeries::read_csv(&path).unwrap();
        assert_eq!(back.n_pixels(), 4);
        assert_eq!(back.dates(), pixels.dates());
        assert_eq!(back.row(2).unwrap(), vec![0, 1]);
        assert_eq!(back.pixel_ids(), pixels.pixel_ids());
    }

    #[test]
    fn sampling_is_deterministic() {
        let mut series = MaskSeries::new();
        let mut mask: Raster<u8> = Raster::new(10, 10);
        mask.set(3, 3, 1).unwrap();
        series.push(date("2024-06-01"), mask).unwrap();

        let pixels = PixelSeries::from_masks(&series).unwrap();
        let a = sample_pixels(&pixels, 0.2, 42).unwrap();
        let b = sample_pixels(&pixels, 0.2, 42).unwrap();

        assert_eq!(a.n_pixels(), 20);
        assert_eq!(a.pixel_ids(), b.pixel_ids());
        // Sorted ascending, no duplicates
        assert!(a.pixel_ids().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sampling_keeps_at_least_one_pixel() {
        let pixels = PixelSeries::from_masks(&small_series()).unwrap();
        let sampled = sample_pixels(&pixels, 0.01, 7).unwrap();
        assert_eq!(sampled.n_pixels(), 1);
    }

    #[test]
    fn bad_fraction_rejected() {
        let pixels = PixelSeries::from_masks(&small_series()).unwrap();
        assert!(sample_pixels(&pixels, 0.0, 1).is_err());
        assert!(sample_pixels(&pixels, 1.5, 1).is_err());
    }
}
