//! Sliding-window sequence construction
//!
//! Turns per-pixel series into (window, label) pairs for sequence
//! forecasting: each window holds `seq_length` consecutive steps and the
//! label is the value `pred_step` steps past the window's end. Training a
//! model on these is out of scope here; this is the dataset side.

use crate::timeseries::PixelSeries;
use pestwatch_core::{Error, Result};

/// One training sample: a window of one pixel's series plus its label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSample {
    /// Flat pixel id in the source raster
    pub pixel_id: usize,
    /// Index of the window's first time step
    pub start: usize,
    /// `seq_length` consecutive values
    pub values: Vec<u8>,
    /// Value at `start + seq_length + pred_step - 1`
    pub label: u8,
}

/// All samples produced from a pixel series
#[derive(Debug, Clone)]
pub struct SequenceSet {
    pub seq_length: usize,
    pub pred_step: usize,
    pub samples: Vec<SequenceSample>,
}

impl SequenceSet {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the set holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Share of samples with a positive label, for class-balance checks
    pub fn positive_fraction(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let positives = self.samples.iter().filter(|s| s.label == 1).count();
        positives as f64 / self.samples.len() as f64
    }

    /// The most recent window of each pixel, the input for a
    /// next-step forecast.
    pub fn latest_windows(series: &PixelSeries, seq_length: usize) -> Result<Vec<SequenceSample>> {
        if seq_length == 0 || seq_length > series.n_steps() {
            return Err(Error::InvalidParameter {
                name: "seq_length",
                value: seq_length.to_string(),
                reason: format!("series has {} steps", series.n_steps()),
            });
        }
        let start = series.n_steps() - seq_length;
        let mut windows = Vec::with_capacity(series.n_pixels());
        for (row, &pixel_id) in series.pixel_ids().iter().enumerate() {
            let values: Vec<u8> = (start..series.n_steps())
                .map(|t| series.value(row, t).unwrap_or(0))
                .collect();
            windows.push(SequenceSample {
                pixel_id,
                start,
                values,
                label: 0,
            });
        }
        Ok(windows)
    }
}

/// Build sliding-window samples from a pixel series.
///
/// For each pixel, windows start at every `t` with
/// `t + seq_length + pred_step - 1 < n_steps`; the label is the value at
/// that offset. Errors when the series is too short for one window.
pub fn make_sequences(
    series: &PixelSeries,
    seq_length: usize,
    pred_step: usize,
) -> Result<SequenceSet> {
    if seq_length == 0 {
        return Err(Error::InvalidParameter {
            name: "seq_length",
            value: "0".to_string(),
            reason: "window length must be at least 1".to_string(),
        });
    }
    if pred_step == 0 {
        return Err(Error::InvalidParameter {
            name: "pred_step",
            value: "0".to_string(),
            reason: "prediction step must be at least 1".to_string(),
        });
    }

    let n_steps = series.n_steps();
    if n_steps < seq_length + pred_step {
        return Err(Error::InvalidParameter {
            name: "seq_length",
            value: seq_length.to_string(),
            reason: format!(
                "series has {} steps, need at least {}",
                n_steps,
                seq_length + pred_step
            ),
        });
    }

    let windows_per_pixel = n_steps - seq_length - pred_step + 1;
    let mut samples = Vec::with_capacity(series.n_pixels() * windows_per_pixel);

    for (row, &pixel_id) in series.pixel_ids().iter().enumerate() {
        for start in 0..windows_per_pixel {
            let values: Vec<u8> = (start..start + seq_length)
                .map(|t| series.value(row, t).unwrap_or(0))
                .collect();
            let label = series
                .value(row, start + seq_length + pred_step - 1)
                .unwrap_or(0);
            samples.push(SequenceSample {
                pixel_id,
                start,
                values,
                label,
            });
        }
    }

    Ok(SequenceSet {
        seq_length,
        pred_step,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::MaskSeries;
    use chrono::NaiveDate;
    use pestwatch_core::raster::Raster;

    /// 1x1 masks tracing the series [0, 0, 1, 1, 0]
    fn single_pixel_series() -> PixelSeries {
        let mut series = MaskSeries::new();
        for (i, v) in [0u8, 0, 1, 1, 0].into_iter().enumerate() {
            let mut mask: Raster<u8> = Raster::new(1, 1);
            mask.set(0, 0, v).unwrap();
            let date = NaiveDate::from_ymd_opt(2024, 6, 1 + i as u32).unwrap();
            series.push(date, mask).unwrap();
        }
        PixelSeries::from_masks(&series).unwrap()
    }

    #[test]
    fn windows_and_labels() {
        let pixels = single_pixel_series();
        let set = make_sequences(&pixels, 2, 1).unwrap();

        // 5 steps, window 2, step 1 -> 3 windows
        assert_eq!(set.len(), 3);
        assert_eq!(set.samples[0].values, vec![0, 0]);
        assert_eq!(set.samples[0].label, 1);
        assert_eq!(set.samples[1].values, vec![0, 1]);
        assert_eq!(set.samples[1].label, 1);
        assert_eq!(set.samples[2].values, vec![1, 1]);
        assert_eq!(set.samples[2].label, 0);
    }

    #[test]
    fn pred_step_reaches_further() {
        let pixels = single_pixel_series();
        let set = make_sequences(&pixels, 2, 2).unwrap();

        assert_eq!(set.len(), 2);
        // Window [0,0], label at index 3 = 1
        assert_eq!(set.samples[0].label, 1);
        // Window [0,1], label at index 4 = 0
        assert_eq!(set.samples[1].label, 0);
    }

    #[test]
    fn positive_fraction() {
        let pixels = single_pixel_series();
        let set = make_sequences(&pixels, 2, 1).unwrap();
        assert!((set.positive_fraction() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn too_short_series_rejected() {
        let pixels = single_pixel_series();
        assert!(make_sequences(&pixels, 5, 1).is_err());
        assert!(make_sequences(&pixels, 0, 1).is_err());
        assert!(make_sequences(&pixels, 2, 0).is_err());
    }

    #[test]
    fn latest_windows_take_series_tail() {
        let pixels = single_pixel_series();
        let windows = SequenceSet::latest_windows(&pixels, 3).unwrap();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].values, vec![1, 1, 0]);
        assert_eq!(windows[0].start, 2);
    }
}
