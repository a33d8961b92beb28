//! Per-pixel time series over pest-risk masks
//!
//! - **series**: date-ordered stacks of binary masks
//! - **pixel**: per-pixel series extraction, CSV round-trip, sampling
//! - **sequence**: sliding-window dataset construction for forecasting

mod pixel;
mod sequence;
mod series;

pub use pixel::{sample_pixels, PixelSeries};
pub use sequence::{make_sequences, SequenceSample, SequenceSet};
pub use series::MaskSeries;
