//! Imagery analysis algorithms
//!
//! Spectral index computation and index post-processing:
//! - NDVI, EVI and the SWIR-based NDWI used by the risk workflow
//! - Generic normalized difference between two bands
//! - Index normalization to 8-bit and threshold labeling

mod indices;
mod normalize;

pub(crate) use indices::build_output;
pub use indices::{
    evi, ndvi, ndwi, normalized_difference, scene_indices, EviParams, SceneIndices,
};
pub use normalize::{normalize_index, threshold_label};
