//! # PestWatch Colormap
//!
//! Color mapping and raster rendering for PestWatch outputs: index grids,
//! anomaly scores and risk masks. Provides a small set of schemes tuned to
//! the workflow's products, a multi-stop interpolation engine, RGBA buffer
//! rendering, and PNG export.
//!
//! ## Usage
//!
//! ```ignore
//! use pestwatch_colormap::{ColorScheme, ColormapParams, raster_to_rgba};
//!
//! let params = ColormapParams::with_range(ColorScheme::Ndvi, -1.0, 1.0);
//! let rgba = raster_to_rgba(&ndvi, &params);
//! ```

mod png;
mod render;
mod scheme;

pub use png::render_png;
pub use render::{auto_params, raster_to_rgba, ColormapParams};
pub use scheme::{evaluate, ColorScheme, ColorStop, Rgb};
