//! Raster grid types and georeferencing

mod band;
mod element;
mod geotransform;
mod grid;

pub use band::{Band, BandStack};
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
