//! PNG export of colormapped rasters.

use crate::render::{raster_to_rgba, ColormapParams};
use image::{ImageBuffer, Rgba};
use pestwatch_core::raster::{Raster, RasterElement};
use pestwatch_core::{Error, Result};
use std::path::Path;

/// Render a raster through a colormap and write it as a PNG file.
pub fn render_png<T, P>(raster: &Raster<T>, params: &ColormapParams, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let (rows, cols) = raster.shape();
    let rgba = raster_to_rgba(raster, params);

    let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(cols as u32, rows as u32, rgba)
            .ok_or_else(|| Error::Other("RGBA buffer size mismatch".into()))?;

    buffer
        .save(path.as_ref())
        .map_err(|e| Error::Other(format!("writing PNG: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::ColorScheme;

    #[test]
    fn writes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk.png");

        let mut mask = Raster::<u8>::new(4, 4);
        mask.set(1, 1, 1).unwrap();

        let params = ColormapParams::with_range(ColorScheme::Risk, 0.0, 1.0);
        render_png(&mask, &params, &path).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 4);
    }
}
