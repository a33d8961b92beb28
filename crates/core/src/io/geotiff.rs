//! Native GeoTIFF reading and writing via the `tiff` crate.
//!
//! Three product layouts are supported:
//! - single-band files (index grids, masks, labels),
//! - pixel-interleaved multi-sample scenes (the 9-band FLOAT32 products
//!   the acquisition service returns),
//! - band-per-page scenes (what [`write_scene`] produces).
//!
//! Georeferencing is carried through ModelPixelScale and ModelTiepoint
//! tags plus a minimal GeoKeyDirectory. Float rasters are written as
//! 32-bit grayscale, integer rasters as 8-bit grayscale (masks and labels
//! only use 0/1).

use crate::error::{Error, Result};
use crate::raster::{Band, BandStack, GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, Gray8};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: Tag = Tag::Unknown(33550);
const MODEL_TIEPOINT: Tag = Tag::Unknown(33922);
const GEO_KEY_DIRECTORY: Tag = Tag::Unknown(34735);

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read a single-band GeoTIFF file into a Raster.
///
/// For multi-sample files this reads the first sample; use [`read_scene`]
/// for full band stacks.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let mut decoder = new_decoder(file)?;
    decode_band(&mut decoder, 0)
}

/// Read a single-band GeoTIFF from an in-memory buffer.
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    let mut decoder = new_decoder(Cursor::new(data))?;
    decode_band(&mut decoder, 0)
}

/// Read a multi-band scene into a [`BandStack`].
///
/// Pixel-interleaved files map samples to [`Band::ALL`] in product order
/// (B02..B12); band-per-page files map pages the same way.
pub fn read_scene<P: AsRef<Path>>(path: P) -> Result<BandStack> {
    let file = File::open(path.as_ref())?;
    let mut decoder = new_decoder(file)?;

    let samples = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize;

    let mut stack = BandStack::new();

    if samples > 1 {
        if samples > Band::ALL.len() {
            return Err(Error::UnsupportedDataType(format!(
                "scene has {} samples per pixel, at most {} bands supported",
                samples,
                Band::ALL.len()
            )));
        }
        for i in 0..samples {
            let raster = decode_band(&mut decoder, i)?;
            stack.insert(Band::ALL[i], raster)?;
        }
        return Ok(stack);
    }

    // Band-per-page layout
    let mut page = 0;
    loop {
        if page >= Band::ALL.len() {
            return Err(Error::UnsupportedDataType(format!(
                "scene has more than {} pages",
                Band::ALL.len()
            )));
        }
        let raster = decode_band(&mut decoder, 0)?;
        stack.insert(Band::ALL[page], raster)?;
        page += 1;

        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .map_err(|e| Error::Other(format!("TIFF page advance error: {}", e)))?;
    }

    Ok(stack)
}

fn new_decoder<R: std::io::Read + std::io::Seek>(reader: R) -> Result<Decoder<R>> {
    Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))
}

/// Decode one sample plane of the current TIFF page.
///
/// `sample` selects the plane of a pixel-interleaved image; single-sample
/// images must pass 0.
fn decode_band<T, R>(decoder: &mut Decoder<R>, sample: usize) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;
    let samples = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize;

    if sample >= samples {
        return Err(Error::UnsupportedDataType(format!(
            "sample {} requested from a {}-sample image",
            sample, samples
        )));
    }

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => deinterleave(&buf, samples, sample),
        DecodingResult::F64(buf) => deinterleave(&buf, samples, sample),
        DecodingResult::U8(buf) => deinterleave(&buf, samples, sample),
        DecodingResult::U16(buf) => deinterleave(&buf, samples, sample),
        DecodingResult::U32(buf) => deinterleave(&buf, samples, sample),
        DecodingResult::I8(buf) => deinterleave(&buf, samples, sample),
        DecodingResult::I16(buf) => deinterleave(&buf, samples, sample),
        DecodingResult::I32(buf) => deinterleave(&buf, samples, sample),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(decoder) {
        raster.set_transform(transform);
    }

    Ok(raster)
}

fn deinterleave<S, T>(buf: &[S], samples: usize, sample: usize) -> Vec<T>
where
    S: Copy + num_traits::NumCast,
    T: RasterElement,
{
    buf.iter()
        .skip(sample)
        .step_by(samples)
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Attempt to read a GeoTransform from TIFF tags
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(MODEL_PIXEL_SCALE)
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(MODEL_TIEPOINT)
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        let pixel_width = scale[0];
        let pixel_height = -scale[1]; // Negative for north-up

        return Ok(GeoTransform::new(origin_x, origin_y, pixel_width, pixel_height));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write a Raster to a GeoTIFF file.
///
/// Floating-point cell types are written as 32-bit float grayscale,
/// integer types as 8-bit grayscale.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut encoder = new_encoder(file)?;
    encode_band(&mut encoder, raster)
}

/// Write a Raster to an in-memory GeoTIFF buffer.
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    let mut encoder = new_encoder(Cursor::new(&mut buf))?;
    encode_band(&mut encoder, raster)?;
    drop(encoder);
    Ok(buf)
}

/// Write a [`BandStack`] as a band-per-page GeoTIFF.
///
/// Pages are written in [`Band::ALL`] product order for the bands present.
pub fn write_scene<P: AsRef<Path>>(stack: &BandStack, path: P) -> Result<()> {
    if stack.is_empty() {
        return Err(Error::Other("cannot write an empty scene".into()));
    }

    let file = File::create(path.as_ref())?;
    let mut encoder = new_encoder(file)?;

    for &band in Band::ALL {
        if let Some(raster) = stack.get(band) {
            encode_band(&mut encoder, raster)?;
        }
    }

    Ok(())
}

fn new_encoder<W: std::io::Write + std::io::Seek>(writer: W) -> Result<TiffEncoder<W>> {
    TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))
}

fn encode_band<T, W>(encoder: &mut TiffEncoder<W>, raster: &Raster<T>) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let (rows, cols) = raster.shape();

    if T::is_float() {
        let data: Vec<f32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
            .collect();

        let mut image = encoder
            .new_image::<Gray32Float>(cols as u32, rows as u32)
            .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;
        write_geo_tags(&mut image, raster.transform())?;
        image
            .write_data(&data)
            .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;
    } else {
        let data: Vec<u8> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(0u8))
            .collect();

        let mut image = encoder
            .new_image::<Gray8>(cols as u32, rows as u32)
            .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;
        write_geo_tags(&mut image, raster.transform())?;
        image
            .write_data(&data)
            .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;
    }

    Ok(())
}

fn write_geo_tags<W, C, K>(
    image: &mut tiff::encoder::ImageEncoder<'_, W, C, K>,
    gt: &GeoTransform,
) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
    C: tiff::encoder::colortype::ColorType,
    K: tiff::encoder::TiffKind,
{
    // ModelPixelScaleTag
    let scale = vec![gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, scale.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    // ModelTiepointTag
    let tiepoint = vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, tiepoint.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // Minimal GeoKeyDirectory: GTModelTypeGeoKey=2 (Geographic),
    // GTRasterTypeGeoKey=1 (RasterPixelIsArea).
    let geokeys: Vec<u16> = vec![
        1, 1, 0, 2, // Version 1.1.0, 2 keys
        1024, 0, 1, 2, // GTModelTypeGeoKey = ModelTypeGeographic
        1025, 0, 1, 1, // GTRasterTypeGeoKey = RasterPixelIsArea
    ];
    image
        .encoder()
        .write_tag(GEO_KEY_DIRECTORY, geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_raster() -> Raster<f64> {
        let mut r = Raster::new(8, 6);
        r.set_transform(GeoTransform::from_bounds(79.0, 10.57, 79.047, 10.617, 6, 8));
        for row in 0..8 {
            for col in 0..6 {
                r.set(row, col, (row * 6 + col) as f64 * 0.01).unwrap();
            }
        }
        r
    }

    #[test]
    fn float_roundtrip_buffer() {
        let raster = sample_raster();
        let buf = write_geotiff_to_buffer(&raster).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(back.shape(), (8, 6));
        for row in 0..8 {
            for col in 0..6 {
                assert_relative_eq!(
                    back.get(row, col).unwrap(),
                    raster.get(row, col).unwrap(),
                    epsilon = 1e-6
                );
            }
        }
    }

    #[test]
    fn geotransform_roundtrip() {
        let raster = sample_raster();
        let buf = write_geotiff_to_buffer(&raster).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf).unwrap();

        let gt = back.transform();
        assert_relative_eq!(gt.origin_x, 79.0, epsilon = 1e-9);
        assert_relative_eq!(gt.origin_y, 10.617, epsilon = 1e-9);
        assert!(gt.pixel_height < 0.0);
    }

    #[test]
    fn mask_roundtrip_as_u8() {
        let mut mask: Raster<u8> = Raster::new(4, 4);
        mask.set(1, 1, 1).unwrap();
        mask.set(2, 3, 1).unwrap();

        let buf = write_geotiff_to_buffer(&mask).unwrap();
        let back: Raster<u8> = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(back.get(1, 1).unwrap(), 1);
        assert_eq!(back.get(2, 3).unwrap(), 1);
        assert_eq!(back.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn scene_roundtrip_band_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.tif");

        let mut stack = BandStack::new();
        for (i, &band) in Band::ALL.iter().enumerate() {
            let mut r = Raster::filled(5, 5, 0.1 * (i + 1) as f64);
            r.set_transform(GeoTransform::from_bounds(79.0, 10.57, 79.047, 10.617, 5, 5));
            stack.insert(band, r).unwrap();
        }

        write_scene(&stack, &path).unwrap();
        let back = read_scene(&path).unwrap();

        assert_eq!(back.len(), 9);
        let nir = back.require(Band::Nir).unwrap();
        assert_relative_eq!(nir.get(2, 2).unwrap(), 0.7, epsilon = 1e-6);
    }

    #[test]
    fn empty_scene_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.tif");
        assert!(write_scene(&BandStack::new(), &path).is_err());
    }
}
