//! Boolean refinement of per-index anomaly masks

use crate::maybe_rayon::*;
use ndarray::Array2;
use pestwatch_core::raster::Raster;
use pestwatch_core::{Error, Result};

/// Combine per-index anomaly masks into the refined pest-risk mask.
///
/// A pixel is flagged where the NDVI anomaly is set and neither the EVI
/// nor the NDWI anomaly is: vegetation-vigor loss that is not explained
/// by canopy-wide stress (EVI) or moisture change (NDWI) is treated as
/// likely pest or disease pressure.
pub fn refine_pest_mask(
    ndvi_mask: &Raster<u8>,
    evi_mask: &Raster<u8>,
    ndwi_mask: &Raster<u8>,
) -> Result<Raster<u8>> {
    let (rows, cols) = ndvi_mask.shape();
    for other in [evi_mask, ndwi_mask] {
        if other.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: other.rows(),
                ac: other.cols(),
            });
        }
    }

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for col in 0..cols {
                let ndvi = unsafe { ndvi_mask.get_unchecked(row, col) };
                let evi = unsafe { evi_mask.get_unchecked(row, col) };
                let ndwi = unsafe { ndwi_mask.get_unchecked(row, col) };

                if ndvi == 1 && !(evi == 1 || ndwi == 1) {
                    row_data[col] = 1;
                }
            }
            row_data
        })
        .collect();

    let mut output = ndvi_mask.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
