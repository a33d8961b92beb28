//! Date-ordered stacks of pest-risk masks

use chrono::NaiveDate;
use pestwatch_core::io::read_geotiff;
use pestwatch_core::raster::Raster;
use pestwatch_core::{Error, Result};
use std::path::Path;

/// A date-ordered series of equally-shaped binary masks.
///
/// All masks must share one shape; the first pushed mask fixes it.
#[derive(Debug, Clone, Default)]
pub struct MaskSeries {
    entries: Vec<(NaiveDate, Raster<u8>)>,
}

impl MaskSeries {
    /// Create an empty series
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a mask, keeping the series date-ordered
    pub fn push(&mut self, date: NaiveDate, mask: Raster<u8>) -> Result<()> {
        if let Some((_, first)) = self.entries.first() {
            if first.shape() != mask.shape() {
                return Err(Error::SizeMismatch {
                    er: first.rows(),
                    ec: first.cols(),
                    ar: mask.rows(),
                    ac: mask.cols(),
                });
            }
        }
        let pos = self
            .entries
            .partition_point(|(d, _)| *d <= date);
        self.entries.insert(pos, (date, mask));
        Ok(())
    }

    /// Load all mask GeoTIFFs from a directory.
    ///
    /// Accepts `.tif`/`.tiff` files whose stem ends in an ISO date
    /// (`..._YYYY-MM-DD`), e.g. `pest_mask_2024-06-15.tif`; other files
    /// are ignored. Masks are ordered by date.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut series = Self::new();

        let mut paths: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("tif") | Some("tiff")
                )
            })
            .collect();
        paths.sort();

        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(date) = trailing_date(stem) else {
                continue;
            };
            let mask: Raster<u8> = read_geotiff(&path)?;
            series.push(date, mask)?;
        }

        if series.is_empty() {
            return Err(Error::Other(format!(
                "no dated mask files found in {}",
                dir.as_ref().display()
            )));
        }

        Ok(series)
    }

    /// Number of dates in the series
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shape shared by all masks, if any
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.entries.first().map(|(_, m)| m.shape())
    }

    /// Dates in ascending order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.entries.iter().map(|(d, _)| *d).collect()
    }

    /// Mask for a given position
    pub fn mask(&self, idx: usize) -> Option<&Raster<u8>> {
        self.entries.get(idx).map(|(_, m)| m)
    }

    /// Iterate over (date, mask) pairs in date order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &Raster<u8>)> {
        self.entries.iter().map(|(d, m)| (*d, m))
    }
}

/// Parse the trailing `YYYY-MM-DD` of a file stem
fn trailing_date(stem: &str) -> Option<NaiveDate> {
    if stem.len() < 10 {
        return None;
    }
    NaiveDate::parse_from_str(&stem[stem.len() - 10..], "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pestwatch_core::io::write_geotiff;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn push_keeps_date_order() {
        let mut series = MaskSeries::new();
        series.push(date("2024-06-11"), Raster::new(3, 3)).unwrap();
        series.push(date("2024-06-01"), Raster::new(3, 3)).unwrap();
        series.push(date("2024-06-21"), Raster::new(3, 3)).unwrap();

        assert_eq!(
            series.dates(),
            vec![date("2024-06-01"), date("2024-06-11"), date("2024-06-21")]
        );
    }

    #[test]
    fn push_rejects_shape_mismatch() {
        let mut series = MaskSeries::new();
        series.push(date("2024-06-01"), Raster::new(3, 3)).unwrap();
        assert!(series.push(date("2024-06-11"), Raster::new(4, 3)).is_err());
    }

    #[test]
    fn trailing_date_parsing() {
        assert_eq!(
            trailing_date("pest_mask_2024-06-15"),
            Some(date("2024-06-15"))
        );
        assert_eq!(trailing_date("pest_mask_june"), None);
        assert_eq!(trailing_date("x"), None);
    }

    #[test]
    fn load_dir_reads_dated_masks() {
        let dir = tempfile::tempdir().unwrap();

        for (d, cell) in [("2024-06-11", (1, 1)), ("2024-06-01", (0, 0))] {
            let mut mask: Raster<u8> = Raster::new(4, 4);
            mask.set(cell.0, cell.1, 1).unwrap();
            write_geotiff(&mask, dir.path().join(format!("pest_mask_{}.tif", d))).unwrap();
        }
        // A file without a date suffix is ignored
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let series = MaskSeries::load_dir(dir.path()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.dates()[0], date("2024-06-01"));
        assert_eq!(series.mask(0).unwrap().get(0, 0).unwrap(), 1);
        assert_eq!(series.mask(1).unwrap().get(1, 1).unwrap(), 1);
    }

    #[test]
    fn load_dir_without_masks_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MaskSeries::load_dir(dir.path()).is_err());
    }
}
