//! Scene download: fetch band assets for STAC items into a directory tree.
//!
//! Layout: `<outdir>/<acquisition-date>/<BAND>.tif`, one folder per scene.
//! Downloads are idempotent (an existing file is skipped) and transient
//! failures retry with exponential backoff, so an interrupted bulk
//! acquisition can simply be rerun.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{FuturesOrdered, StreamExt};
use tracing::{info, warn};

use crate::error::{CloudError, Result};
use crate::stac_client::StacClient;
use crate::stac_models::StacItem;
use pestwatch_core::raster::Band;

/// Configuration for [`SceneDownloader`].
#[derive(Debug, Clone)]
pub struct SceneDownloaderOptions {
    /// Bands to fetch per item (default: all nine workflow bands).
    pub bands: Vec<Band>,
    /// Maximum retries per asset on transient failures (default 3).
    pub max_retries: u32,
    /// Re-download files that already exist (default false).
    pub overwrite: bool,
}

impl Default for SceneDownloaderOptions {
    fn default() -> Self {
        Self {
            bands: Band::ALL.to_vec(),
            max_retries: 3,
            overwrite: false,
        }
    }
}

/// Outcome counts of a bulk download.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// Assets fetched and written.
    pub downloaded: usize,
    /// Assets skipped because the file already existed.
    pub skipped: usize,
    /// Descriptions of assets that failed after all retries.
    pub failed: Vec<String>,
}

impl DownloadReport {
    /// Whether every requested asset was fetched or already present.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Downloads band assets of STAC items.
pub struct SceneDownloader<'a> {
    client: &'a StacClient,
    options: SceneDownloaderOptions,
}

impl<'a> SceneDownloader<'a> {
    /// Create a downloader sharing the client's HTTP stack and catalog
    /// signing rules.
    pub fn new(client: &'a StacClient, options: SceneDownloaderOptions) -> Self {
        Self { client, options }
    }

    /// Download the configured bands of every item into `outdir`.
    ///
    /// Failures on individual assets are collected in the report rather
    /// than aborting the whole acquisition.
    pub async fn download_items<P: AsRef<Path>>(
        &self,
        items: &[StacItem],
        outdir: P,
    ) -> Result<DownloadReport> {
        let outdir = outdir.as_ref();
        std::fs::create_dir_all(outdir)?;

        let mut report = DownloadReport::default();

        for (idx, item) in items.iter().enumerate() {
            let scene_dir = outdir.join(scene_dir_name(item));
            std::fs::create_dir_all(&scene_dir)?;

            info!(
                item = %item.id,
                progress = format!("{}/{}", idx + 1, items.len()),
                "fetching scene"
            );

            let mut futs = FuturesOrdered::new();
            for &band in &self.options.bands {
                futs.push_back(self.download_band(item, band, &scene_dir));
            }

            while let Some(outcome) = futs.next().await {
                match outcome {
                    Ok(Outcome::Downloaded) => report.downloaded += 1,
                    Ok(Outcome::Skipped) => report.skipped += 1,
                    Err(e) => {
                        warn!(item = %item.id, error = %e, "asset download failed");
                        report.failed.push(format!("{}: {}", item.id, e));
                    }
                }
            }
        }

        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed.len(),
            "scene download finished"
        );
        Ok(report)
    }

    async fn download_band(
        &self,
        item: &StacItem,
        band: Band,
        scene_dir: &Path,
    ) -> Result<Outcome> {
        let asset = item.band_asset(band).ok_or_else(|| CloudError::MissingAsset {
            item: item.id.clone(),
            band: band.code().to_string(),
        })?;

        let path = band_path(scene_dir, band, &asset.href);
        if path.exists() && !self.options.overwrite {
            return Ok(Outcome::Skipped);
        }

        let href = self.client.sign_asset_href(&asset.href).await?;
        let bytes = self.fetch_with_retry(&href).await?;

        std::fs::write(&path, &bytes)?;
        Ok(Outcome::Downloaded)
    }

    /// Fetch a whole asset with exponential backoff on transient failures.
    async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_err = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                tokio::time::sleep(delay).await;
            }

            match self.client.http().get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp.bytes().await?.to_vec());
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_err = Some(CloudError::Network(format!("HTTP {} fetching {}", status, url)));
                    // Client errors will not heal on retry
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = Some(CloudError::Http(e));
                }
                Err(e) => return Err(CloudError::Http(e)),
            }
        }

        Err(last_err.unwrap_or_else(|| CloudError::Network(format!("fetch failed: {}", url))))
    }
}

enum Outcome {
    Downloaded,
    Skipped,
}

/// Scene folder name: acquisition date when parseable, item id otherwise.
fn scene_dir_name(item: &StacItem) -> String {
    item.acquisition_date()
        .map(|d| d.to_string())
        .unwrap_or_else(|| item.id.clone())
}

/// Band file path, keeping the asset's extension (`.tif` by default).
fn band_path(scene_dir: &Path, band: Band, href: &str) -> PathBuf {
    let ext = href
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| ext.len() <= 4)
        .unwrap_or("tif");
    scene_dir.join(format!("{}.{}", band.code(), ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stac_client::{StacCatalog, StacClientOptions};
    use crate::stac_models::StacItemCollection;

    const ITEM_JSON: &str = r#"{
      "type": "FeatureCollection",
      "features": [{
        "type": "Feature",
        "id": "S2A_43PGP_20240615_0_L2A",
        "properties": { "datetime": "2024-06-15T05:11:42Z" },
        "assets": {
          "red": { "href": "https://example.com/a/B04.tif" },
          "nir": { "href": "https://example.com/a/B08.jp2" }
        },
        "links": []
      }],
      "links": []
    }"#;

    fn item() -> StacItem {
        let col: StacItemCollection = serde_json::from_str(ITEM_JSON).unwrap();
        col.features.into_iter().next().unwrap()
    }

    #[test]
    fn scene_dir_uses_acquisition_date() {
        assert_eq!(scene_dir_name(&item()), "2024-06-15");
    }

    #[test]
    fn band_path_keeps_extension() {
        let dir = Path::new("/data/raw/2024-06-15");
        assert_eq!(
            band_path(dir, Band::Red, "https://example.com/a/B04.tif"),
            dir.join("B04.tif")
        );
        assert_eq!(
            band_path(dir, Band::Nir, "https://example.com/a/B08.jp2"),
            dir.join("B08.jp2")
        );
        assert_eq!(
            band_path(dir, Band::Green, "https://example.com/a/B03"),
            dir.join("B03.tif")
        );
    }

    #[test]
    fn missing_asset_is_reported() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let client = StacClient::new(StacCatalog::EarthSearch, StacClientOptions::default()).unwrap();
        let downloader = SceneDownloader::new(
            &client,
            SceneDownloaderOptions {
                bands: vec![Band::Swir2],
                max_retries: 0,
                overwrite: false,
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let report = rt
            .block_on(downloader.download_items(&[item()], dir.path()))
            .unwrap();

        assert_eq!(report.downloaded, 0);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].contains("B12"));
        assert!(!report.is_complete());
    }

    #[test]
    fn existing_file_is_skipped() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let client = StacClient::new(StacCatalog::EarthSearch, StacClientOptions::default()).unwrap();
        let downloader = SceneDownloader::new(
            &client,
            SceneDownloaderOptions {
                bands: vec![Band::Red],
                max_retries: 0,
                overwrite: false,
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let scene_dir = dir.path().join("2024-06-15");
        std::fs::create_dir_all(&scene_dir).unwrap();
        std::fs::write(scene_dir.join("B04.tif"), b"cached").unwrap();

        let report = rt
            .block_on(downloader.download_items(&[item()], dir.path()))
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.downloaded, 0);
        assert!(report.is_complete());
    }
}
