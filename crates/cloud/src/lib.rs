//! # PestWatch Cloud
//!
//! STAC catalog access for the acquisition side of the workflow:
//! searching Sentinel-2 L2A items over a bounding box and date range,
//! and downloading the band assets each scene needs into a local
//! directory tree.
//!
//! Searches hit the STAC Item Search endpoint (`POST /search`) with
//! retry and pagination; Planetary Computer asset hrefs are signed via
//! its SAS endpoint. Downloads are idempotent (existing files are
//! skipped) and retried with exponential backoff.

pub mod download;
pub mod error;
pub mod stac_client;
pub mod stac_models;

pub mod sync_api;

pub use download::{DownloadReport, SceneDownloader, SceneDownloaderOptions};
pub use error::{CloudError, Result};
pub use stac_client::{StacCatalog, StacClient, StacClientOptions};
pub use stac_models::{StacAsset, StacItem, StacItemCollection, StacSearchParams};

/// Blocking API re-exported as `blocking` module (native only).
#[cfg(feature = "native")]
pub mod blocking {
    pub use crate::sync_api::*;
}
