//! Blocking (synchronous) API for native platforms.
//!
//! Wraps the async client and downloader with a current-thread Tokio
//! runtime so callers (the CLI in particular) don't manage their own
//! async runtime.

#[cfg(feature = "native")]
mod inner {
    use std::path::Path;

    use crate::download::{DownloadReport, SceneDownloader, SceneDownloaderOptions};
    use crate::error::{CloudError, Result};
    use crate::stac_client::{StacCatalog, StacClient, StacClientOptions};
    use crate::stac_models::{StacItem, StacItemCollection, StacSearchParams};

    fn runtime() -> Result<tokio::runtime::Runtime> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))
    }

    /// Blocking wrapper around [`StacClient`].
    pub struct StacClientBlocking {
        rt: tokio::runtime::Runtime,
        inner: StacClient,
    }

    impl StacClientBlocking {
        /// Create a new blocking STAC client.
        pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
            let rt = runtime()?;
            let inner = StacClient::new(catalog, options)?;
            Ok(Self { rt, inner })
        }

        /// Execute a single search request (blocking).
        pub fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
            self.rt.block_on(self.inner.search(params))
        }

        /// Search with automatic pagination (blocking).
        pub fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
            self.rt.block_on(self.inner.search_all(params))
        }

        /// Download band assets of the given items (blocking).
        pub fn download_items<P: AsRef<Path>>(
            &self,
            items: &[StacItem],
            outdir: P,
            options: SceneDownloaderOptions,
        ) -> Result<DownloadReport> {
            let downloader = SceneDownloader::new(&self.inner, options);
            self.rt.block_on(downloader.download_items(items, outdir))
        }
    }

    /// One-shot: search a catalog and download every matching scene.
    pub fn fetch_scenes<P: AsRef<Path>>(
        catalog: StacCatalog,
        params: &StacSearchParams,
        outdir: P,
        options: SceneDownloaderOptions,
    ) -> Result<(Vec<StacItem>, DownloadReport)> {
        let client = StacClientBlocking::new(catalog, StacClientOptions::default())?;
        let items = client.search_all(params)?;
        let report = client.download_items(&items, outdir, options)?;
        Ok((items, report))
    }
}

#[cfg(feature = "native")]
pub use inner::*;
