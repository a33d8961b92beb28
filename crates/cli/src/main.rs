//! PestWatch CLI - Sentinel-2 pest-risk monitoring workflow

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pestwatch_algorithms::anomaly::{pest_risk_pipeline, PestRiskParams};
use pestwatch_algorithms::cloud::{apply_cloud_mask, detect_clouds, CloudScreenParams};
use pestwatch_algorithms::imagery::{normalize_index, scene_indices, threshold_label};
use pestwatch_algorithms::statistics::{risk_fraction, risk_summary, write_summary_csv};
use pestwatch_algorithms::timeseries::{MaskSeries, PixelSeries};
use pestwatch_algorithms::vectorize::write_geojson;
use pestwatch_cloud::blocking::StacClientBlocking;
use pestwatch_cloud::{SceneDownloaderOptions, StacCatalog, StacClientOptions, StacSearchParams};
use pestwatch_colormap::{auto_params, render_png, ColormapParams, ColorScheme};
use pestwatch_core::io::{read_geotiff, read_scene, write_geotiff};
use pestwatch_core::raster::{Band, BandStack, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pestwatch")]
#[command(author, version, about = "Sentinel-2 pest-risk monitoring", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Search a STAC catalog and download scene bands
    Fetch {
        /// Catalog: "es" (Earth Search), "pc" (Planetary Computer), or a URL
        #[arg(long, default_value = "es")]
        catalog: String,
        /// Bounding box: west south east north
        #[arg(long, num_args = 4, required = true, value_names = ["WEST", "SOUTH", "EAST", "NORTH"])]
        bbox: Vec<f64>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// STAC collection
        #[arg(long, default_value = "sentinel-2-l2a")]
        collection: String,
        /// Skip items above this cloud cover percentage
        #[arg(long)]
        max_cloud: Option<f64>,
        /// Maximum number of items to download
        #[arg(long, default_value = "200")]
        max_items: usize,
        /// Bands to download, comma-separated (default: all nine)
        #[arg(long)]
        bands: Option<String>,
        /// Output directory for scene folders
        #[arg(short, long, default_value = "data/raw")]
        outdir: PathBuf,
    },
    /// Compute NDVI/EVI/NDWI from a scene, with cloud screening
    Indices {
        /// Scene: multiband GeoTIFF or a directory of band files
        scene: PathBuf,
        /// Output base directory (a per-scene folder is created inside)
        #[arg(short, long, default_value = "data/indices")]
        outdir: PathBuf,
        /// Blue reflectance cloud threshold
        #[arg(long, default_value = "0.2")]
        blue_thresh: f64,
        /// SWIR reflectance cloud threshold
        #[arg(long, default_value = "0.3")]
        swir_thresh: f64,
        /// Skip cloud screening entirely
        #[arg(long)]
        no_cloud_mask: bool,
    },
    /// Write a scene's cloud mask as a binary GeoTIFF
    Cloudmask {
        /// Scene: multiband GeoTIFF or a directory of band files
        scene: PathBuf,
        /// Output mask file
        output: PathBuf,
        #[arg(long, default_value = "0.2")]
        blue_thresh: f64,
        #[arg(long, default_value = "0.3")]
        swir_thresh: f64,
    },
    /// Refined pest-risk mask from NDVI/EVI/NDWI grids
    Anomaly {
        /// NDVI raster
        #[arg(long)]
        ndvi: PathBuf,
        /// EVI raster
        #[arg(long)]
        evi: PathBuf,
        /// NDWI raster
        #[arg(long)]
        ndwi: PathBuf,
        /// Output refined mask file
        output: PathBuf,
        /// Spatial baseline window radius in cells
        #[arg(long, default_value = "7")]
        radius: usize,
        /// NDVI anomaly threshold
        #[arg(long, default_value = "0.3")]
        ndvi_thresh: f64,
        /// EVI anomaly threshold
        #[arg(long, default_value = "0.3")]
        evi_thresh: f64,
        /// NDWI anomaly threshold
        #[arg(long, default_value = "0.3")]
        ndwi_thresh: f64,
        /// Also write the per-index anomaly masks next to the output
        #[arg(long)]
        keep_intermediate: bool,
    },
    /// Rescale an index raster from [-1,1] to 8-bit
    Normalize {
        /// Input index raster
        input: PathBuf,
        /// Output 8-bit raster
        output: PathBuf,
    },
    /// Binary vegetation label from an NDVI raster
    Label {
        /// Input NDVI raster
        input: PathBuf,
        /// Output label file
        output: PathBuf,
        /// NDVI threshold
        #[arg(short, long, default_value = "0.3")]
        threshold: f64,
    },
    /// Per-pixel time series, risk polygons and summary from a mask folder
    Timeseries {
        /// Directory of dated pest-risk masks
        input_dir: PathBuf,
        /// Per-pixel time series CSV
        #[arg(long, default_value = "pixel_timeseries.csv")]
        pixel_csv: PathBuf,
        /// Directory for per-date GeoJSON risk polygons and the summary
        #[arg(long, default_value = "pest_risk_vectors")]
        vector_dir: PathBuf,
    },
    /// Print the share of pixels flagged in a risk mask
    RiskPercent {
        /// Input mask file
        input: PathBuf,
    },
    /// Render a raster to PNG with a color scheme
    Render {
        /// Input raster
        input: PathBuf,
        /// Output PNG file
        output: PathBuf,
        /// Color scheme: ndvi, water, anomaly, risk, grayscale
        #[arg(short, long, default_value = "ndvi")]
        scheme: String,
        /// Minimum of the color range (auto-detected when omitted)
        #[arg(long)]
        min: Option<f64>,
        /// Maximum of the color range (auto-detected when omitted)
        #[arg(long)]
        max: Option<f64>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_index(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path).context("Failed to read raster")?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_mask(path: &Path) -> Result<Raster<u8>> {
    let pb = spinner("Reading mask...");
    let raster: Raster<u8> = read_geotiff(path).context("Failed to read mask")?;
    pb.finish_and_clear();
    Ok(raster)
}

fn write_result<T: pestwatch_core::RasterElement>(
    raster: &Raster<T>,
    path: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create output directory")?;
        }
    }
    let pb = spinner("Writing output...");
    write_geotiff(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Read a scene from either a multiband GeoTIFF or a directory of
/// per-band files named by band designation (`B02.tif`, ...).
fn read_scene_input(path: &Path) -> Result<BandStack> {
    if path.is_dir() {
        let mut stack = BandStack::new();
        for &band in Band::ALL {
            for ext in ["tif", "tiff"] {
                let candidate = path.join(format!("{}.{}", band.code(), ext));
                if candidate.exists() {
                    let raster: Raster<f64> = read_geotiff(&candidate)
                        .with_context(|| format!("Failed to read {}", candidate.display()))?;
                    stack
                        .insert(band, raster)
                        .context("Band dimensions do not match the scene")?;
                    break;
                }
            }
        }
        if stack.is_empty() {
            anyhow::bail!("No band files (B02.tif, ...) found in {}", path.display());
        }
        Ok(stack)
    } else {
        read_scene(path).context("Failed to read multiband scene")
    }
}

fn scene_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .and_then(|s| s.to_str())
        .unwrap_or("scene")
        .to_string()
}

fn parse_bands(spec: &str) -> Result<Vec<Band>> {
    spec.split(',')
        .map(|tok| {
            Band::parse(tok.trim())
                .ok_or_else(|| anyhow::anyhow!("Unknown band: {}. Use B02..B12 designations.", tok))
        })
        .collect()
}

fn parse_scheme(s: &str) -> Result<ColorScheme> {
    ColorScheme::parse(s).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown scheme: {}. Use ndvi, water, anomaly, risk, or grayscale.",
            s
        )
    })
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_index(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Fetch ────────────────────────────────────────────────────
        Commands::Fetch {
            catalog,
            bbox,
            start,
            end,
            collection,
            max_cloud,
            max_items,
            bands,
            outdir,
        } => {
            let catalog = StacCatalog::from_str_or_url(&catalog);
            let mut params = StacSearchParams::new()
                .bbox(bbox[0], bbox[1], bbox[2], bbox[3])
                .datetime(&format!("{}/{}", start, end))
                .collections(&[collection.as_str()])
                .limit(100);
            if let Some(percent) = max_cloud {
                params = params.max_cloud_cover(percent);
            }

            let mut dl_options = SceneDownloaderOptions::default();
            if let Some(spec) = bands {
                dl_options.bands = parse_bands(&spec)?;
            }

            let client = StacClientBlocking::new(
                catalog,
                StacClientOptions {
                    max_items,
                    ..Default::default()
                },
            )
            .context("Failed to create STAC client")?;

            let pb = spinner("Searching catalog...");
            let items = client.search_all(&params).context("STAC search failed")?;
            pb.finish_and_clear();
            println!("Found {} scenes to download.", items.len());

            let start_t = Instant::now();
            let report = client
                .download_items(&items, &outdir, dl_options)
                .context("Scene download failed")?;
            let elapsed = start_t.elapsed();

            println!(
                "Downloaded {} assets, skipped {} already present.",
                report.downloaded, report.skipped
            );
            if !report.failed.is_empty() {
                warn!("{} assets failed:", report.failed.len());
                for failure in &report.failed {
                    warn!("  {}", failure);
                }
            }
            done("Scenes", &outdir, elapsed);
        }

        // ── Indices ──────────────────────────────────────────────────
        Commands::Indices {
            scene,
            outdir,
            blue_thresh,
            swir_thresh,
            no_cloud_mask,
        } => {
            let mut stack = read_scene_input(&scene)?;
            let name = scene_name(&scene);
            let start = Instant::now();

            if !no_cloud_mask {
                let clouds = detect_clouds(
                    &stack,
                    &CloudScreenParams {
                        blue_threshold: blue_thresh,
                        swir_threshold: swir_thresh,
                    },
                )
                .context("Cloud screening failed")?;
                let flagged = clouds.data().iter().filter(|&&v| v == 1).count();
                info!("Cloud pixels: {}", flagged);
                apply_cloud_mask(&mut stack, &clouds).context("Applying cloud mask failed")?;
            }

            let indices = scene_indices(&stack).context("Index computation failed")?;
            let elapsed = start.elapsed();

            let scene_dir = outdir.join(&name);
            write_result(&indices.ndvi, &scene_dir.join(format!("{}_NDVI.tif", name)))?;
            write_result(&indices.evi, &scene_dir.join(format!("{}_EVI.tif", name)))?;
            write_result(&indices.ndwi, &scene_dir.join(format!("{}_NDWI.tif", name)))?;
            done("Indices", &scene_dir, elapsed);
        }

        // ── Cloudmask ────────────────────────────────────────────────
        Commands::Cloudmask {
            scene,
            output,
            blue_thresh,
            swir_thresh,
        } => {
            let stack = read_scene_input(&scene)?;
            let start = Instant::now();
            let mask = detect_clouds(
                &stack,
                &CloudScreenParams {
                    blue_threshold: blue_thresh,
                    swir_threshold: swir_thresh,
                },
            )
            .context("Cloud screening failed")?;
            let elapsed = start.elapsed();
            write_result(&mask, &output)?;
            done("Cloud mask", &output, elapsed);
        }

        // ── Anomaly ──────────────────────────────────────────────────
        Commands::Anomaly {
            ndvi,
            evi,
            ndwi,
            output,
            radius,
            ndvi_thresh,
            evi_thresh,
            ndwi_thresh,
            keep_intermediate,
        } => {
            let ndvi_r = read_index(&ndvi)?;
            let evi_r = read_index(&evi)?;
            let ndwi_r = read_index(&ndwi)?;

            let start = Instant::now();
            let out = pest_risk_pipeline(
                &ndvi_r,
                &evi_r,
                &ndwi_r,
                &PestRiskParams {
                    baseline_radius: radius,
                    ndvi_threshold: ndvi_thresh,
                    evi_threshold: evi_thresh,
                    ndwi_threshold: ndwi_thresh,
                },
            )
            .context("Anomaly pipeline failed")?;
            let elapsed = start.elapsed();

            write_result(&out.refined, &output)?;

            if keep_intermediate {
                let stem = output
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("mask");
                let parent = output.parent().unwrap_or_else(|| Path::new("."));
                write_result(&out.ndvi_mask, &parent.join(format!("{}_ndvi_anomaly.tif", stem)))?;
                write_result(&out.evi_mask, &parent.join(format!("{}_evi_anomaly.tif", stem)))?;
                write_result(&out.ndwi_mask, &parent.join(format!("{}_ndwi_anomaly.tif", stem)))?;
            }

            let fraction = risk_fraction(&out.refined);
            println!("Risk pixels: {:.2}% of the scene", fraction * 100.0);
            done("Pest-risk mask", &output, elapsed);
        }

        // ── Normalize ────────────────────────────────────────────────
        Commands::Normalize { input, output } => {
            let raster = read_index(&input)?;
            let start = Instant::now();
            let normalized = normalize_index(&raster).context("Normalization failed")?;
            let elapsed = start.elapsed();
            write_result(&normalized, &output)?;
            done("Normalized index", &output, elapsed);
        }

        // ── Label ────────────────────────────────────────────────────
        Commands::Label {
            input,
            output,
            threshold,
        } => {
            let raster = read_index(&input)?;
            let start = Instant::now();
            let label = threshold_label(&raster, threshold).context("Labeling failed")?;
            let elapsed = start.elapsed();
            write_result(&label, &output)?;
            done("Label", &output, elapsed);
        }

        // ── Timeseries ───────────────────────────────────────────────
        Commands::Timeseries {
            input_dir,
            pixel_csv,
            vector_dir,
        } => {
            let pb = spinner("Loading masks...");
            let series = MaskSeries::load_dir(&input_dir).context("Failed to load mask series")?;
            pb.finish_and_clear();
            println!("Loaded {} masks.", series.len());

            let start = Instant::now();

            let pixels =
                PixelSeries::from_masks(&series).context("Pixel series extraction failed")?;
            pixels
                .write_csv(&pixel_csv)
                .context("Failed to write pixel CSV")?;
            println!("Per-pixel time series saved to {}", pixel_csv.display());

            std::fs::create_dir_all(&vector_dir).context("Failed to create vector directory")?;
            for (date, mask) in series.iter() {
                if mask.data().iter().all(|&v| v != 1) {
                    warn!("No risk areas detected on {}.", date);
                    continue;
                }
                let path = vector_dir.join(format!("pest_risk_{}.geojson", date));
                write_geojson(mask, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Saved risk polygons for {}", date);
            }

            let rows = risk_summary(&series);
            let summary_path = vector_dir.join("risk_summary.csv");
            write_summary_csv(&rows, &summary_path).context("Failed to write risk summary")?;

            let elapsed = start.elapsed();
            done("Time series", &vector_dir, elapsed);
        }

        // ── RiskPercent ──────────────────────────────────────────────
        Commands::RiskPercent { input } => {
            let mask = read_mask(&input)?;
            let fraction = risk_fraction(&mask);
            println!("Pest Risk Percentage: {:.2}%", fraction * 100.0);
        }

        // ── Render ───────────────────────────────────────────────────
        Commands::Render {
            input,
            output,
            scheme,
            min,
            max,
        } => {
            let scheme = parse_scheme(&scheme)?;
            let raster = read_index(&input)?;
            let start = Instant::now();

            let params = match (min, max) {
                (Some(lo), Some(hi)) => ColormapParams::with_range(scheme, lo, hi),
                _ => {
                    let auto = auto_params(&raster, scheme);
                    ColormapParams {
                        min: min.unwrap_or(auto.min),
                        max: max.unwrap_or(auto.max),
                        ..auto
                    }
                }
            };

            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .context("Failed to create output directory")?;
                }
            }
            render_png(&raster, &params, &output).context("Rendering failed")?;
            let elapsed = start.elapsed();
            done("Rendering", &output, elapsed);
        }
    }

    Ok(())
}
