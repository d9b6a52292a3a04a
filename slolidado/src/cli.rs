//! Définition et implémentation des commandes CLI
//!
//! - `download` (défaut) : zone → dalles → fichiers
//! - `tiles` : liste (et export GeoJSON) des dalles sélectionnées
//! - `urls` : URL de téléchargement, une par ligne

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use fishnet::Crs;
use tokio_util::sync::CancellationToken;
use tracing::info;

use slolidado::export::export_tiles_to_geojson;
use slolidado::reproject;
use slolidado::{
    Config, DownloadReport, DownloadRequest, LidarDataDownloader, LidarDataType, SloProjection,
    SpatialJoinMethod, TileQuery,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Download the lidar tiles covering an area (default command)
    Download(DownloadArgs),

    /// List the grid tiles selected by an area
    Tiles(TilesArgs),

    /// Print the download URL of each selected tile
    Urls(UrlsArgs),
}

/// Zone d'intérêt et prédicat
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Area of interest (GeoJSON, Shapefile or GeoPackage)
    #[arg(short, long)]
    pub area: PathBuf,

    /// Projection of the archive: D48GK or D96TM
    #[arg(short, long, default_value = "D96TM")]
    pub projection: SloProjection,

    /// Spatial predicate: intersects, within, overlaps, contains, touches
    #[arg(short, long, default_value = "intersects")]
    pub method: SpatialJoinMethod,

    /// CRS of the area when the file does not declare one (e.g. EPSG:3794)
    #[arg(long, value_parser = parse_crs)]
    pub area_crs: Option<Crs>,
}

/// Surcharges de configuration communes
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the lidar archive (défaut : env SLOLIDADO_BASE_URL / ARSO)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory holding LIDAR_FISHNET_D48.shp and LIDAR_FISHNET_D96.shp
    #[arg(long)]
    pub fishnet_dir: Option<PathBuf>,

    /// Grid file for the selected projection (replaces the official one)
    #[arg(long)]
    pub fishnet: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Output directory (must exist)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Data product: GKOT_ZLAS, OTR_ZLAS, GKOT_LAZ, OTR_LAZ, DTM
    #[arg(short, long, default_value = "DTM")]
    pub data_type: LidarDataType,

    /// Download again files already present
    #[arg(long)]
    pub overwrite: bool,

    /// Maximum number of concurrent downloads
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Timeout per request in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Write a JSON report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TilesArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Data product, adds the download URL to the exported tiles
    #[arg(short, long)]
    pub data_type: Option<LidarDataType>,

    /// Export the selected tiles to a GeoJSON file
    #[arg(long)]
    pub output_geojson: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct UrlsArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Data product: GKOT_ZLAS, OTR_ZLAS, GKOT_LAZ, OTR_LAZ, DTM
    #[arg(short, long, default_value = "DTM")]
    pub data_type: LidarDataType,
}

fn parse_crs(s: &str) -> std::result::Result<Crs, String> {
    Crs::from_name(s).ok_or_else(|| format!("Invalid CRS: {}", s))
}

/// Fichier, environnement puis options de la ligne de commande
fn load_config(settings: &SettingsArgs, projection: SloProjection) -> Result<Config> {
    let mut config = match &settings.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env();
    apply_overrides(&mut config, settings, projection);
    Ok(config)
}

fn apply_overrides(config: &mut Config, settings: &SettingsArgs, projection: SloProjection) {
    if let Some(base_url) = &settings.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(dir) = &settings.fishnet_dir {
        config.fishnet_dir = dir.clone();
    }
    if let Some(grid) = &settings.fishnet {
        config.grids.insert(projection, grid.clone());
    }
}

fn tile_query(selection: &SelectionArgs) -> TileQuery {
    TileQuery::new(&selection.area)
        .projection(selection.projection)
        .method(selection.method)
        .area_crs(selection.area_crs.clone())
}

/// Exécute la commande download
pub async fn cmd_download(args: DownloadArgs, cancel: CancellationToken) -> Result<DownloadReport> {
    let mut config = load_config(&args.settings, args.selection.projection)?;
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    println!("=== Download {} {} ===", args.data_type, args.selection.projection);
    println!("Area: {}", args.selection.area.display());
    println!("Output: {}", args.output.display());
    println!("Method: {}", args.selection.method);
    println!("Jobs: {}", config.jobs);
    println!("Overwrite: {}", args.overwrite);
    println!("Base URL: {}", config.base_url);
    println!(
        "Reprojection: {}",
        if reproject::is_available() { "PROJ" } else { "disabled (same CRS only)" }
    );

    let downloader = LidarDataDownloader::new(config)
        .context("Failed to create downloader")?
        .with_cancellation(cancel);

    let request = DownloadRequest::new(tile_query(&args.selection), &args.output)
        .data_type(args.data_type)
        .overwrite(args.overwrite);

    let report = downloader.download(&request).await?;
    downloader.close();

    report.display();
    if let Some(path) = &args.report {
        report
            .save_to_file(path)
            .context(format!("Failed to save report: {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    Ok(report)
}

/// Exécute la commande tiles
pub fn cmd_tiles(args: TilesArgs) -> Result<()> {
    let config = load_config(&args.settings, args.selection.projection)?;
    let downloader = LidarDataDownloader::new(config)?;
    let query = tile_query(&args.selection);

    let (tiles, urls) = match args.data_type {
        Some(data_type) => {
            let (tiles, urls) = downloader.tile_urls(&query, data_type)?;
            (tiles, Some(urls))
        }
        None => (downloader.select_tiles(&query)?, None),
    };

    if tiles.is_empty() {
        info!(area = %args.selection.area.display(), "There are no tiles");
    }

    println!("BLOK\tNAME");
    for tile in &tiles {
        println!("{}\t{}", tile.blok, tile.name);
    }
    println!("{} tiles", tiles.len());

    if let Some(output) = &args.output_geojson {
        let epsg = downloader
            .registry()
            .lookup(args.selection.projection)
            .map(|p| p.epsg)
            .context("Projection is not configured")?;
        export_tiles_to_geojson(&tiles, urls.as_deref(), epsg, output)?;
        info!(path = %output.display(), tiles = tiles.len(), "Tiles exported");
    }

    Ok(())
}

/// Exécute la commande urls
pub fn cmd_urls(args: UrlsArgs) -> Result<()> {
    let config = load_config(&args.settings, args.selection.projection)?;
    let downloader = LidarDataDownloader::new(config)?;

    let (_, urls) = downloader.tile_urls(&tile_query(&args.selection), args.data_type)?;
    if urls.is_empty() {
        info!(area = %args.selection.area.display(), "There are no tiles");
    }
    for url in &urls {
        println!("{}", url);
    }

    Ok(())
}
