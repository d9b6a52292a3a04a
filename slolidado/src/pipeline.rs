//! Pipeline complet : validation, sélection des dalles, URL, téléchargement

use std::path::{Path, PathBuf};
use std::time::Instant;

use fishnet::{AreaOfInterest, Crs, Tile};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::download::{build_client, BatchDownloader};
use crate::error::{LidarError, Result};
use crate::projection::{ProjectionConfig, ProjectionRegistry, SloProjection};
use crate::report::DownloadReport;
use crate::scheme::LidarDataType;
use crate::select::{SpatialJoinMethod, TileSelector};
use crate::urls::UrlBuilder;

/// Zone d'intérêt et paramètres de sélection des dalles
#[derive(Debug, Clone)]
pub struct TileQuery {
    pub area_file: PathBuf,
    pub projection: SloProjection,
    pub method: SpatialJoinMethod,
    /// CRS imposé à la zone (remplace celui du fichier)
    pub area_crs: Option<Crs>,
}

impl TileQuery {
    /// Requête D96TM / intersects sur un fichier de zone
    pub fn new(area_file: impl Into<PathBuf>) -> Self {
        Self {
            area_file: area_file.into(),
            projection: SloProjection::D96TM,
            method: SpatialJoinMethod::default(),
            area_crs: None,
        }
    }

    pub fn projection(mut self, projection: SloProjection) -> Self {
        self.projection = projection;
        self
    }

    pub fn method(mut self, method: SpatialJoinMethod) -> Self {
        self.method = method;
        self
    }

    pub fn area_crs(mut self, crs: Option<Crs>) -> Self {
        self.area_crs = crs;
        self
    }
}

/// Demande de téléchargement
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub query: TileQuery,
    pub output_dir: PathBuf,
    pub data_type: LidarDataType,
    pub overwrite: bool,
}

impl DownloadRequest {
    /// Demande DTM sans écrasement
    pub fn new(query: TileQuery, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            query,
            output_dir: output_dir.into(),
            data_type: LidarDataType::DTM,
            overwrite: false,
        }
    }

    pub fn data_type(mut self, data_type: LidarDataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Téléchargeur de données lidar
///
/// Possède la session HTTP ; elle est libérée au drop ou par [`close`](Self::close).
pub struct LidarDataDownloader {
    config: Config,
    registry: ProjectionRegistry,
    urls: UrlBuilder,
    downloader: BatchDownloader,
}

impl LidarDataDownloader {
    /// Crée un téléchargeur à partir d'une configuration
    ///
    /// # Errors
    ///
    /// `LidarError::Configuration` si la configuration est invalide ou si le
    /// client HTTP ne peut pas être créé.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let client = build_client(config.timeout(), config.connect_timeout(), &config.user_agent)?;
        let downloader = BatchDownloader::new(client).with_jobs(config.jobs);

        Ok(Self {
            registry: config.registry(),
            urls: UrlBuilder::new(&config.base_url),
            downloader,
            config,
        })
    }

    /// Remplace le registre des projections
    pub fn with_registry(mut self, registry: ProjectionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Jeton d'annulation des téléchargements
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.downloader = self.downloader.with_cancellation(cancel);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ProjectionRegistry {
        &self.registry
    }

    /// Vérifie une demande avant toute requête réseau
    ///
    /// Ordre : fichier de zone, dossier de sortie, projection, grille.
    pub fn validate(&self, request: &DownloadRequest) -> Result<&ProjectionConfig> {
        check_area_file(&request.query.area_file)?;
        check_output_dir(&request.output_dir)?;
        self.resolve_projection(request.query.projection)
    }

    /// Sélectionne les dalles touchées par la zone
    pub fn select_tiles(&self, query: &TileQuery) -> Result<Vec<Tile>> {
        check_area_file(&query.area_file)?;
        let projection = self.resolve_projection(query.projection)?;
        self.select_with(projection, query)
    }

    /// Dalles sélectionnées et leurs URL, dans le même ordre
    pub fn tile_urls(
        &self,
        query: &TileQuery,
        data_type: LidarDataType,
    ) -> Result<(Vec<Tile>, Vec<String>)> {
        let tiles = self.select_tiles(query)?;
        let urls = self.urls.build_urls(&tiles, data_type, query.projection)?;
        Ok((tiles, urls))
    }

    /// Télécharge les dalles de la zone dans le dossier de sortie
    ///
    /// Les erreurs fatales (configuration, zone, grille, schéma) sont
    /// retournées avant tout téléchargement. Les échecs par fichier sont
    /// enregistrés dans le rapport.
    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadReport> {
        let start = Instant::now();
        let query = &request.query;
        let projection = self.validate(request)?;

        let mut report = DownloadReport::new(
            request.data_type.as_str(),
            query.projection.as_str(),
            &request.output_dir,
        );

        let tiles = self.select_with(projection, query)?;
        report.tiles = tiles.len();

        if tiles.is_empty() {
            info!(area = %query.area_file.display(), "There are no tiles");
            report.set_duration(start.elapsed());
            report.finalize();
            return Ok(report);
        }

        let urls = self
            .urls
            .build_urls(&tiles, request.data_type, query.projection)?;

        info!(
            tiles = tiles.len(),
            data_type = %request.data_type,
            projection = %query.projection,
            output = %request.output_dir.display(),
            jobs = self.downloader.jobs(),
            "Downloading tiles"
        );

        let outcomes = self
            .downloader
            .download_all(&urls, &request.output_dir, request.overwrite)
            .await;

        report.record_all(&outcomes);
        report.set_duration(start.elapsed());
        report.finalize();

        info!(summary = %report.summary(), "Download finished");
        Ok(report)
    }

    /// Libère la session HTTP
    pub fn close(self) {
        debug!("HTTP session closed");
    }

    fn resolve_projection(&self, projection: SloProjection) -> Result<&ProjectionConfig> {
        let config = self.registry.lookup(projection).ok_or_else(|| {
            LidarError::configuration(format!("Projection {} is not configured", projection))
        })?;

        if !config.fishnet.is_file() {
            return Err(LidarError::configuration(format!(
                "Fishnet file doesn't exist: {}",
                config.fishnet.display()
            )));
        }

        Ok(config)
    }

    fn select_with(&self, projection: &ProjectionConfig, query: &TileQuery) -> Result<Vec<Tile>> {
        let area = load_area(query)?;
        TileSelector::new(projection, query.method).select(&area)
    }
}

fn check_area_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LidarError::configuration(format!(
            "Area file doesn't exist: {}",
            path.display()
        )))
    }
}

fn check_output_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(LidarError::configuration(format!(
            "Output directory doesn't exist: {}",
            path.display()
        )))
    }
}

fn load_area(query: &TileQuery) -> Result<AreaOfInterest> {
    let mut area = fishnet::read_area(&query.area_file).map_err(|source| LidarError::Area {
        path: query.area_file.clone(),
        source,
    })?;

    if let Some(crs) = &query.area_crs {
        area.crs = Some(crs.clone());
    }

    debug!(
        area = %query.area_file.display(),
        features = area.features,
        polygons = area.geometry.0.len(),
        crs = ?area.crs,
        "Area loaded"
    );
    Ok(area)
}
