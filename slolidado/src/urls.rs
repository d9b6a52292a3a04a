//! Construction des URL de téléchargement

use fishnet::Tile;

use crate::error::SchemeError;
use crate::projection::SloProjection;
use crate::scheme::{LidarDataType, UrlScheme};

/// Base de l'archive lidar de l'ARSO
pub const SLO_LIDAR_BASE_DOWNLOAD_LINK: &str = "http://gis.arso.gov.si/lidar";

/// Construit `<base>/<tag>/<blok>/<projection>/<prefix>_<name>.<suffix>`
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base_url: String,
    scheme: UrlScheme,
}

impl Default for UrlBuilder {
    fn default() -> Self {
        Self::new(SLO_LIDAR_BASE_DOWNLOAD_LINK)
    }
}

impl UrlBuilder {
    /// Crée un builder sur une base d'URL (le `/` final est ignoré)
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            scheme: UrlScheme::default(),
        }
    }

    /// Remplace la table du schéma d'URL
    pub fn with_scheme(mut self, scheme: UrlScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Une URL par dalle, dans l'ordre des dalles
    pub fn build_urls(
        &self,
        tiles: &[Tile],
        product: LidarDataType,
        projection: SloProjection,
    ) -> Result<Vec<String>, SchemeError> {
        let tag = self.scheme.path_tag(product);
        let prefix = self.scheme.name_prefix(product, projection)?;
        let suffix = self.scheme.suffix(product, projection)?;

        Ok(tiles
            .iter()
            .map(|tile| {
                format!(
                    "{}/{}/{}/{}/{}_{}.{}",
                    self.base_url, tag, tile.blok, projection, prefix, tile.name, suffix
                )
            })
            .collect())
    }
}
