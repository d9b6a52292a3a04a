//! Schéma d'URL de l'archive lidar : tag de chemin, préfixe et suffixe de fichier
//!
//! Les combinaisons (produit, projection) forment une table explicite. Une
//! combinaison absente de la table est une erreur, jamais une chaîne vide.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemeError;
use crate::projection::SloProjection;

/// Produits lidar disponibles par dalle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum LidarDataType {
    /// Nuage de points classifié (zLAS)
    GKOT_ZLAS,
    /// Nuage de points du sol (zLAS)
    OTR_ZLAS,
    /// Nuage de points classifié (LAZ)
    GKOT_LAZ,
    /// Nuage de points du sol (LAZ)
    OTR_LAZ,
    /// Modèle numérique de terrain, maille 1 m
    DTM,
}

impl LidarDataType {
    /// Tous les produits
    pub const ALL: [LidarDataType; 5] = [
        LidarDataType::GKOT_ZLAS,
        LidarDataType::OTR_ZLAS,
        LidarDataType::GKOT_LAZ,
        LidarDataType::OTR_LAZ,
        LidarDataType::DTM,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LidarDataType::GKOT_ZLAS => "GKOT_ZLAS",
            LidarDataType::OTR_ZLAS => "OTR_ZLAS",
            LidarDataType::GKOT_LAZ => "GKOT_LAZ",
            LidarDataType::OTR_LAZ => "OTR_LAZ",
            LidarDataType::DTM => "DTM",
        }
    }

    /// Segment de chemin de la famille de produit (indépendant de la projection)
    pub fn url_tag(&self) -> &'static str {
        match self {
            LidarDataType::GKOT_ZLAS => "gkot",
            LidarDataType::OTR_ZLAS => "otr",
            LidarDataType::GKOT_LAZ => "gkot/laz",
            LidarDataType::OTR_LAZ => "otr/laz",
            LidarDataType::DTM => "dmr1",
        }
    }
}

impl fmt::Display for LidarDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LidarDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        LidarDataType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Invalid data type: {}. Use: GKOT_ZLAS, OTR_ZLAS, GKOT_LAZ, OTR_LAZ, DTM",
                    s
                )
            })
    }
}

/// Entrée de la table : règles de nommage d'un produit dans une projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeEntry {
    pub product: LidarDataType,
    pub projection: SloProjection,
    pub prefix: &'static str,
    pub suffix: &'static str,
}

const fn entry(
    product: LidarDataType,
    projection: SloProjection,
    prefix: &'static str,
    suffix: &'static str,
) -> SchemeEntry {
    SchemeEntry {
        product,
        projection,
        prefix,
        suffix,
    }
}

/// Table officielle (5 produits x 2 projections)
pub static SLO_LIDAR_SCHEME: [SchemeEntry; 10] = {
    use LidarDataType::*;
    use SloProjection::*;
    [
        entry(GKOT_ZLAS, D96TM, "TM", "zlas"),
        entry(OTR_ZLAS, D96TM, "TMR", "zlas"),
        entry(GKOT_LAZ, D96TM, "TM", "laz"),
        entry(OTR_LAZ, D96TM, "TMR", "laz"),
        entry(DTM, D96TM, "TM1", "txt"),
        entry(GKOT_ZLAS, D48GK, "GK", "zlas"),
        entry(OTR_ZLAS, D48GK, "GKR", "zlas"),
        entry(GKOT_LAZ, D48GK, "GK", "laz"),
        entry(OTR_LAZ, D48GK, "GKR", "laz"),
        entry(DTM, D48GK, "GK1", "asc"),
    ]
};

/// Résolveur du schéma d'URL
#[derive(Debug, Clone, Copy)]
pub struct UrlScheme {
    entries: &'static [SchemeEntry],
}

impl Default for UrlScheme {
    fn default() -> Self {
        Self::new(&SLO_LIDAR_SCHEME)
    }
}

impl UrlScheme {
    /// Crée un résolveur sur une table donnée
    pub fn new(entries: &'static [SchemeEntry]) -> Self {
        Self { entries }
    }

    /// Entrées de la table
    pub fn entries(&self) -> &'static [SchemeEntry] {
        self.entries
    }

    fn entry(
        &self,
        product: LidarDataType,
        projection: SloProjection,
    ) -> Result<&'static SchemeEntry, SchemeError> {
        self.entries
            .iter()
            .find(|e| e.product == product && e.projection == projection)
            .ok_or(SchemeError::Unsupported {
                product,
                projection,
            })
    }

    /// Tag de chemin du produit
    pub fn path_tag(&self, product: LidarDataType) -> &'static str {
        product.url_tag()
    }

    /// Préfixe du nom de fichier
    pub fn name_prefix(
        &self,
        product: LidarDataType,
        projection: SloProjection,
    ) -> Result<&'static str, SchemeError> {
        Ok(self.entry(product, projection)?.prefix)
    }

    /// Extension du fichier
    pub fn suffix(
        &self,
        product: LidarDataType,
        projection: SloProjection,
    ) -> Result<&'static str, SchemeError> {
        Ok(self.entry(product, projection)?.suffix)
    }
}
