//! Types d'erreurs pour le crate fishnet

use std::path::PathBuf;

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture d'une grille ou d'une zone
#[derive(Debug, Error)]
pub enum FishnetError {
    /// Erreur d'I/O lors de la lecture du fichier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GeoJSON invalide
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Shapefile illisible (.shp/.dbf)
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// GeoPackage illisible (SQLite)
    #[error("GeoPackage error: {0}")]
    GeoPackage(#[from] rusqlite::Error),

    /// GeoPackage sans table de features
    #[error("GeoPackage has no feature table")]
    NoFeatureTable,

    /// Extension de fichier non reconnue
    #[error("Unsupported vector format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Attribut obligatoire absent d'une feature de la grille
    #[error("Feature #{feature} has no usable '{attribute}' attribute")]
    MissingAttribute { feature: usize, attribute: String },

    /// Géométrie non convertible
    #[error("Invalid geometry in feature #{feature}: {reason}")]
    InvalidGeometry { feature: usize, reason: String },
}

impl FishnetError {
    /// Crée une erreur d'attribut manquant
    pub fn missing_attribute(feature: usize, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            feature,
            attribute: attribute.into(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(feature: usize, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            feature,
            reason: reason.into(),
        }
    }
}
