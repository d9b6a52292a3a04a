//! Types d'erreurs du pipeline de téléchargement

use std::path::PathBuf;

use fishnet::FishnetError;
use thiserror::Error;

use crate::projection::SloProjection;
use crate::scheme::LidarDataType;

/// Erreurs fatales : elles interrompent l'appel avant tout téléchargement
#[derive(Debug, Error)]
pub enum LidarError {
    /// Fichier de zone, dossier de sortie, grille ou configuration invalides
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Grille (fishnet) illisible
    #[error("Can't read fishnet file ({}): {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: FishnetError,
    },

    /// Zone d'intérêt illisible
    #[error("Can't read area file ({}): {source}", path.display())]
    Area {
        path: PathBuf,
        #[source]
        source: FishnetError,
    },

    /// Zone d'intérêt non reprojetable
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Combinaison produit/projection hors du schéma d'URL
    #[error(transparent)]
    Scheme(#[from] SchemeError),
}

impl LidarError {
    /// Crée une erreur de configuration
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Crée une erreur de géométrie
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry(message.into())
    }
}

/// Combinaison absente de la table du schéma d'URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchemeError {
    #[error("No URL scheme for data type {product} in projection {projection}")]
    Unsupported {
        product: LidarDataType,
        projection: SloProjection,
    },
}

/// Erreur de téléchargement d'un fichier : enregistrée, jamais propagée
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Réponse HTTP autre que 200
    #[error("Response is not 200 (got {0})")]
    Status(reqwest::StatusCode),

    /// Erreur de transport (connexion, timeout, corps tronqué)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur d'écriture locale
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Impossible de déduire un nom de fichier depuis l'URL
    #[error("Invalid download URL: {0}")]
    InvalidUrl(String),

    /// Lot annulé avant la fin du transfert
    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Vrai si la requête a expiré
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, LidarError>;
