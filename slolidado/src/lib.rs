//! # slolidado
//!
//! Téléchargement des dalles de l'archive lidar slovène (ARSO) couvrant une
//! zone d'intérêt.
//!
//! ## Features
//!
//! - Sélection des dalles d'une grille (fishnet) par prédicat spatial
//! - Reprojection de la zone avec PROJ (feature `reproject`)
//! - Schéma d'URL par produit et par projection, sous forme de table
//! - Téléchargement concurrent, reprise sur fichiers existants, rapport JSON
//! - Export GeoJSON des dalles sélectionnées
//!
//! ## Usage CLI
//!
//! ```bash
//! # Télécharger le MNT 1 m en D96/TM
//! slolidado --area ./area.geojson --output ./out/
//!
//! # Nuage de points LAZ en D48/GK, 8 téléchargements simultanés
//! slolidado download --area ./area.shp --output ./out/ --projection D48GK --data-type GKOT_LAZ --jobs 8
//!
//! # Lister les URL sans télécharger
//! slolidado urls --area ./area.geojson
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod projection;
pub mod report;
pub mod reproject;
pub mod scheme;
pub mod select;
pub mod urls;

pub use config::Config;
pub use download::{BatchDownloader, DownloadOutcome};
pub use error::{DownloadError, LidarError, SchemeError};
pub use pipeline::{DownloadRequest, LidarDataDownloader, TileQuery};
pub use projection::{ProjectionConfig, ProjectionRegistry, SloProjection};
pub use report::{DownloadReport, DownloadStatus};
pub use scheme::{LidarDataType, UrlScheme};
pub use select::{select, SpatialJoinMethod, TileSelector};
pub use urls::UrlBuilder;
