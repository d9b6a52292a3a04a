//! Registre des projections slovènes et de leurs grilles de dalles

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Projections dans lesquelles l'archive lidar est publiée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SloProjection {
    /// D48/GK (EPSG:3912)
    D48GK,
    /// D96/TM (EPSG:3794)
    D96TM,
}

impl SloProjection {
    /// Toutes les projections supportées
    pub const ALL: [SloProjection; 2] = [SloProjection::D48GK, SloProjection::D96TM];

    /// Segment de chemin utilisé dans les URL
    pub fn as_str(&self) -> &'static str {
        match self {
            SloProjection::D48GK => "D48GK",
            SloProjection::D96TM => "D96TM",
        }
    }
}

impl fmt::Display for SloProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SloProjection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D48GK" | "D48" => Ok(SloProjection::D48GK),
            "D96TM" | "D96" => Ok(SloProjection::D96TM),
            _ => Err(format!("Invalid projection: {}. Use: D48GK, D96TM", s)),
        }
    }
}

/// Configuration d'une projection : code EPSG et grille associée
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionConfig {
    pub projection: SloProjection,
    pub epsg: u32,
    pub fishnet: PathBuf,
}

/// Table fixe : projection, EPSG, nom du fichier de grille
const PROJECTIONS: [(SloProjection, u32, &str); 2] = [
    (SloProjection::D48GK, 3912, "LIDAR_FISHNET_D48.shp"),
    (SloProjection::D96TM, 3794, "LIDAR_FISHNET_D96.shp"),
];

/// Registre immuable des projections
#[derive(Debug, Clone)]
pub struct ProjectionRegistry {
    configs: Vec<ProjectionConfig>,
}

impl ProjectionRegistry {
    /// Construit le registre avec les grilles officielles sous `fishnet_dir`
    pub fn new(fishnet_dir: &Path) -> Self {
        let configs = PROJECTIONS
            .iter()
            .map(|&(projection, epsg, file)| ProjectionConfig {
                projection,
                epsg,
                fishnet: fishnet_dir.join(file),
            })
            .collect();
        Self { configs }
    }

    /// Remplace le fichier de grille d'une projection
    pub fn with_grid(mut self, projection: SloProjection, fishnet: impl Into<PathBuf>) -> Self {
        let fishnet = fishnet.into();
        if let Some(config) = self.configs.iter_mut().find(|c| c.projection == projection) {
            config.fishnet = fishnet;
        }
        self
    }

    /// Configuration d'une projection, `None` si absente du registre
    pub fn lookup(&self, projection: SloProjection) -> Option<&ProjectionConfig> {
        self.configs.iter().find(|c| c.projection == projection)
    }

    /// Projections enregistrées
    pub fn projections(&self) -> impl Iterator<Item = SloProjection> + '_ {
        self.configs.iter().map(|c| c.projection)
    }
}
