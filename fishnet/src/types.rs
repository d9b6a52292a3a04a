//! Types de données pour le crate fishnet

use std::fmt;
use std::path::{Path, PathBuf};

use geo::MultiPolygon;

/// Une dalle de la grille lidar
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Identifiant du bloc (attribut `BLOK`)
    pub blok: String,

    /// Nom de la dalle (attribut `NAME`)
    pub name: String,

    /// Emprise de la dalle dans le système de la grille
    pub geometry: MultiPolygon<f64>,
}

/// Zone d'intérêt fournie par l'utilisateur
#[derive(Debug, Clone)]
pub struct AreaOfInterest {
    /// Toutes les parties polygonales du fichier
    pub geometry: MultiPolygon<f64>,

    /// Système de coordonnées déclaré par le fichier, s'il y en a un
    pub crs: Option<Crs>,

    /// Nombre de features lues (polygonales ou non)
    pub features: usize,

    /// Fichier source
    pub source: PathBuf,
}

impl AreaOfInterest {
    /// Vrai si la zone ne contient aucun polygone
    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

/// Système de coordonnées source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    /// Code EPSG
    Epsg(u32),

    /// Définition libre comprise par PROJ (WKT d'un .prj, chaîne proj, ...)
    Definition(String),
}

impl Crs {
    /// WGS84, système implicite d'un GeoJSON sans membre `crs`
    pub const WGS84: Crs = Crs::Epsg(4326);

    /// Code EPSG si connu
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Definition(_) => None,
        }
    }

    /// Chaîne à passer à PROJ
    pub fn to_proj_string(&self) -> String {
        match self {
            Crs::Epsg(code) => format!("EPSG:{}", code),
            Crs::Definition(def) => def.clone(),
        }
    }

    /// Interprète un nom de CRS tel qu'écrit dans le membre `crs` d'un GeoJSON
    ///
    /// Formes reconnues : `urn:ogc:def:crs:EPSG::3794`, `urn:ogc:def:crs:EPSG:6.6:3794`,
    /// `EPSG:3794` et `urn:ogc:def:crs:OGC:1.3:CRS84`. Toute autre chaîne non vide
    /// est conservée telle quelle comme définition PROJ.
    pub fn from_name(name: &str) -> Option<Crs> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let upper = name.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Some(Crs::WGS84);
        }

        if upper.starts_with("EPSG:") || upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            // Le code est toujours le dernier segment
            if let Some(code) = upper.rsplit(':').next().and_then(|c| c.parse().ok()) {
                return Some(Crs::Epsg(code));
            }
        }

        Some(Crs::Definition(name.to_string()))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Definition(_) => write!(f, "custom CRS definition"),
        }
    }
}

/// Formats vectoriels supportés
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    GeoJson,
    Shapefile,
    GeoPackage,
}

impl VectorFormat {
    /// Déduit le format depuis l'extension du fichier
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(Self::GeoJson),
            "shp" => Some(Self::Shapefile),
            "gpkg" => Some(Self::GeoPackage),
            _ => None,
        }
    }
}
