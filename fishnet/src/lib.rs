//! # fishnet
//!
//! Lecture des grilles de dalles lidar ("fishnets") et des zones d'intérêt.
//!
//! ## Features
//!
//! - GeoJSON (`.geojson`, `.json`) : FeatureCollection, Feature ou géométrie nue,
//!   avec reconnaissance du membre `crs` nommé
//! - ESRI Shapefile (`.shp` + `.dbf`), CRS lu depuis le `.prj` voisin
//! - GeoPackage (`.gpkg`), première table de features, CRS lu depuis
//!   `gpkg_spatial_ref_sys`
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fishnet::{read_area, read_grid};
//! use std::path::Path;
//!
//! let tiles = read_grid(Path::new("fishnet/LIDAR_FISHNET_D96.shp"))?;
//! let area = read_area(Path::new("area.geojson"))?;
//! println!("{} tiles, {} area polygons", tiles.len(), area.geometry.0.len());
//! ```

pub mod error;
pub mod reader;
pub mod types;

pub use error::FishnetError;
pub use types::{AreaOfInterest, Crs, Tile, VectorFormat};

use std::path::Path;

use tracing::debug;

/// Détermine le format d'un fichier ou échoue
fn detect_format(path: &Path) -> Result<VectorFormat, FishnetError> {
    VectorFormat::from_path(path).ok_or_else(|| FishnetError::UnsupportedFormat(path.to_path_buf()))
}

/// Lit une grille de dalles (attributs `BLOK` et `NAME` obligatoires).
///
/// L'ordre des dalles est celui du fichier.
///
/// # Errors
///
/// Retourne `FishnetError` si le fichier est illisible, si une feature n'a pas
/// d'attribut `BLOK`/`NAME` ou si une géométrie n'est pas polygonale.
pub fn read_grid(path: &Path) -> Result<Vec<Tile>, FishnetError> {
    let tiles = match detect_format(path)? {
        VectorFormat::GeoJson => {
            let content = std::fs::read_to_string(path)?;
            reader::geojson::read_tiles(&content)?
        }
        VectorFormat::Shapefile => reader::shp::read_tiles(path)?,
        VectorFormat::GeoPackage => reader::gpkg::read_tiles(path)?,
    };

    debug!(path = %path.display(), tiles = tiles.len(), "Grid loaded");
    Ok(tiles)
}

/// Lit une zone d'intérêt.
///
/// Seules les parties polygonales sont conservées ; une zone sans polygone
/// n'est pas une erreur (voir [`AreaOfInterest::is_empty`]).
///
/// # Errors
///
/// Retourne `FishnetError` si le fichier est illisible ou mal formé.
pub fn read_area(path: &Path) -> Result<AreaOfInterest, FishnetError> {
    let (geometry, crs, features) = match detect_format(path)? {
        VectorFormat::GeoJson => {
            let content = std::fs::read_to_string(path)?;
            let (geometry, crs, count) = reader::geojson::read_area(&content)?;
            (geometry, Some(crs), count)
        }
        VectorFormat::Shapefile => reader::shp::read_area(path)?,
        VectorFormat::GeoPackage => reader::gpkg::read_area(path)?,
    };

    debug!(
        path = %path.display(),
        features = features,
        polygons = geometry.0.len(),
        "Area loaded"
    );

    Ok(AreaOfInterest {
        geometry,
        crs,
        features,
        source: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format() {
        let result = read_grid(Path::new("grid.kml"));
        assert!(matches!(result, Err(FishnetError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_geojson_is_io_error() {
        let result = read_area(Path::new("does/not/exist.geojson"));
        assert!(matches!(result, Err(FishnetError::Io(_))));
    }
}
