//! Lecture ESRI Shapefile (.shp + .dbf, .prj optionnel)

use std::path::Path;

use geo::MultiPolygon;
use shapefile::dbase::{FieldValue, Record};
use shapefile::Shape;
use tracing::debug;

use super::{collect_polygons, format_number, BLOK_FIELD, NAME_FIELD};
use crate::{Crs, FishnetError, Tile};

/// Lit un attribut texte ou numérique du .dbf
fn attribute(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        FieldValue::Character(Some(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(format_number(*n)),
        FieldValue::Float(Some(n)) => Some(format_number(f64::from(*n))),
        FieldValue::Double(n) => Some(format_number(*n)),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convertit une forme en géométrie `geo`
fn shape_to_geometry(index: usize, shape: Shape) -> Result<Option<geo::Geometry<f64>>, FishnetError> {
    if matches!(shape, Shape::NullShape) {
        return Ok(None);
    }
    geo::Geometry::<f64>::try_from(shape)
        .map(Some)
        .map_err(|e| FishnetError::invalid_geometry(index, e.to_string()))
}

/// Lit le CRS du fichier .prj voisin (WKT), s'il existe
pub fn read_prj(path: &Path) -> Result<Option<Crs>, FishnetError> {
    let prj = path.with_extension("prj");
    if !prj.is_file() {
        return Ok(None);
    }
    let wkt = std::fs::read_to_string(&prj)?;
    Ok(Crs::from_name(&wkt))
}

/// Lit les dalles d'une grille Shapefile
pub fn read_tiles(path: &Path) -> Result<Vec<Tile>, FishnetError> {
    let mut reader = shapefile::Reader::from_path(path)?;
    let mut tiles = Vec::new();

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;

        let blok = attribute(&record, BLOK_FIELD)
            .ok_or_else(|| FishnetError::missing_attribute(index, BLOK_FIELD))?;
        let name = attribute(&record, NAME_FIELD)
            .ok_or_else(|| FishnetError::missing_attribute(index, NAME_FIELD))?;

        let mut polygons = Vec::new();
        let is_polygon = shape_to_geometry(index, shape)?
            .map(|g| collect_polygons(g, &mut polygons))
            .unwrap_or(false);
        if !is_polygon {
            return Err(FishnetError::invalid_geometry(
                index,
                "grid tile is not a polygon",
            ));
        }

        tiles.push(Tile {
            blok,
            name,
            geometry: MultiPolygon::new(polygons),
        });
    }

    Ok(tiles)
}

/// Lit les polygones d'une zone Shapefile
///
/// Retourne les polygones, le CRS du .prj (s'il existe) et le nombre de formes lues.
pub fn read_area(path: &Path) -> Result<(MultiPolygon<f64>, Option<Crs>, usize), FishnetError> {
    let crs = read_prj(path)?;
    let mut reader = shapefile::Reader::from_path(path)?;
    let mut polygons = Vec::new();
    let mut count = 0;

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, _) = result?;
        count += 1;

        let found = shape_to_geometry(index, shape)?
            .map(|g| collect_polygons(g, &mut polygons))
            .unwrap_or(false);
        if !found {
            debug!(feature = index, "Ignoring non-polygonal shape");
        }
    }

    Ok((MultiPolygon::new(polygons), crs, count))
}
