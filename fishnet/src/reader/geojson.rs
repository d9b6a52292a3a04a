//! Lecture GeoJSON (FeatureCollection, Feature ou géométrie nue)

use geo::{MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use tracing::debug;

use super::{collect_polygons, format_number, BLOK_FIELD, NAME_FIELD};
use crate::{Crs, FishnetError, Tile};

/// Contenu GeoJSON normalisé en liste de features
struct Document {
    features: Vec<Feature>,
    crs: Crs,
}

/// Parse un document GeoJSON
fn parse_document(content: &str) -> Result<Document, FishnetError> {
    let geojson: GeoJson = content.parse()?;

    let (features, foreign) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(f) => {
            let foreign = f.foreign_members.clone();
            (vec![f], foreign)
        }
        GeoJson::Geometry(g) => (
            vec![Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            None,
        ),
    };

    // RFC 7946 : sans membre `crs`, les coordonnées sont en WGS84
    let crs = foreign
        .as_ref()
        .and_then(crs_from_foreign_members)
        .unwrap_or(Crs::WGS84);

    Ok(Document { features, crs })
}

/// Extrait le CRS nommé d'un membre `crs` (GeoJSON 2008)
fn crs_from_foreign_members(members: &JsonObject) -> Option<Crs> {
    let name = members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    Crs::from_name(name)
}

/// Convertit la géométrie d'une feature en polygones
fn feature_polygons(
    index: usize,
    feature: Feature,
    out: &mut Vec<Polygon<f64>>,
) -> Result<bool, FishnetError> {
    let Some(geometry) = feature.geometry else {
        return Ok(false);
    };
    let geometry = geo::Geometry::<f64>::try_from(geometry.value)
        .map_err(|e| FishnetError::invalid_geometry(index, e.to_string()))?;
    Ok(collect_polygons(geometry, out))
}

/// Lit un attribut texte ou numérique
fn attribute(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => n.as_f64().map(format_number),
        _ => None,
    }
}

/// Lit les dalles d'une grille GeoJSON
pub fn read_tiles(content: &str) -> Result<Vec<Tile>, FishnetError> {
    let document = parse_document(content)?;
    let mut tiles = Vec::with_capacity(document.features.len());

    for (index, feature) in document.features.into_iter().enumerate() {
        let blok = attribute(&feature, BLOK_FIELD)
            .ok_or_else(|| FishnetError::missing_attribute(index, BLOK_FIELD))?;
        let name = attribute(&feature, NAME_FIELD)
            .ok_or_else(|| FishnetError::missing_attribute(index, NAME_FIELD))?;

        let mut polygons = Vec::new();
        if !feature_polygons(index, feature, &mut polygons)? {
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

/// Lit les polygones d'une zone GeoJSON
///
/// Retourne les polygones, le CRS déclaré et le nombre de features lues.
pub fn read_area(content: &str) -> Result<(MultiPolygon<f64>, Crs, usize), FishnetError> {
    let document = parse_document(content)?;
    let count = document.features.len();
    let mut polygons = Vec::new();

    for (index, feature) in document.features.into_iter().enumerate() {
        if !feature_polygons(index, feature, &mut polygons)? {
            debug!(feature = index, "Ignoring non-polygonal feature");
        }
    }

    Ok((MultiPolygon::new(polygons), document.crs, count))
}
