//! Lecteurs des formats vectoriels (GeoJSON, Shapefile, GeoPackage)

pub mod geojson;
pub mod gpkg;
pub mod shp;

use geo::{Geometry, Polygon};

/// Nom de l'attribut identifiant le bloc
pub const BLOK_FIELD: &str = "BLOK";

/// Nom de l'attribut identifiant la dalle
pub const NAME_FIELD: &str = "NAME";

/// Ajoute les parties polygonales d'une géométrie à `out`
///
/// Retourne `false` si la géométrie ne contient aucun polygone.
pub(crate) fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) -> bool {
    match geometry {
        Geometry::Polygon(p) => {
            out.push(p);
            true
        }
        Geometry::MultiPolygon(mp) => {
            let found = !mp.0.is_empty();
            out.extend(mp.0);
            found
        }
        Geometry::Rect(r) => {
            out.push(r.to_polygon());
            true
        }
        Geometry::Triangle(t) => {
            out.push(t.to_polygon());
            true
        }
        Geometry::GeometryCollection(gc) => {
            let mut found = false;
            for g in gc.0 {
                found |= collect_polygons(g, out);
            }
            found
        }
        _ => false,
    }
}

/// Rend une valeur numérique d'attribut comme le ferait une colonne entière
///
/// `1.0` devient `"1"`, `2.5` reste `"2.5"`.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
