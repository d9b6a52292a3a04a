//! Lecture GeoPackage (première table de features de `gpkg_contents`)
//!
//! Les géométries sont des blobs GPB (en-tête `GP` + WKB), décodés par geozero.
//! Le CRS vient de `gpkg_spatial_ref_sys` via le `srs_id` de la colonne géométrique.

use std::path::Path;

use geo::MultiPolygon;
use geozero::wkb::GpkgWkb;
use geozero::ToGeo;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use super::{collect_polygons, format_number, BLOK_FIELD, NAME_FIELD};
use crate::{Crs, FishnetError, Tile};

/// Table de features et sa colonne géométrique
#[derive(Debug)]
struct FeatureTable {
    name: String,
    geometry_column: String,
    srs_id: i64,
}

fn open(path: &Path) -> Result<Connection, FishnetError> {
    // Lecture seule : un chemin absent est une erreur, pas une base vide
    if !path.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )
        .into());
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Ok(Connection::open_with_flags(path, flags)?)
}

/// Identifiant SQL entre guillemets
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn feature_table(conn: &Connection) -> Result<FeatureTable, FishnetError> {
    conn.query_row(
        "SELECT c.table_name, g.column_name, g.srs_id
         FROM gpkg_contents c
         JOIN gpkg_geometry_columns g ON g.table_name = c.table_name
         WHERE c.data_type = 'features'
         ORDER BY c.rowid
         LIMIT 1",
        [],
        |row| {
            Ok(FeatureTable {
                name: row.get(0)?,
                geometry_column: row.get(1)?,
                srs_id: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or(FishnetError::NoFeatureTable)
}

/// CRS d'un `srs_id` : code EPSG si l'organisation est EPSG, sinon définition WKT
fn read_crs(conn: &Connection, srs_id: i64) -> Result<Option<Crs>, FishnetError> {
    // -1 et 0 : systèmes cartésien et géographique non définis
    if srs_id <= 0 {
        return Ok(None);
    }

    let row = conn
        .query_row(
            "SELECT organization, organization_coordsys_id, definition
             FROM gpkg_spatial_ref_sys WHERE srs_id = ?1",
            [srs_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    Ok(row.and_then(|(organization, code, definition)| {
        let epsg = organization
            .eq_ignore_ascii_case("EPSG")
            .then(|| u32::try_from(code).ok())
            .flatten();
        epsg.map(Crs::Epsg).or_else(|| Crs::from_name(&definition))
    }))
}

/// Lit un attribut texte ou numérique
fn attribute(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(n) => Some(format_number(n)),
        _ => None,
    }
}

/// Décode un blob GPB ; `None` pour une géométrie NULL
fn blob_geometry(index: usize, value: ValueRef<'_>) -> Result<Option<geo::Geometry<f64>>, FishnetError> {
    match value {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(blob) => GpkgWkb(blob)
            .to_geo()
            .map(Some)
            .map_err(|e| FishnetError::invalid_geometry(index, e.to_string())),
        _ => Err(FishnetError::invalid_geometry(index, "geometry is not a blob")),
    }
}

/// Lit les dalles d'une grille GeoPackage
pub fn read_tiles(path: &Path) -> Result<Vec<Tile>, FishnetError> {
    let conn = open(path)?;
    let table = feature_table(&conn)?;

    let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote(&table.name)))?;
    let geometry_index = stmt.column_index(&table.geometry_column)?;
    let blok_index = stmt
        .column_index(BLOK_FIELD)
        .map_err(|_| FishnetError::missing_attribute(0, BLOK_FIELD))?;
    let name_index = stmt
        .column_index(NAME_FIELD)
        .map_err(|_| FishnetError::missing_attribute(0, NAME_FIELD))?;

    let mut rows = stmt.query([])?;
    let mut tiles = Vec::new();

    while let Some(row) = rows.next()? {
        let index = tiles.len();
        let blok = attribute(row.get_ref(blok_index)?)
            .ok_or_else(|| FishnetError::missing_attribute(index, BLOK_FIELD))?;
        let name = attribute(row.get_ref(name_index)?)
            .ok_or_else(|| FishnetError::missing_attribute(index, NAME_FIELD))?;

        let mut polygons = Vec::new();
        let is_polygon = blob_geometry(index, row.get_ref(geometry_index)?)?
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

/// Lit les polygones d'une zone GeoPackage
///
/// Retourne les polygones, le CRS de la colonne géométrique et le nombre de features lues.
pub fn read_area(path: &Path) -> Result<(MultiPolygon<f64>, Option<Crs>, usize), FishnetError> {
    let conn = open(path)?;
    let table = feature_table(&conn)?;
    let crs = read_crs(&conn, table.srs_id)?;
    debug!(table = %table.name, srs_id = table.srs_id, "GeoPackage feature table");

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} ORDER BY rowid",
        quote(&table.geometry_column),
        quote(&table.name)
    ))?;
    let mut rows = stmt.query([])?;
    let mut polygons = Vec::new();
    let mut count = 0;

    while let Some(row) = rows.next()? {
        let index = count;
        count += 1;

        let found = blob_geometry(index, row.get_ref(0)?)?
            .map(|g| collect_polygons(g, &mut polygons))
            .unwrap_or(false);
        if !found {
            debug!(feature = index, "Ignoring non-polygonal feature");
        }
    }

    Ok((MultiPolygon::new(polygons), crs, count))
}
