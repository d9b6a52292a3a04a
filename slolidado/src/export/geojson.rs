//! Export des dalles sélectionnées vers GeoJSON avec geozero

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use fishnet::Tile;
use geo::Geometry;
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

/// Exporte des dalles en FeatureCollection GeoJSON
///
/// Chaque feature porte `BLOK`, `NAME` et, si `urls` est fourni, l'URL de
/// téléchargement de la dalle (même index).
pub fn export_tiles_to_geojson(
    tiles: &[Tile],
    urls: Option<&[String]>,
    epsg: u32,
    output_path: &Path,
) -> Result<()> {
    if let Some(urls) = urls {
        anyhow::ensure!(
            urls.len() == tiles.len(),
            "Expected {} URLs, got {}",
            tiles.len(),
            urls.len()
        );
    }

    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    write_collection(&mut writer, tiles, urls, epsg)?;
    writer.flush()?;

    Ok(())
}

fn write_collection<W: Write>(
    writer: &mut W,
    tiles: &[Tile],
    urls: Option<&[String]>,
    epsg: u32,
) -> Result<()> {
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":["#,
        epsg
    )?;

    for (i, tile) in tiles.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        let url = urls.and_then(|urls| urls.get(i)).map(String::as_str);
        write_tile(writer, tile, url)?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

/// Écrit une dalle en feature GeoJSON
fn write_tile<W: Write>(writer: &mut W, tile: &Tile, url: Option<&str>) -> Result<()> {
    write!(
        writer,
        r#"{{"type":"Feature","id":"{}_{}","#,
        escape_json(&tile.blok),
        escape_json(&tile.name)
    )?;

    write!(writer, r#""geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    Geometry::MultiPolygon(tile.geometry.clone()).process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(
        writer,
        r#","properties":{{"BLOK":"{}","NAME":"{}""#,
        escape_json(&tile.blok),
        escape_json(&tile.name)
    )?;
    if let Some(url) = url {
        write!(writer, r#","url":"{}""#, escape_json(url))?;
    }
    write!(writer, "}}}}")?;

    Ok(())
}

/// Échappe une chaîne pour JSON
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}
