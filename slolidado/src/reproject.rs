//! Reprojection de la zone d'intérêt avec PROJ
//!
//! La reprojection entre deux systèmes distincts n'est disponible qu'avec le
//! feature `reproject` (activé par défaut).

use fishnet::Crs;
use geo::MultiPolygon;

use crate::error::{LidarError, Result};

/// Vérifie si la reprojection est disponible
pub fn is_available() -> bool {
    cfg!(feature = "reproject")
}

#[cfg(feature = "reproject")]
use geo::{Coord, LineString, Polygon};
#[cfg(feature = "reproject")]
use proj::Proj;

/// Reprojection d'une zone vers le système EPSG d'une grille
#[cfg(feature = "reproject")]
pub struct Reprojector {
    /// `None` quand source et cible sont identiques
    proj: Option<Proj>,
    source: Crs,
    target_epsg: u32,
}

#[cfg(feature = "reproject")]
impl Reprojector {
    /// Crée un reprojector de `source` vers `EPSG:target_epsg`
    pub fn new(source: &Crs, target_epsg: u32) -> Result<Self> {
        if source.epsg() == Some(target_epsg) {
            return Ok(Self {
                proj: None,
                source: source.clone(),
                target_epsg,
            });
        }

        let target = format!("EPSG:{}", target_epsg);
        let proj = Proj::new_known_crs(&source.to_proj_string(), &target, None).map_err(|e| {
            LidarError::geometry(format!(
                "Failed to create projection from {} to {}: {}",
                source, target, e
            ))
        })?;

        Ok(Self {
            proj: Some(proj),
            source: source.clone(),
            target_epsg,
        })
    }

    /// Retourne le CRS source
    pub fn source(&self) -> &Crs {
        &self.source
    }

    /// Retourne le SRID cible
    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Transforme un MultiPolygon
    pub fn transform(&self, geom: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        let Some(proj) = &self.proj else {
            return Ok(geom.clone());
        };

        let polys: Result<Vec<Polygon<f64>>> = geom
            .0
            .iter()
            .map(|p| transform_polygon(proj, p))
            .collect();
        Ok(MultiPolygon::new(polys?))
    }
}

/// Transforme un anneau (conversion batch)
#[cfg(feature = "reproject")]
fn transform_linestring(proj: &Proj, ls: &LineString<f64>) -> Result<LineString<f64>> {
    let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

    proj.convert_array(&mut coords)
        .map_err(|e| LidarError::geometry(format!("Coordinate transformation failed: {}", e)))?;

    if coords.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(LidarError::geometry(
            "Coordinate transformation produced non-finite values",
        ));
    }

    Ok(LineString::new(
        coords.into_iter().map(|(x, y)| Coord { x, y }).collect(),
    ))
}

#[cfg(feature = "reproject")]
fn transform_polygon(proj: &Proj, p: &Polygon<f64>) -> Result<Polygon<f64>> {
    let exterior = transform_linestring(proj, p.exterior())?;
    let interiors: Result<Vec<LineString<f64>>> = p
        .interiors()
        .iter()
        .map(|ls| transform_linestring(proj, ls))
        .collect();
    Ok(Polygon::new(exterior, interiors?))
}

/// Reprojector sans PROJ : seule l'identité est possible
#[cfg(not(feature = "reproject"))]
pub struct Reprojector {
    source: Crs,
    target_epsg: u32,
}

#[cfg(not(feature = "reproject"))]
impl Reprojector {
    /// Échoue dès que source et cible diffèrent
    pub fn new(source: &Crs, target_epsg: u32) -> Result<Self> {
        if source.epsg() == Some(target_epsg) {
            Ok(Self {
                source: source.clone(),
                target_epsg,
            })
        } else {
            Err(LidarError::geometry(format!(
                "Reprojection from {} to EPSG:{} requires the 'reproject' feature. \
                 Build with: cargo build --features reproject",
                source, target_epsg
            )))
        }
    }

    pub fn source(&self) -> &Crs {
        &self.source
    }

    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Retourne la géométrie inchangée
    pub fn transform(&self, geom: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        Ok(geom.clone())
    }
}
