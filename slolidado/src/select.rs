//! Sélection des dalles de la grille touchées par la zone d'intérêt

use std::fmt;

use fishnet::{AreaOfInterest, Tile};
use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon, Relate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LidarError, Result};
use crate::projection::ProjectionConfig;
use crate::reproject::Reprojector;

/// Prédicat spatial appliqué entre chaque dalle et la zone
///
/// Le prédicat s'évalue dans le sens dalle → zone : `Within` retient les
/// dalles entièrement dans la zone, `Contains` celles qui contiennent la zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialJoinMethod {
    #[default]
    Intersects,
    Within,
    Overlaps,
    Contains,
    Touches,
}

impl SpatialJoinMethod {
    pub const ALL: [SpatialJoinMethod; 5] = [
        SpatialJoinMethod::Intersects,
        SpatialJoinMethod::Within,
        SpatialJoinMethod::Overlaps,
        SpatialJoinMethod::Contains,
        SpatialJoinMethod::Touches,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpatialJoinMethod::Intersects => "intersects",
            SpatialJoinMethod::Within => "within",
            SpatialJoinMethod::Overlaps => "overlaps",
            SpatialJoinMethod::Contains => "contains",
            SpatialJoinMethod::Touches => "touches",
        }
    }

    /// Évalue le prédicat pour une dalle
    pub fn evaluate(&self, tile: &MultiPolygon<f64>, region: &MultiPolygon<f64>) -> bool {
        let matrix = tile.relate(region);
        match self {
            SpatialJoinMethod::Intersects => matrix.is_intersects(),
            SpatialJoinMethod::Within => matrix.is_within(),
            SpatialJoinMethod::Contains => matrix.is_contains(),
            // Surface/surface : intérieurs communs, chacun dépasse de l'autre
            SpatialJoinMethod::Overlaps => matrix.matches("T*T***T**").unwrap_or(false),
            // Intérieurs disjoints, frontières en contact
            SpatialJoinMethod::Touches => ["FT*******", "F**T*****", "F***T****"]
                .iter()
                .any(|pattern| matrix.matches(pattern).unwrap_or(false)),
        }
    }
}

impl fmt::Display for SpatialJoinMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SpatialJoinMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        SpatialJoinMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Invalid spatial join method: {}. Use: intersects, within, overlaps, contains, touches",
                    s
                )
            })
    }
}

/// Fusionne les parties de la zone en une seule région
///
/// Les parties d'aire nulle sont ignorées ; une zone vide ou dégénérée donne
/// une région vide.
pub fn dissolve(area: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let mut parts = area.0.iter().filter(|p| p.unsigned_area() > 0.0);

    let Some(first) = parts.next() else {
        return MultiPolygon::new(Vec::new());
    };

    parts.fold(MultiPolygon::new(vec![first.clone()]), |acc, p| {
        acc.union(&MultiPolygon::new(vec![p.clone()]))
    })
}

/// Retourne les dalles satisfaisant le prédicat contre la zone, dans l'ordre de la grille
///
/// `area` doit être exprimée dans le système de la grille.
pub fn select(tiles: &[Tile], area: &MultiPolygon<f64>, method: SpatialJoinMethod) -> Vec<Tile> {
    let region = dissolve(area);
    let Some(region_bbox) = region.bounding_rect() else {
        return Vec::new();
    };

    tiles
        .par_iter()
        .filter(|tile| {
            // Tous les prédicats supposent des emprises qui se rencontrent
            let Some(tile_bbox) = tile.geometry.bounding_rect() else {
                return false;
            };
            tile_bbox.intersects(&region_bbox) && method.evaluate(&tile.geometry, &region)
        })
        .cloned()
        .collect()
}

/// Sélection complète : reprojection de la zone, lecture de la grille, jointure
#[derive(Debug, Clone, Copy)]
pub struct TileSelector<'a> {
    projection: &'a ProjectionConfig,
    method: SpatialJoinMethod,
}

impl<'a> TileSelector<'a> {
    pub fn new(projection: &'a ProjectionConfig, method: SpatialJoinMethod) -> Self {
        Self { projection, method }
    }

    /// Sélectionne les dalles de la grille touchées par `area`
    ///
    /// # Errors
    ///
    /// `LidarError::Geometry` si une zone non vide n'a pas de CRS ou n'est pas reprojetable,
    /// `LidarError::Resource` si la grille est illisible.
    pub fn select(&self, area: &AreaOfInterest) -> Result<Vec<Tile>> {
        // Zone sans polygone : résultat vide, même sans CRS
        if area.is_empty() {
            warn!(area = %area.source.display(), "Area contains no polygon");
            return Ok(Vec::new());
        }

        let crs = area.crs.as_ref().ok_or_else(|| {
            LidarError::geometry(format!(
                "Area file {} has no coordinate reference system",
                area.source.display()
            ))
        })?;

        let reprojector = Reprojector::new(crs, self.projection.epsg)?;
        let geometry = reprojector.transform(&area.geometry)?;

        let grid = &self.projection.fishnet;
        let tiles = fishnet::read_grid(grid).map_err(|source| LidarError::Resource {
            path: grid.clone(),
            source,
        })?;

        let selected = select(&tiles, &geometry, self.method);
        debug!(
            grid_tiles = tiles.len(),
            selected = selected.len(),
            method = %self.method,
            "Spatial join done"
        );
        Ok(selected)
    }
}
