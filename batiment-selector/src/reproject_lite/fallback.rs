//! Repli sur PROJ pour les CRS hors Lambert 93 / WGS84 / Web Mercator
//!
//! Compilé uniquement avec le feature `reproject`.

use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use proj::Proj;

/// Transformation PROJ entre deux EPSG
pub struct ProjReprojector {
    proj: Proj,
}

impl ProjReprojector {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        let source = format!("EPSG:{}", source_epsg);
        let target = format!("EPSG:{}", target_epsg);

        // new_known_crs normalise l'ordre des axes (lon, lat)
        let proj = Proj::new_known_crs(&source, &target, None)
            .context(format!("Failed to create projection from {} to {}", source, target))?;

        Ok(Self { proj })
    }

    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        self.proj
            .convert((x, y))
            .context("Coordinate transformation failed")
    }

    /// Transforme une emprise, un appel PROJ par anneau
    pub fn transform_multipolygon(&self, geom: &MultiPolygon) -> Result<MultiPolygon> {
        let polygons = geom
            .iter()
            .map(|polygon| {
                let exterior = self.transform_ring(polygon.exterior())?;
                let interiors = polygon
                    .interiors()
                    .iter()
                    .map(|ring| self.transform_ring(ring))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Polygon::new(exterior, interiors))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MultiPolygon::new(polygons))
    }

    fn transform_ring(&self, ring: &LineString) -> Result<LineString> {
        let mut coords: Vec<(f64, f64)> = ring.coords().map(|c| (c.x, c.y)).collect();
        self.proj
            .convert_array(&mut coords)
            .context("Batch coordinate transformation failed")?;
        Ok(coords.into_iter().map(|(x, y)| Coord { x, y }).collect())
    }
}
