//! Choix du moteur de reprojection pour une paire d'EPSG

#[cfg(not(feature = "reproject"))]
use anyhow::bail;
use anyhow::Result;
use geo::MultiPolygon;

use super::ReprojectorLite;

/// Reprojection entre le CRS des bâtiments et celui d'affichage ou d'export
///
/// Les paires couvertes par reproject_lite n'utilisent jamais PROJ.
pub enum SmartReprojector {
    /// Même EPSG des deux côtés
    Identity,
    /// Rust pur (WGS84, Lambert 93, Web Mercator)
    Lite(ReprojectorLite),
    #[cfg(feature = "reproject")]
    Proj(super::fallback::ProjReprojector),
}

impl SmartReprojector {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if source_epsg == target_epsg {
            return Ok(Self::Identity);
        }

        if ReprojectorLite::is_supported(source_epsg, target_epsg) {
            return Ok(Self::Lite(ReprojectorLite::new(source_epsg, target_epsg)?));
        }

        #[cfg(feature = "reproject")]
        {
            let proj = super::fallback::ProjReprojector::new(source_epsg, target_epsg)?;
            return Ok(Self::Proj(proj));
        }

        #[cfg(not(feature = "reproject"))]
        bail!(
            "EPSG:{} → EPSG:{} requires the `reproject` feature (PROJ); \
             built-in pairs: 4326↔2154, 4326→3857, 2154→3857",
            source_epsg,
            target_epsg
        );
    }

    /// Transforme un point (x = longitude, y = latitude en WGS84)
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self {
            Self::Identity => Ok((x, y)),
            Self::Lite(lite) => lite.transform_point(x, y),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.transform_point(x, y),
        }
    }

    /// Transforme l'emprise d'un bâtiment
    pub fn transform_multipolygon(&self, geom: &MultiPolygon) -> Result<MultiPolygon> {
        match self {
            Self::Identity => Ok(geom.clone()),
            Self::Lite(lite) => lite.transform_multipolygon(geom),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.transform_multipolygon(geom),
        }
    }
}
