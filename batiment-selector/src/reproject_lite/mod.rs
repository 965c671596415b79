//! Reprojection légère en Rust pur (sans dépendances externes)
//!
//! Couvre les besoins du sélecteur :
//! - WGS84 (EPSG:4326) → Lambert 93 (EPSG:2154) pour le point central
//! - Lambert 93 → WGS84 pour le fond de carte et l'export
//! - WGS84 / Lambert 93 → Web Mercator (EPSG:3857)

mod ellipsoid;
mod lambert;
pub mod mercator;
mod smart;

#[cfg(feature = "reproject")]
mod fallback;

pub use smart::SmartReprojector;

use anyhow::{bail, Result};
use geo::{Coord, MapCoords, MultiPolygon};

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Reprojection légère entre WGS84, Lambert 93 et Web Mercator
pub struct ReprojectorLite {
    source_epsg: u32,
    target_epsg: u32,
}

impl ReprojectorLite {
    /// Crée un nouveau reprojector
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if !Self::is_supported(source_epsg, target_epsg) {
            bail!(
                "EPSG:{} → EPSG:{} non supporté. Paires supportées: 4326→2154, 2154→4326, 4326→3857, 2154→3857",
                source_epsg,
                target_epsg
            );
        }

        Ok(Self {
            source_epsg,
            target_epsg,
        })
    }

    /// Vérifie si la reprojection est supportée
    pub fn is_supported(source: u32, target: u32) -> bool {
        matches!(
            (source, target),
            (4326, 2154) | (2154, 4326) | (4326, 3857) | (2154, 3857)
        )
    }

    /// Transforme un point (x, y) de la source vers la cible
    ///
    /// En WGS84, x est la longitude et y la latitude, en degrés.
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        // Étape 1: Source → Géographique (WGS84)
        let geo = self.source_to_geographic(x, y)?;

        // Étape 2: Géographique → Cible
        self.geographic_to_target(geo)
    }

    fn source_to_geographic(&self, x: f64, y: f64) -> Result<Geographic> {
        match self.source_epsg {
            4326 => Ok(Geographic::from_degrees(x, y)),
            2154 => lambert::lambert93_to_geographic(x, y),
            _ => bail!("EPSG:{} non supporté", self.source_epsg),
        }
    }

    fn geographic_to_target(&self, geo: Geographic) -> Result<(f64, f64)> {
        match self.target_epsg {
            4326 => Ok(geo.to_degrees()),
            2154 => lambert::geographic_to_lambert93(geo),
            3857 => mercator::geographic_to_web_mercator(geo),
            _ => bail!("EPSG:{} non supporté", self.target_epsg),
        }
    }

    /// Transforme une emprise de bâtiment
    pub fn transform_multipolygon(&self, geom: &MultiPolygon) -> Result<MultiPolygon> {
        geom.try_map_coords(|c| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}
