//! Projection Lambert 93 (EPSG:2154)
//!
//! Lambert Conformal Conic avec 2 parallèles standards, dans les deux sens.

use super::ellipsoid::GRS80;
use super::Geographic;
use anyhow::{bail, Result};

/// Paramètres Lambert 93 (EPSG:2154)
struct Lambert93 {
    /// Longitude origine (méridien de Paris en RGF93 = Greenwich)
    lon0: f64,
    /// Latitude origine
    lat0: f64,
    /// Premier parallèle standard
    lat1: f64,
    /// Deuxième parallèle standard
    lat2: f64,
    /// False easting
    x0: f64,
    /// False northing
    y0: f64,
}

impl Default for Lambert93 {
    fn default() -> Self {
        Self {
            lon0: 3.0_f64.to_radians(),  // 3°E
            lat0: 46.5_f64.to_radians(), // 46.5°N
            lat1: 44.0_f64.to_radians(), // 44°N
            lat2: 49.0_f64.to_radians(), // 49°N
            x0: 700000.0,                // False easting
            y0: 6600000.0,               // False northing
        }
    }
}

/// Constantes dérivées du cône : exposant n, constante C, rayon à l'origine r0
struct Cone {
    n: f64,
    c: f64,
    r0: f64,
}

impl Lambert93 {
    fn cone(&self) -> Cone {
        let e = GRS80::E;
        let e2 = GRS80::E2;
        let a = GRS80::A;

        let n1 = grande_normale(self.lat1, a, e2);
        let n2 = grande_normale(self.lat2, a, e2);

        let iso_lat1 = isometric_latitude(self.lat1, e);
        let iso_lat2 = isometric_latitude(self.lat2, e);
        let iso_lat0 = isometric_latitude(self.lat0, e);

        let n = ((n1 * self.lat1.cos()).ln() - (n2 * self.lat2.cos()).ln()) / (iso_lat2 - iso_lat1);
        let c = (n1 * self.lat1.cos() / n) * (n * iso_lat1).exp();
        let r0 = c * (-n * iso_lat0).exp();

        Cone { n, c, r0 }
    }
}

/// Calcule la latitude isométrique
fn isometric_latitude(lat: f64, e: f64) -> f64 {
    let sin_lat = lat.sin();
    let term = ((1.0 - e * sin_lat) / (1.0 + e * sin_lat)).powf(e / 2.0);
    ((std::f64::consts::FRAC_PI_4 + lat / 2.0).tan() * term).ln()
}

/// Calcule la latitude depuis la latitude isométrique (itératif)
fn latitude_from_isometric(iso_lat: f64, e: f64) -> f64 {
    let mut lat = 2.0 * iso_lat.exp().atan() - std::f64::consts::FRAC_PI_2;

    for _ in 0..10 {
        let sin_lat = lat.sin();
        let term = ((1.0 + e * sin_lat) / (1.0 - e * sin_lat)).powf(e / 2.0);
        let new_lat = 2.0 * (iso_lat.exp() * term).atan() - std::f64::consts::FRAC_PI_2;

        if (new_lat - lat).abs() < 1e-12 {
            return new_lat;
        }
        lat = new_lat;
    }
    lat
}

/// Calcule la grande normale (rayon de courbure dans le plan vertical)
fn grande_normale(lat: f64, a: f64, e2: f64) -> f64 {
    a / (1.0 - e2 * lat.sin().powi(2)).sqrt()
}

/// Convertit des coordonnées géographiques WGS84 vers Lambert 93
pub fn geographic_to_lambert93(geo: Geographic) -> Result<(f64, f64)> {
    if !geo.lat.is_finite() || !geo.lon.is_finite() || geo.lat.abs() >= std::f64::consts::FRAC_PI_2 {
        bail!(
            "Coordonnées hors domaine Lambert 93: lon={}, lat={}",
            geo.lon.to_degrees(),
            geo.lat.to_degrees()
        );
    }

    let params = Lambert93::default();
    let cone = params.cone();

    let r = cone.c * (-cone.n * isometric_latitude(geo.lat, GRS80::E)).exp();
    let gamma = cone.n * (geo.lon - params.lon0);

    let x = params.x0 + r * gamma.sin();
    let y = params.y0 + cone.r0 - r * gamma.cos();

    Ok((x, y))
}

/// Convertit Lambert 93 vers coordonnées géographiques WGS84
pub fn lambert93_to_geographic(x: f64, y: f64) -> Result<Geographic> {
    let params = Lambert93::default();
    let Cone { n, c, r0 } = params.cone();

    // Coordonnées centrées
    let dx = x - params.x0;
    let dy = y - params.y0;

    // Rayon et angle
    let r = (dx.powi(2) + (r0 - dy).powi(2)).sqrt();
    let r = if n < 0.0 { -r } else { r };

    let gamma = (dx / (r0 - dy)).atan();

    // Latitude isométrique
    let iso_lat = -(r / c).ln() / n;

    let lat = latitude_from_isometric(iso_lat, GRS80::E);
    let lon = params.lon0 + gamma / n;

    Ok(Geographic::new(lon, lat))
}
