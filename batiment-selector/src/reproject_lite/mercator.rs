//! Projection Web Mercator (EPSG:3857) et grille de tuiles XYZ
//!
//! Aussi connu sous le nom de Pseudo-Mercator ou Spherical Mercator.
//! Utilisé par OpenStreetMap pour ses tuiles.

use super::ellipsoid::WGS84;
use super::Geographic;
use anyhow::Result;

/// Latitude maximale de la grille de tuiles
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Convertit coordonnées géographiques vers Web Mercator (EPSG:3857)
pub fn geographic_to_web_mercator(geo: Geographic) -> Result<(f64, f64)> {
    // Web Mercator utilise un modèle sphérique avec le rayon équatorial
    let r = WGS84::A;

    // Limiter la latitude pour éviter l'infini
    let lat = geo
        .lat
        .clamp(-MAX_LATITUDE.to_radians(), MAX_LATITUDE.to_radians());

    let x = r * geo.lon;
    let y = r * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();

    Ok((x, y))
}

/// Position fractionnaire dans la grille de tuiles au niveau `zoom`
pub fn geographic_to_tile(geo: Geographic, zoom: u8) -> (f64, f64) {
    let n = f64::from(1u32 << zoom);
    let (lon, lat) = geo.to_degrees();
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * n;
    (x, y)
}

/// Coin nord-ouest d'une tuile (ou de toute position de grille)
pub fn tile_to_geographic(x: f64, y: f64, zoom: u8) -> Geographic {
    let n = f64::from(1u32 << zoom);
    let lon = x / n * 360.0 - 180.0;
    let lat = (std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh().atan();
    Geographic::new(lon.to_radians(), lat)
}

/// Résolution au sol (mètres par pixel) d'une tuile de 256 px
pub fn ground_resolution(lat_deg: f64, zoom: u8) -> f64 {
    let circumference = 2.0 * std::f64::consts::PI * WGS84::A;
    circumference * lat_deg.to_radians().cos() / (256.0 * f64::from(1u32 << zoom))
}
