//! Point central et emprise de recherche

use anyhow::{bail, Context, Result};
use geo::{Point, Rect};

use crate::reproject_lite::SmartReprojector;

/// Point central en WGS84 (EPSG:4326), immuable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterPoint {
    lat: f64,
    lon: f64,
}

impl CenterPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            bail!("Coordonnées WGS84 invalides: lat={}, lon={}", lat, lon);
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Reprojette le point dans le CRS projeté `srid`
    pub fn project(&self, srid: u32) -> Result<Point> {
        let reprojector = SmartReprojector::new(4326, srid)?;
        let (x, y) = reprojector
            .transform_point(self.lon, self.lat)
            .context(format!("Failed to project center to EPSG:{}", srid))?;
        Ok(Point::new(x, y))
    }
}

/// Emprise carrée centrée sur le point reprojeté
///
/// Équivaut à l'enveloppe d'un buffer de rayon `side / 2` : un carré, pas un cercle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchEnvelope {
    pub center: Point,
    pub side: f64,
    pub srid: u32,
}

impl SearchEnvelope {
    pub fn around(center: &CenterPoint, side: f64, srid: u32) -> Result<Self> {
        if !(side.is_finite() && side > 0.0) {
            bail!("Side length must be > 0, got {}", side);
        }
        Ok(Self {
            center: center.project(srid)?,
            side,
            srid,
        })
    }

    /// Rectangle [minx, miny, maxx, maxy] dans le CRS projeté
    pub fn bbox(&self) -> Rect {
        let half = self.side / 2.0;
        Rect::new(
            (self.center.x() - half, self.center.y() - half),
            (self.center.x() + half, self.center.y() + half),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_center() {
        assert!(CenterPoint::new(91.0, 2.0).is_err());
        assert!(CenterPoint::new(48.0, 181.0).is_err());
        assert!(CenterPoint::new(f64::NAN, 2.0).is_err());
    }

    #[test]
    fn test_envelope_is_square_around_center() {
        let center = CenterPoint::new(48.8566, 2.3522).unwrap();
        let envelope = SearchEnvelope::around(&center, 100.0, 2154).unwrap();
        let bbox = envelope.bbox();

        assert!((bbox.width() - 100.0).abs() < 1e-6);
        assert!((bbox.height() - 100.0).abs() < 1e-6);
        assert!((bbox.center().x - 652469.0).abs() < 1.0);
        assert!((bbox.center().y - 6862035.3).abs() < 1.0);
    }

    #[test]
    fn test_envelope_rejects_zero_side() {
        let center = CenterPoint::new(48.8566, 2.3522).unwrap();
        assert!(SearchEnvelope::around(&center, 0.0, 2154).is_err());
    }

    #[test]
    fn test_identity_srid() {
        let center = CenterPoint::new(48.8566, 2.3522).unwrap();
        let p = center.project(4326).unwrap();
        assert_eq!((p.x(), p.y()), (2.3522, 48.8566));
    }
}
