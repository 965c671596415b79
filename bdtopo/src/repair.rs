//! Normalisation et validation des emprises de bâtiments

use geo::{Geometry, LineString, MultiPolygon, Polygon};

use crate::BdtopoError;

/// Normalise une géométrie en MultiPolygon valide
///
/// Accepte Polygon, MultiPolygon et GeometryCollection de surfaces.
/// Les rings intérieurs dégénérés sont supprimés ; un extérieur dégénéré
/// rend la feature invalide.
pub fn into_footprint(geometry: Geometry, feature_id: &str) -> Result<MultiPolygon, BdtopoError> {
    let polygons = collect_polygons(geometry, feature_id)?;

    let mut cleaned = Vec::with_capacity(polygons.len());
    for polygon in polygons {
        cleaned.push(clean_polygon(polygon, feature_id)?);
    }

    if cleaned.is_empty() {
        return Err(BdtopoError::invalid_geometry(feature_id, "empty geometry"));
    }

    Ok(MultiPolygon::new(cleaned))
}

fn collect_polygons(geometry: Geometry, feature_id: &str) -> Result<Vec<Polygon>, BdtopoError> {
    match geometry {
        Geometry::Polygon(p) => Ok(vec![p]),
        Geometry::MultiPolygon(mp) => Ok(mp.0),
        Geometry::Rect(r) => Ok(vec![r.to_polygon()]),
        Geometry::GeometryCollection(gc) => {
            let mut polygons = Vec::new();
            for g in gc.0 {
                polygons.extend(collect_polygons(g, feature_id)?);
            }
            Ok(polygons)
        }
        other => Err(BdtopoError::UnsupportedGeometry {
            feature_id: feature_id.to_string(),
            kind: geometry_kind(&other).to_string(),
        }),
    }
}

fn clean_polygon(polygon: Polygon, feature_id: &str) -> Result<Polygon, BdtopoError> {
    let (exterior, interiors) = polygon.into_inner();

    if !ring_is_valid(&exterior) {
        return Err(BdtopoError::invalid_geometry(
            feature_id,
            format!("degenerate exterior ring ({} points)", exterior.0.len()),
        ));
    }

    let interiors: Vec<LineString> = interiors.into_iter().filter(ring_is_valid).collect();
    Ok(Polygon::new(exterior, interiors))
}

/// Un ring valide : au moins 4 points (fermé), coordonnées finies, 3 sommets distincts
fn ring_is_valid(ring: &LineString) -> bool {
    if ring.0.len() < 4 {
        return false;
    }
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return false;
    }
    let mut distinct = ring.0.clone();
    distinct.dedup();
    if distinct.first() == distinct.last() {
        distinct.pop();
    }
    distinct.len() >= 3
}

fn geometry_kind(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
