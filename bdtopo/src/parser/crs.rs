//! Détection du CRS déclaré dans une réponse GeoJSON

use geojson::JsonObject;
use serde_json::Value;

use crate::types::Projection;
use crate::BdtopoError;

/// Noms courts des projections connues
const PROJECTIONS: &[(u32, &str)] = &[
    (2154, "LAMB93"),
    (4326, "WGS84"),
    (3857, "WEBMERC"),
    (4171, "RGF93G"),
    (3942, "RGF93CC42"),
    (3943, "RGF93CC43"),
    (3944, "RGF93CC44"),
    (3945, "RGF93CC45"),
    (3946, "RGF93CC46"),
    (3947, "RGF93CC47"),
    (3948, "RGF93CC48"),
    (3949, "RGF93CC49"),
    (3950, "RGF93CC50"),
];

/// Construit une projection à partir d'un code EPSG
pub fn projection_for(epsg: u32) -> Projection {
    let name = PROJECTIONS
        .iter()
        .find(|&&(code, _)| code == epsg)
        .map(|&(_, name)| name)
        .unwrap_or("EPSG");
    Projection { epsg, name }
}

/// Extrait la projection du membre `crs` (GeoJSON 2008, renvoyé par GeoServer)
///
/// Retourne `Ok(None)` si aucun CRS n'est déclaré.
pub fn parse(foreign_members: Option<&JsonObject>) -> Result<Option<Projection>, BdtopoError> {
    let Some(crs) = foreign_members.and_then(|m| m.get("crs")) else {
        return Ok(None);
    };

    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str);

    match name {
        Some(name) => parse_name(name).map(Some),
        None => Err(BdtopoError::UnknownCrs(crs.to_string())),
    }
}

/// Parse un nom de CRS : `EPSG:2154`, `urn:ogc:def:crs:EPSG::2154`,
/// `http://www.opengis.net/def/crs/EPSG/0/2154` ou `urn:ogc:def:crs:OGC:1.3:CRS84`
pub fn parse_name(name: &str) -> Result<Projection, BdtopoError> {
    let trimmed = name.trim();

    if trimmed.ends_with("CRS84") {
        return Ok(projection_for(4326));
    }

    let upper = trimmed.to_ascii_uppercase();
    let Some(pos) = upper.rfind("EPSG") else {
        return Err(BdtopoError::UnknownCrs(name.to_string()));
    };

    let code: String = trimmed[pos + 4..]
        .rsplit(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or("")
        .to_string();

    code.parse::<u32>()
        .map(projection_for)
        .map_err(|_| BdtopoError::UnknownCrs(name.to_string()))
}
