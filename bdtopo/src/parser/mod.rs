//! Parsers des réponses du service WFS

pub mod crs;
pub mod geojson;
