//! Export GeoJSON des bâtiments

pub mod geojson;

pub use self::geojson::export_to_geojson;
