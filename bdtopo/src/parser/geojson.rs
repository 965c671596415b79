//! Parser GeoJSON des réponses WFS (`OUTPUTFORMAT=application/json`)

use geo::Geometry;
use geojson::{feature::Id, Feature, GeoJson};
use tracing::{debug, warn};

use super::crs;
use crate::repair;
use crate::types::{Building, BuildingCollection, ParseOptions, ParseResult};
use crate::BdtopoError;

/// Parse le corps d'une réponse GetFeature en collection de bâtiments
pub fn parse(data: &[u8], options: &ParseOptions) -> Result<ParseResult, BdtopoError> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    let geojson = GeoJson::try_from(value)?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(_) => {
            return Err(BdtopoError::NotAFeatureCollection("Feature".to_string()))
        }
        GeoJson::Geometry(_) => {
            return Err(BdtopoError::NotAFeatureCollection("Geometry".to_string()))
        }
    };

    let projection = crs::parse(collection.foreign_members.as_ref())?
        .unwrap_or_else(|| crs::projection_for(options.default_epsg));

    let mut buildings = Vec::with_capacity(collection.features.len());
    let mut errors = Vec::new();

    for (index, feature) in collection.features.into_iter().enumerate() {
        match build_building(feature, index, &options.id_field) {
            Ok(building) => buildings.push(building),
            Err(e) if options.skip_corrupted && e.is_feature_level() => {
                warn!(error = %e, "Feature corrompue ignorée");
                errors.push(e);
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        buildings = buildings.len(),
        skipped = errors.len(),
        epsg = projection.epsg,
        "Réponse WFS parsée"
    );

    Ok(ParseResult {
        buildings: BuildingCollection::new(buildings, projection),
        errors,
    })
}

/// Construit un bâtiment depuis une feature GeoJSON
fn build_building(feature: Feature, index: usize, id_field: &str) -> Result<Building, BdtopoError> {
    let properties = feature.properties.unwrap_or_default();

    // Identifiant : attribut métier, puis id de la feature, puis position
    let id = properties
        .get(id_field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| match feature.id {
            Some(Id::String(ref s)) => Some(s.clone()),
            Some(Id::Number(ref n)) => Some(n.to_string()),
            None => None,
        })
        .unwrap_or_else(|| format!("feature_{}", index));

    let Some(geometry) = feature.geometry else {
        return Err(BdtopoError::invalid_geometry(id, "missing geometry"));
    };

    let geometry = Geometry::<f64>::try_from(geometry)
        .map_err(|e| BdtopoError::invalid_geometry(id.as_str(), e.to_string()))?;

    let footprint = repair::into_footprint(geometry, &id)?;

    Ok(Building {
        id,
        geometry: footprint,
        properties,
    })
}
