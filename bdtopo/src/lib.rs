//! # bdtopo
//!
//! Récupération des bâtiments de la BD TOPO (IGN) via le service WFS de la Géoplateforme.
//!
//! ## Features
//!
//! - Construction des requêtes GetFeature par emprise (`BBOX`)
//! - Client HTTP bloquant (`reqwest`), derrière le trait [`FeatureSource`]
//! - Parsing GeoJSON vers des types `geo`, emprises normalisées en `MultiPolygon`
//! - Mode tolérant explicite pour les features corrompues ([`ParseOptions::skip_corrupted`])
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bdtopo::{fetch, ParseOptions, WfsClient, WfsQuery};
//! use geo::Rect;
//! use std::time::Duration;
//!
//! let client = WfsClient::new(Duration::from_secs(30))?;
//! let query = WfsQuery::batiments(Rect::new((652331.0, 6861997.0), (652431.0, 6862097.0)), 2154);
//! let result = fetch(&client, &query, &ParseOptions::default())?;
//! println!("{} bâtiments", result.buildings.len());
//! ```

pub mod error;
pub mod parser;
pub mod repair;
pub mod types;
pub mod wfs;

pub use error::BdtopoError;
pub use types::{Building, BuildingCollection, ParseOptions, ParseResult, Projection};
pub use wfs::{FeatureSource, WfsClient, WfsQuery, BATIMENT_LAYER, DEFAULT_WFS_URL};

/// Parse le corps d'une réponse GetFeature (GeoJSON).
///
/// # Errors
///
/// Retourne `BdtopoError` si le corps n'est pas une FeatureCollection GeoJSON,
/// si le CRS déclaré est illisible, ou si une feature est corrompue alors que
/// `skip_corrupted` est désactivé.
pub fn parse(data: &[u8], options: &ParseOptions) -> Result<ParseResult, BdtopoError> {
    parser::geojson::parse(data, options)
}

/// Exécute une requête sur une source et parse la réponse.
///
/// Aucune nouvelle tentative n'est faite en cas d'échec.
pub fn fetch(
    source: &dyn FeatureSource,
    query: &WfsQuery,
    options: &ParseOptions,
) -> Result<ParseResult, BdtopoError> {
    let body = source.get_features(query)?;
    parse(&body, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Rect;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl FeatureSource for CountingSource {
        fn get_features(&self, _query: &WfsQuery) -> Result<Vec<u8>, BdtopoError> {
            self.calls.set(self.calls.get() + 1);
            Err(BdtopoError::Status {
                status: 503,
                url: "test".to_string(),
            })
        }
    }

    #[test]
    fn test_fetch_does_not_retry() {
        let source = CountingSource {
            calls: Cell::new(0),
        };
        let query = WfsQuery::batiments(Rect::new((0.0, 0.0), (1.0, 1.0)), 2154);
        assert!(fetch(&source, &query, &ParseOptions::default()).is_err());
        assert_eq!(source.calls.get(), 1);
    }
}
