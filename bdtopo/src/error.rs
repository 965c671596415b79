//! Types d'erreurs pour le crate bdtopo

use thiserror::Error;

/// Erreurs pouvant survenir lors de la récupération ou du parsing des bâtiments
#[derive(Debug, Error)]
pub enum BdtopoError {
    /// Erreur réseau (connexion, timeout, lecture du corps)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Le service a répondu avec un statut non 2xx
    #[error("WFS service responded with status {status} for {url}")]
    Status { status: u16, url: String },

    /// URL du service invalide
    #[error("Invalid WFS URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Réponse non JSON (ex: ExceptionReport XML)
    #[error("Invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON valide mais pas du GeoJSON
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Le document n'est pas une FeatureCollection
    #[error("Expected a FeatureCollection, got {0}")]
    NotAFeatureCollection(String),

    /// Géométrie absente ou invalide
    #[error("Invalid geometry for {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    /// Type de géométrie non surfacique
    #[error("Unsupported geometry type {kind} for {feature_id}")]
    UnsupportedGeometry { feature_id: String, kind: String },

    /// Système de référence non reconnu
    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),
}

impl BdtopoError {
    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(feature_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            feature_id: feature_id.into(),
            reason: reason.into(),
        }
    }

    /// Indique si l'erreur concerne une feature isolée (ignorable en mode tolérant)
    pub fn is_feature_level(&self) -> bool {
        matches!(
            self,
            Self::InvalidGeometry { .. } | Self::UnsupportedGeometry { .. }
        )
    }
}
