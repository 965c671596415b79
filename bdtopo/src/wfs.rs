//! Requêtes WFS GetFeature et source HTTP

use std::time::Duration;

use geo::Rect;
use reqwest::blocking::Client;
use reqwest::Url;
use tracing::{debug, info};

use crate::BdtopoError;

/// Endpoint WFS de la Géoplateforme IGN
pub const DEFAULT_WFS_URL: &str = "https://data.geopf.fr/wfs/ows";

/// Couche bâtiment de la BD TOPO v3
pub const BATIMENT_LAYER: &str = "BDTOPO_V3:batiment";

/// Requête GetFeature par emprise
#[derive(Debug, Clone, PartialEq)]
pub struct WfsQuery {
    /// URL du service
    pub endpoint: String,

    /// Nom de la couche (TYPENAME)
    pub type_name: String,

    /// EPSG de l'emprise et des géométries retournées
    pub srid: u32,

    /// Emprise de recherche, dans `srid`
    pub bbox: Rect,
}

impl WfsQuery {
    /// Crée une requête sur la couche bâtiment du service par défaut
    pub fn batiments(bbox: Rect, srid: u32) -> Self {
        Self {
            endpoint: DEFAULT_WFS_URL.to_string(),
            type_name: BATIMENT_LAYER.to_string(),
            srid,
            bbox,
        }
    }

    /// Paramètres de la requête, dans l'ordre attendu par le service
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let srs = format!("EPSG:{}", self.srid);
        let bbox = format!(
            "{},{},{},{},{}",
            self.bbox.min().x,
            self.bbox.min().y,
            self.bbox.max().x,
            self.bbox.max().y,
            srs
        );

        vec![
            ("SERVICE", "WFS".to_string()),
            ("VERSION", "2.0.0".to_string()),
            ("REQUEST", "GetFeature".to_string()),
            ("TYPENAME", self.type_name.clone()),
            ("SRSNAME", srs),
            ("BBOX", bbox),
            ("OUTPUTFORMAT", "application/json".to_string()),
        ]
    }

    /// URL complète de la requête
    pub fn url(&self) -> Result<Url, BdtopoError> {
        Url::parse_with_params(&self.endpoint, self.params()).map_err(|e| {
            BdtopoError::InvalidUrl {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            }
        })
    }
}

/// Source de features : renvoie le corps brut d'une réponse GetFeature
pub trait FeatureSource {
    fn get_features(&self, query: &WfsQuery) -> Result<Vec<u8>, BdtopoError>;
}

/// Client HTTP bloquant vers un service WFS
pub struct WfsClient {
    client: Client,
}

impl WfsClient {
    /// Crée un client avec un timeout global par requête
    pub fn new(timeout: Duration) -> Result<Self, BdtopoError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bdtopo/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl FeatureSource for WfsClient {
    fn get_features(&self, query: &WfsQuery) -> Result<Vec<u8>, BdtopoError> {
        let url = query.url()?;
        info!(layer = %query.type_name, srid = query.srid, "Récupération des données IGN");
        debug!(url = %url, "GET");

        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BdtopoError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}
