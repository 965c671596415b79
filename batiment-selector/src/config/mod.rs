//! Configuration du sélecteur

use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{Context, Result};

/// Côté par défaut de l'emprise de recherche (mètres)
pub const DEFAULT_SIDE_LENGTH: f64 = 100.0;

/// Distance maximale clic → bâtiment pour une sélection (unités du CRS projeté)
pub const DEFAULT_SELECTION_TOLERANCE: f64 = 15.0;

/// Fond de carte OpenStreetMap (Mapnik)
pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// URL du service WFS
    pub wfs_url: String,

    /// Couche interrogée (TYPENAME)
    pub layer_name: String,

    /// EPSG du CRS projeté (emprise, géométries, clics)
    pub srid: u32,

    /// Côté de l'emprise carrée de recherche
    pub side_length: f64,

    /// Distance maximale pour sélectionner un bâtiment (strictement inférieure)
    pub selection_tolerance: f64,

    /// Ignorer les features corrompues de la réponse
    pub skip_corrupted: bool,

    /// Timeout de la requête WFS (secondes)
    pub timeout_secs: u64,

    /// Attribut d'usage affiché dans le titre
    ///
    /// `usage_1` (schéma BD TOPO V3) et non `usage1` : choix délibéré, configurable.
    pub usage_field: String,

    /// Attribut identifiant
    pub id_field: String,

    /// Fond de carte
    pub basemap: BasemapConfig,

    /// Taille de la figure en pixels (carrée)
    pub figure_size: u32,
}

/// Configuration du fond de carte
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasemapConfig {
    /// Activer le fond de carte
    pub enabled: bool,

    /// Modèle d'URL XYZ (`{z}`, `{x}`, `{y}`, `{s}` optionnel)
    pub url_template: String,

    /// Nombre maximal de tuiles téléchargées par rendu
    pub max_tiles: usize,

    /// User-Agent envoyé au serveur de tuiles
    pub user_agent: String,

    /// Timeout par tuile (secondes)
    pub timeout_secs: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            wfs_url: bdtopo::DEFAULT_WFS_URL.to_string(),
            layer_name: bdtopo::BATIMENT_LAYER.to_string(),
            srid: 2154,
            side_length: DEFAULT_SIDE_LENGTH,
            selection_tolerance: DEFAULT_SELECTION_TOLERANCE,
            skip_corrupted: true,
            timeout_secs: 30,
            usage_field: "usage_1".to_string(),
            id_field: "cleabs".to_string(),
            basemap: BasemapConfig::default(),
            figure_size: 800,
        }
    }
}

impl Default for BasemapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_template: OSM_TILE_URL.to_string(),
            max_tiles: 16,
            user_agent: concat!("batiment-selector/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

impl SelectorConfig {
    /// Charge une configuration depuis un fichier JSON (champs absents = défauts)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Applique les surcharges d'environnement (`BATIMENT_*`)
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("BATIMENT_WFS_URL") {
            self.wfs_url = url;
        }
        if let Ok(layer) = std::env::var("BATIMENT_LAYER") {
            self.layer_name = layer;
        }
        if let Ok(tolerance) = std::env::var("BATIMENT_TOLERANCE") {
            self.selection_tolerance = tolerance
                .parse()
                .context(format!("Invalid BATIMENT_TOLERANCE: {}", tolerance))?;
        }
        if let Ok(url) = std::env::var("BATIMENT_BASEMAP_URL") {
            self.basemap.url_template = url;
        }
        if std::env::var("BATIMENT_NO_BASEMAP").is_ok_and(|v| !v.is_empty() && v != "0") {
            self.basemap.enabled = false;
        }
        self.validate()?;
        Ok(self)
    }

    /// Vérifie la cohérence des valeurs
    pub fn validate(&self) -> Result<()> {
        if !(self.side_length.is_finite() && self.side_length > 0.0) {
            anyhow::bail!("side_length must be > 0, got {}", self.side_length);
        }
        if !(self.selection_tolerance.is_finite() && self.selection_tolerance >= 0.0) {
            anyhow::bail!(
                "selection_tolerance must be >= 0, got {}",
                self.selection_tolerance
            );
        }
        if self.basemap.enabled && self.basemap.max_tiles == 0 {
            anyhow::bail!("basemap.max_tiles must be >= 1 (disable the basemap instead)");
        }
        if self.figure_size < 100 {
            anyhow::bail!("figure_size must be >= 100 px, got {}", self.figure_size);
        }
        Ok(())
    }

    /// Options du parser GeoJSON dérivées de la configuration
    pub fn parse_options(&self) -> bdtopo::ParseOptions {
        bdtopo::ParseOptions {
            skip_corrupted: self.skip_corrupted,
            default_epsg: self.srid,
            id_field: self.id_field.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service() {
        let config = SelectorConfig::default();
        assert_eq!(config.wfs_url, "https://data.geopf.fr/wfs/ows");
        assert_eq!(config.layer_name, "BDTOPO_V3:batiment");
        assert_eq!(config.srid, 2154);
        assert_eq!(config.side_length, 100.0);
        assert_eq!(config.selection_tolerance, 15.0);
        assert!(config.skip_corrupted);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SelectorConfig =
            serde_json::from_str(r#"{"side_length": 250, "basemap": {"enabled": false}}"#).unwrap();
        assert_eq!(config.side_length, 250.0);
        assert!(!config.basemap.enabled);
        assert_eq!(config.basemap.url_template, OSM_TILE_URL);
        assert_eq!(config.selection_tolerance, 15.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SelectorConfig {
            side_length: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SelectorConfig {
            selection_tolerance: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let mut config = SelectorConfig::default();
        config.basemap.max_tiles = 0;
        assert!(config.validate().is_err());
        config.basemap.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("batiment_selector_config_test.json");
        std::fs::write(&path, r#"{"selection_tolerance": 5.0, "usage_field": "usage1"}"#).unwrap();

        let config = SelectorConfig::load(&path).unwrap();
        assert_eq!(config.selection_tolerance, 5.0);
        assert_eq!(config.usage_field, "usage1");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_options() {
        let options = SelectorConfig::default().parse_options();
        assert!(options.skip_corrupted);
        assert_eq!(options.default_epsg, 2154);
        assert_eq!(options.id_field, "cleabs");
    }
}
