//! Rapport de récupération des bâtiments
//!
//! Collecte le résultat d'un appel WFS (bâtiments chargés, features
//! ignorées, durée) pour l'affichage et l'export JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use bdtopo::{BdtopoError, ParseResult, WfsQuery};

/// Statut global de la récupération
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchStatus {
    /// Toutes les features ont été chargées
    Success,
    /// Chargée, avec des features corrompues ignorées
    PartialSuccess,
    /// Aucune donnée appliquée
    Failed,
}

/// Feature ignorée
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFeature {
    /// Identifiant de la feature (si connu)
    pub feature_id: Option<String>,
    /// Message d'erreur
    pub message: String,
}

impl From<&BdtopoError> for SkippedFeature {
    fn from(error: &BdtopoError) -> Self {
        let feature_id = match error {
            BdtopoError::InvalidGeometry { feature_id, .. }
            | BdtopoError::UnsupportedGeometry { feature_id, .. } => Some(feature_id.clone()),
            _ => None,
        };
        Self {
            feature_id,
            message: error.to_string(),
        }
    }
}

/// Rapport complet d'une récupération
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    /// Couche interrogée
    pub layer: String,
    /// EPSG de la requête
    pub srid: u32,
    /// Emprise [minx, miny, maxx, maxy]
    pub bbox: Option<[f64; 4]>,
    /// Durée de l'appel
    pub duration_secs: f64,
    /// Statut global
    pub status: FetchStatus,
    /// Nombre de bâtiments chargés
    pub buildings: usize,
    /// Features ignorées
    pub skipped: Vec<SkippedFeature>,
    /// Erreur fatale (statut Failed)
    pub error: Option<String>,
}

impl FetchReport {
    /// Crée un rapport pour une requête
    pub fn new(query: &WfsQuery) -> Self {
        Self {
            layer: query.type_name.clone(),
            srid: query.srid,
            bbox: Some([
                query.bbox.min().x,
                query.bbox.min().y,
                query.bbox.max().x,
                query.bbox.max().y,
            ]),
            duration_secs: 0.0,
            status: FetchStatus::Success,
            buildings: 0,
            skipped: Vec::new(),
            error: None,
        }
    }

    /// Rapport d'échec quand la requête n'a pas pu être construite
    pub fn failed(layer: &str, srid: u32, error: &anyhow::Error) -> Self {
        Self {
            layer: layer.to_string(),
            srid,
            bbox: None,
            duration_secs: 0.0,
            status: FetchStatus::Failed,
            buildings: 0,
            skipped: Vec::new(),
            error: Some(format!("{:#}", error)),
        }
    }

    /// Enregistre le résultat du parsing
    pub fn record_result(&mut self, result: &ParseResult) {
        self.buildings = result.buildings.len();
        self.skipped = result.errors.iter().map(SkippedFeature::from).collect();
    }

    /// Enregistre une erreur fatale
    pub fn record_failure(&mut self, error: &anyhow::Error) {
        self.error = Some(format!("{:#}", error));
    }

    /// Définit la durée de l'appel
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.error.is_some() {
            FetchStatus::Failed
        } else if !self.skipped.is_empty() {
            FetchStatus::PartialSuccess
        } else {
            FetchStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("FETCH REPORT - {} (EPSG:{})", self.layer, self.srid);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        if let Some([minx, miny, maxx, maxy]) = self.bbox {
            println!("BBOX: {:.2},{:.2},{:.2},{:.2}", minx, miny, maxx, maxy);
        }
        println!("Buildings: {} loaded, {} skipped", self.buildings, self.skipped.len());

        if let Some(ref error) = self.error {
            println!("\n--- ERROR ---");
            println!("  {}", error);
        }

        if !self.skipped.is_empty() {
            println!("\n--- SKIPPED ({}) ---", self.skipped.len());
            for s in self.skipped.iter().take(20) {
                let location = s
                    .feature_id
                    .as_deref()
                    .map(|id| format!("[{}] ", id))
                    .unwrap_or_default();
                println!("  {}{}", location, s.message);
            }
            if self.skipped.len() > 20 {
                println!("  ... and {} more", self.skipped.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} buildings, {} skipped, {:?}",
            self.layer,
            self.buildings,
            self.skipped.len(),
            self.status
        )
    }
}
