//! Sélecteur de bâtiments
//!
//! Cycle d'utilisation (cellules de notebook ou CLI) :
//! `fetch` → `render` → clics (`on_click`) → `get_selection`.
//!
//! États : {sans données} → fetch OK → {données, sans sélection}
//! → clic qualifiant → {données, sélection}. Un fetch réussi repart de
//! {données, sans sélection} ; un fetch en échec ne change rien.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use bdtopo::{Building, BuildingCollection, FeatureSource, WfsClient, WfsQuery};

use crate::config::SelectorConfig;
use crate::envelope::{CenterPoint, SearchEnvelope};
use crate::figure::basemap::{self, BasemapOutcome, HttpTileSource, TileSource};
use crate::figure::{ClickEvent, Figure, FigureId, BASE_STYLE, HIGHLIGHT_STYLE};
use crate::report::FetchReport;

/// Titre d'une figure sans sélection
pub const PROMPT_TITLE: &str = "Cliquez sur un bâtiment";

/// Usage affiché quand l'attribut est absent
const UNKNOWN_USAGE: &str = "Inconnu";

/// Sélecteur interactif de bâtiments autour d'un point
pub struct Selector {
    center: CenterPoint,
    config: SelectorConfig,
    source: Box<dyn FeatureSource>,
    tiles: Option<Box<dyn TileSource>>,
    buildings: Option<BuildingCollection>,
    selected: Option<usize>,
    figure: Option<Figure>,
    next_figure_id: u64,
    last_report: Option<FetchReport>,
}

impl Selector {
    /// Crée un sélecteur branché sur le service WFS et le serveur de tuiles configurés
    pub fn new(lat: f64, lon: f64, config: SelectorConfig) -> Result<Self> {
        let source = WfsClient::new(Duration::from_secs(config.timeout_secs))
            .context("Failed to build WFS client")?;
        let tiles: Option<Box<dyn TileSource>> = if config.basemap.enabled {
            Some(Box::new(
                HttpTileSource::new(&config.basemap).context("Failed to build tile client")?,
            ))
        } else {
            None
        };

        Self::with_sources(lat, lon, config, Box::new(source), tiles)
    }

    /// Crée un sélecteur avec des sources explicites
    pub fn with_sources(
        lat: f64,
        lon: f64,
        config: SelectorConfig,
        source: Box<dyn FeatureSource>,
        tiles: Option<Box<dyn TileSource>>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            center: CenterPoint::new(lat, lon)?,
            config,
            source,
            tiles,
            buildings: None,
            selected: None,
            figure: None,
            next_figure_id: 1,
            last_report: None,
        })
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Emprise de recherche dans le CRS projeté
    pub fn envelope(&self) -> Result<SearchEnvelope> {
        SearchEnvelope::around(&self.center, self.config.side_length, self.config.srid)
    }

    /// Requête GetFeature correspondant à l'emprise
    pub fn query(&self) -> Result<WfsQuery> {
        let envelope = self.envelope()?;
        Ok(WfsQuery {
            endpoint: self.config.wfs_url.clone(),
            type_name: self.config.layer_name.clone(),
            srid: self.config.srid,
            bbox: envelope.bbox(),
        })
    }

    /// Récupère les bâtiments ; `false` en cas d'échec (état inchangé)
    pub fn fetch(&mut self) -> bool {
        match self.try_fetch() {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Erreur lors de la récupération des bâtiments");
                let report = match self.query() {
                    Ok(query) => {
                        let mut report = FetchReport::new(&query);
                        report.record_failure(&e);
                        report.finalize();
                        report
                    }
                    Err(_) => FetchReport::failed(&self.config.layer_name, self.config.srid, &e),
                };
                self.last_report = Some(report);
                false
            }
        }
    }

    /// Récupère les bâtiments et retourne le rapport, ou l'erreur
    ///
    /// En cas d'erreur, rien n'est appliqué. En cas de succès, la collection est
    /// remplacée en bloc : la sélection est effacée et la figure courante fermée.
    pub fn try_fetch(&mut self) -> Result<FetchReport> {
        let start = Instant::now();
        let query = self.query()?;
        let mut report = FetchReport::new(&query);

        let result = bdtopo::fetch(self.source.as_ref(), &query, &self.config.parse_options())
            .context("WFS GetFeature failed")?;

        report.record_result(&result);
        report.set_duration(start.elapsed());
        report.finalize();

        info!(
            buildings = result.buildings.len(),
            skipped = result.errors.len(),
            "{} bâtiments chargés",
            result.buildings.len()
        );

        self.buildings = Some(result.buildings);
        self.selected = None;
        self.close_figure();
        self.last_report = Some(report.clone());

        Ok(report)
    }

    /// Crée une nouvelle figure (la précédente est fermée)
    ///
    /// Retourne `None` tant qu'aucune donnée n'a été récupérée.
    pub fn render(&mut self) -> Option<&Figure> {
        let buildings = self.buildings.as_ref()?;
        let srid = buildings.projection().epsg;
        // Collection vide : on cadre sur l'emprise de recherche
        let bounds = match buildings.bounds() {
            Some(bounds) => bounds,
            None => self.envelope().ok()?.bbox(),
        };

        self.close_figure();

        let id = FigureId(self.next_figure_id);
        self.next_figure_id += 1;
        let mut figure = Figure::new(id, bounds, self.config.figure_size);

        if let Some(tiles) = self.tiles.as_deref() {
            let viewport = figure.viewport();
            let outcome = basemap::enrich(
                tiles,
                viewport.extent(),
                srid,
                viewport.meters_per_pixel(),
                self.config.basemap.max_tiles,
            );
            if let BasemapOutcome::Skipped(ref reason) = outcome {
                debug!(reason = %reason, "Fond de carte ignoré");
            }
            figure.set_basemap(outcome);
        }

        self.figure = Some(figure);
        self.redraw();
        debug!(figure = id.0, "Figure créée");

        self.figure.as_ref()
    }

    /// Figure courante, si elle existe
    pub fn figure(&self) -> Option<&Figure> {
        self.figure.as_ref()
    }

    /// Traite un clic ; retourne `true` si la sélection a changé
    ///
    /// Ignoré si le clic est hors des axes de la figure courante, si aucun
    /// bâtiment n'est à moins de `selection_tolerance`, ou sans données.
    pub fn on_click(&mut self, event: &ClickEvent) -> bool {
        let Some(point) = self.figure.as_ref().and_then(|f| f.locate(event)) else {
            debug!(x = event.x, y = event.y, "Clic hors des axes");
            return false;
        };
        let Some(buildings) = self.buildings.as_ref() else {
            return false;
        };
        let Some((index, distance)) = buildings.nearest(&point) else {
            return false;
        };

        if distance >= self.config.selection_tolerance {
            debug!(
                x = point.x(),
                y = point.y(),
                distance,
                "Aucun bâtiment à moins de {} m",
                self.config.selection_tolerance
            );
            return false;
        }

        self.selected = Some(index);
        self.redraw();

        if let Some(building) = self.get_selection() {
            info!(id = %building.id, distance, "Bâtiment sélectionné : {}", building.id);
        }
        true
    }

    /// Bâtiment sélectionné
    pub fn get_selection(&self) -> Option<&Building> {
        let index = self.selected?;
        self.buildings.as_ref()?.get(index)
    }

    /// Sélection sous forme de collection d'un élément (pour l'export)
    pub fn selection_collection(&self) -> Option<BuildingCollection> {
        let index = self.selected?;
        self.buildings.as_ref()?.subset(index)
    }

    /// Collection courante
    pub fn buildings(&self) -> Option<&BuildingCollection> {
        self.buildings.as_ref()
    }

    /// Rapport du dernier appel à `fetch`
    pub fn last_report(&self) -> Option<&FetchReport> {
        self.last_report.as_ref()
    }

    /// Redessine la figure : couche de base, surbrillance, titre
    fn redraw(&mut self) {
        let (Some(figure), Some(buildings)) = (self.figure.as_mut(), self.buildings.as_ref())
        else {
            return;
        };

        figure.clear();
        figure.plot(
            buildings.iter().map(|b| b.geometry.clone()).collect(),
            BASE_STYLE,
        );

        match self.selected.and_then(|i| buildings.get(i)) {
            Some(building) => {
                figure.plot(vec![building.geometry.clone()], HIGHLIGHT_STYLE);
                figure.set_title(selection_title(building, &self.config.usage_field));
            }
            None => figure.set_title(PROMPT_TITLE),
        }
    }

    fn close_figure(&mut self) {
        if let Some(mut figure) = self.figure.take() {
            figure.close();
            debug!(figure = figure.id().0, "Figure fermée");
        }
    }
}

/// Titre d'une figure avec sélection
pub fn selection_title(building: &Building, usage_field: &str) -> String {
    let usage = building
        .property_str(usage_field)
        .unwrap_or_else(|| UNKNOWN_USAGE.to_string());
    format!("Sélection : {} (ID: {})", usage, building.id)
}
