//! Figure de sélection : session de rendu possédée par un sélecteur
//!
//! Une figure regroupe ce qu'un toolkit graphique garderait séparément
//! (canevas, axes, identifiant de callback). Elle est remplacée à chaque
//! rendu ; les clics adressés à une figure fermée sont ignorés.

pub mod basemap;
pub mod svg;

use std::path::Path;

use anyhow::{Context, Result};
use geo::{MultiPolygon, Point, Rect};

use basemap::{BasemapOutcome, PlacedTile};

/// Hauteur de la bande de titre (px)
const TITLE_HEIGHT: f64 = 40.0;

/// Marge autour des axes (px)
const PADDING: f64 = 10.0;

/// Marge relative autour des données
const DATA_MARGIN: f64 = 0.05;

/// Identifiant de session de rendu (équivalent d'un id de connexion de callback)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FigureId(pub u64);

/// Clic souris délivré par l'hôte, en pixels (origine en haut à gauche)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    pub figure: FigureId,
    pub x: f64,
    pub y: f64,
}

/// Style de remplissage d'une couche
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub fill: &'static str,
    pub edge: &'static str,
    pub alpha: f64,
    pub line_width: f64,
}

/// Bâtiments de la collection
pub const BASE_STYLE: Style = Style {
    fill: "lightgray",
    edge: "#444",
    alpha: 0.8,
    line_width: 1.0,
};

/// Bâtiment sélectionné
pub const HIGHLIGHT_STYLE: Style = Style {
    fill: "red",
    edge: "yellow",
    alpha: 1.0,
    line_width: 2.0,
};

/// Couche d'emprises dessinée avec un style
#[derive(Debug, Clone)]
pub struct Layer {
    pub geometries: Vec<MultiPolygon>,
    pub style: Style,
}

/// Transformation données ↔ pixels, à échelle égale en x et y
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    extent: Rect,
    size: u32,
    scale: f64,
    origin: (f64, f64),
}

impl Viewport {
    /// Ajuste `bounds` (plus une marge de 5 %) dans une figure carrée de `size` px
    pub fn new(bounds: Rect, size: u32) -> Self {
        let center = bounds.center();
        let width = bounds.width().max(1.0) * (1.0 + 2.0 * DATA_MARGIN);
        let height = bounds.height().max(1.0) * (1.0 + 2.0 * DATA_MARGIN);

        let available_w = f64::from(size) - 2.0 * PADDING;
        let available_h = f64::from(size) - TITLE_HEIGHT - PADDING;
        let scale = (available_w / width).min(available_h / height);

        let origin = (
            PADDING + (available_w - width * scale) / 2.0,
            TITLE_HEIGHT + (available_h - height * scale) / 2.0,
        );
        let extent = Rect::new(
            (center.x - width / 2.0, center.y - height / 2.0),
            (center.x + width / 2.0, center.y + height / 2.0),
        );

        Self {
            extent,
            size,
            scale,
            origin,
        }
    }

    /// Emprise visible, dans le CRS des données
    pub fn extent(&self) -> Rect {
        self.extent
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn title_height(&self) -> f64 {
        TITLE_HEIGHT
    }

    /// Unités de données par pixel
    pub fn meters_per_pixel(&self) -> f64 {
        1.0 / self.scale
    }

    /// Zone des axes, en pixels
    pub fn axes_box(&self) -> Rect {
        Rect::new(
            self.origin,
            (
                self.origin.0 + self.extent.width() * self.scale,
                self.origin.1 + self.extent.height() * self.scale,
            ),
        )
    }

    pub fn data_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.origin.0 + (x - self.extent.min().x) * self.scale,
            self.origin.1 + (self.extent.max().y - y) * self.scale,
        )
    }

    pub fn pixel_to_data(&self, px: f64, py: f64) -> (f64, f64) {
        (
            self.extent.min().x + (px - self.origin.0) / self.scale,
            self.extent.max().y - (py - self.origin.1) / self.scale,
        )
    }

    /// Le pixel tombe-t-il dans les axes ?
    pub fn contains_pixel(&self, px: f64, py: f64) -> bool {
        let axes = self.axes_box();
        px >= axes.min().x && px <= axes.max().x && py >= axes.min().y && py <= axes.max().y
    }
}

/// Figure de sélection (une par sélecteur)
#[derive(Debug, Clone)]
pub struct Figure {
    id: FigureId,
    viewport: Viewport,
    title: String,
    tiles: Vec<PlacedTile>,
    layers: Vec<Layer>,
    open: bool,
}

impl Figure {
    pub(crate) fn new(id: FigureId, bounds: Rect, size: u32) -> Self {
        Self {
            id,
            viewport: Viewport::new(bounds, size),
            title: String::new(),
            tiles: Vec::new(),
            layers: Vec::new(),
            open: true,
        }
    }

    pub fn id(&self) -> FigureId {
        self.id
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tiles(&self) -> &[PlacedTile] {
        &self.tiles
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Pose les tuiles du fond de carte (conservées jusqu'à la fermeture)
    pub(crate) fn set_basemap(&mut self, outcome: BasemapOutcome) {
        self.tiles = match outcome {
            BasemapOutcome::Drawn { tiles, .. } => tiles,
            BasemapOutcome::Skipped(_) => Vec::new(),
        };
    }

    /// Efface les couches et le titre ; le fond de carte reste
    pub(crate) fn clear(&mut self) {
        self.layers.clear();
        self.title.clear();
    }

    pub(crate) fn plot(&mut self, geometries: Vec<MultiPolygon>, style: Style) {
        self.layers.push(Layer { geometries, style });
    }

    pub(crate) fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub(crate) fn close(&mut self) {
        self.open = false;
        self.tiles.clear();
        self.layers.clear();
    }

    /// Position du clic en coordonnées de données, si le clic vise les axes
    /// de cette figure ouverte
    pub fn locate(&self, event: &ClickEvent) -> Option<Point> {
        if !self.open || event.figure != self.id {
            return None;
        }
        if !self.viewport.contains_pixel(event.x, event.y) {
            return None;
        }
        let (x, y) = self.viewport.pixel_to_data(event.x, event.y);
        Some(Point::new(x, y))
    }

    /// Clic en pixels sur cette figure
    pub fn click_at_pixel(&self, x: f64, y: f64) -> ClickEvent {
        ClickEvent {
            figure: self.id,
            x,
            y,
        }
    }

    /// Clic à une position exprimée dans le CRS des données
    pub fn click_at_data(&self, x: f64, y: f64) -> ClickEvent {
        let (px, py) = self.viewport.data_to_pixel(x, y);
        self.click_at_pixel(px, py)
    }

    /// Document SVG autonome
    pub fn to_svg(&self) -> Result<String> {
        svg::render(self).context("Failed to serialize figure")
    }

    /// Enregistre la figure en SVG
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_svg()?)
            .context(format!("Failed to write figure: {}", path.display()))
    }

    /// Bloc de contenu evcxr (type MIME SVG)
    pub fn evcxr_content(&self) -> Result<String> {
        Ok(format!(
            "EVCXR_BEGIN_CONTENT image/svg+xml\n{}\nEVCXR_END_CONTENT",
            self.to_svg()?
        ))
    }

    /// Affichage dans un notebook evcxr
    pub fn evcxr_display(&self) {
        match self.evcxr_content() {
            Ok(content) => println!("{}", content),
            Err(e) => tracing::warn!(error = %e, "Affichage de la figure impossible"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn figure() -> Figure {
        Figure::new(
            FigureId(1),
            Rect::new((652000.0, 6862000.0), (652100.0, 6862050.0)),
            800,
        )
    }

    #[test]
    fn test_viewport_roundtrip() {
        let viewport = figure().viewport().clone();
        let (px, py) = viewport.data_to_pixel(652042.0, 6862017.0);
        let (x, y) = viewport.pixel_to_data(px, py);
        assert!((x - 652042.0).abs() < 1e-6);
        assert!((y - 6862017.0).abs() < 1e-6);
    }

    #[test]
    fn test_viewport_keeps_aspect_and_margin() {
        let viewport = figure().viewport().clone();
        let extent = viewport.extent();
        assert!((extent.width() - 110.0).abs() < 1e-6);
        assert!((extent.height() - 55.0).abs() < 1e-6);

        let axes = viewport.axes_box();
        assert!((axes.width() / axes.height() - 2.0).abs() < 1e-9);
        assert!(axes.min().y >= viewport.title_height());
    }

    #[test]
    fn test_y_axis_points_up() {
        let viewport = figure().viewport().clone();
        let (_, top) = viewport.data_to_pixel(652050.0, 6862050.0);
        let (_, bottom) = viewport.data_to_pixel(652050.0, 6862000.0);
        assert!(top < bottom);
    }

    #[test]
    fn test_locate_inside_axes() {
        let fig = figure();
        let event = fig.click_at_data(652050.0, 6862025.0);
        let point = fig.locate(&event).unwrap();
        assert!((point.x() - 652050.0).abs() < 1e-6);
        assert!((point.y() - 6862025.0).abs() < 1e-6);
    }

    #[test]
    fn test_locate_outside_axes() {
        let fig = figure();
        // Bande de titre
        assert!(fig.locate(&fig.click_at_pixel(400.0, 5.0)).is_none());
        // Hors de la figure
        assert!(fig.locate(&fig.click_at_pixel(-3.0, 400.0)).is_none());
    }

    #[test]
    fn test_locate_ignores_other_or_closed_figure() {
        let mut fig = figure();
        let mut event = fig.click_at_data(652050.0, 6862025.0);
        event.figure = FigureId(2);
        assert!(fig.locate(&event).is_none());

        let event = fig.click_at_data(652050.0, 6862025.0);
        fig.close();
        assert!(fig.locate(&event).is_none());
        assert!(!fig.is_open());
    }

    #[test]
    fn test_degenerate_bounds() {
        // Une seule coordonnée : étendue minimale de 1 unité
        let fig = Figure::new(
            FigureId(1),
            Rect::new((652000.0, 6862000.0), (652000.0, 6862000.0)),
            800,
        );
        assert!(fig.viewport().meters_per_pixel().is_finite());
    }

    #[test]
    fn test_svg_contains_layers_and_title() {
        let mut fig = figure();
        fig.set_title("Sélection : Résidentiel (ID: B<1>)");
        fig.plot(
            vec![MultiPolygon::new(vec![polygon![
                (x: 652010.0, y: 6862010.0),
                (x: 652030.0, y: 6862010.0),
                (x: 652030.0, y: 6862030.0),
            ]])],
            BASE_STYLE,
        );
        fig.plot(Vec::new(), HIGHLIGHT_STYLE);

        let svg = fig.to_svg().unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("B&lt;1&gt;"));
        assert!(svg.contains(r##"fill="lightgray""##));
        assert!(svg.contains(r##"stroke="#444""##));
        assert_eq!(svg.matches("<path").count(), 1);
    }

    #[test]
    fn test_evcxr_content_wraps_svg() {
        let mut fig = figure();
        fig.set_title("Cliquez sur un bâtiment");

        let content = fig.evcxr_content().unwrap();
        assert!(content.starts_with("EVCXR_BEGIN_CONTENT image/svg+xml\n<svg"));
        assert!(content.ends_with("</svg>\nEVCXR_END_CONTENT"));
        assert!(content.contains("Cliquez sur un bâtiment"));
    }

    #[test]
    fn test_clear_keeps_basemap() {
        let mut fig = figure();
        fig.set_basemap(BasemapOutcome::Drawn {
            tiles: vec![PlacedTile {
                tile: basemap::TileId { z: 18, x: 1, y: 1 },
                extent: Rect::new((652000.0, 6862000.0), (652100.0, 6862100.0)),
                data_uri: "data:image/png;base64,AAAA".to_string(),
            }],
            failed: 0,
        });
        fig.plot(Vec::new(), BASE_STYLE);
        fig.set_title("x");
        fig.clear();

        assert!(fig.layers().is_empty());
        assert!(fig.title().is_empty());
        assert_eq!(fig.tiles().len(), 1);
        assert!(fig.to_svg().unwrap().contains("<image"));
    }
}
