//! Tests d'intégration du sélecteur, sans réseau
//!
//! Le service WFS et le serveur de tuiles sont remplacés par des sources
//! en mémoire.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Cursor;

use batiment_selector::figure::basemap::{BasemapError, TileId, TileSource};
use batiment_selector::figure::HIGHLIGHT_STYLE;
use batiment_selector::{ClickEvent, Selector, SelectorConfig};
use bdtopo::{BdtopoError, FeatureSource, WfsQuery};
use serde_json::{json, Value};

/// Centre de Paris (Hôtel de Ville)
const LAT: f64 = 48.8566;
const LON: f64 = 2.3522;

/// Source qui sert des réponses dans l'ordre, puis des erreurs 503
struct Scripted {
    responses: RefCell<VecDeque<Result<Vec<u8>, BdtopoError>>>,
}

impl Scripted {
    fn new(responses: Vec<Result<Value, u16>>) -> Self {
        let responses = responses
            .into_iter()
            .map(|r| match r {
                Ok(body) => Ok(body.to_string().into_bytes()),
                Err(status) => Err(unavailable(status)),
            })
            .collect();
        Self {
            responses: RefCell::new(responses),
        }
    }
}

fn unavailable(status: u16) -> BdtopoError {
    BdtopoError::Status {
        status,
        url: "https://data.geopf.fr/wfs/ows".to_string(),
    }
}

impl FeatureSource for Scripted {
    fn get_features(&self, _query: &WfsQuery) -> Result<Vec<u8>, BdtopoError> {
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(unavailable(503)))
    }
}

/// Serveur de tuiles qui renvoie une tuile PNG unie
struct PlainTiles;

impl TileSource for PlainTiles {
    fn fetch_tile(&self, _tile: TileId) -> Result<Vec<u8>, BasemapError> {
        let tile = image::RgbImage::from_pixel(256, 256, image::Rgb([230, 225, 210]));
        let mut buffer = Cursor::new(Vec::new());
        tile.write_to(&mut buffer, image::ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// Serveur de tuiles injoignable
struct OfflineTiles;

impl TileSource for OfflineTiles {
    fn fetch_tile(&self, _tile: TileId) -> Result<Vec<u8>, BasemapError> {
        Err(BasemapError::Status(503))
    }
}

/// Carré de `size` m dont le coin sud-ouest est (x, y), en Lambert-93
fn square(cleabs: &str, usage: Option<&str>, x: f64, y: f64, size: f64) -> Value {
    json!({
        "type": "Feature",
        "id": format!("batiment.{}", cleabs),
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]
            ]]
        },
        "properties": {
            "cleabs": cleabs,
            "usage_1": usage,
            "hauteur": 12.5
        }
    })
}

fn collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::2154" } },
        "features": features
    })
}

/// A et B au sud, à 10 et 20 m de (652420, 6862005) ; C au nord, isolé
fn neighbourhood() -> Value {
    collection(vec![
        square("BATIMENT0000000000000A", Some("Résidentiel"), 652400.0, 6862000.0, 10.0),
        square("BATIMENT0000000000000B", Some("Commercial et services"), 652440.0, 6862000.0, 10.0),
        square("BATIMENT0000000000000C", None, 652400.0, 6862080.0, 10.0),
    ])
}

fn offline_config() -> SelectorConfig {
    let mut config = SelectorConfig::default();
    config.basemap.enabled = false;
    config
}

fn selector(responses: Vec<Result<Value, u16>>) -> Selector {
    Selector::with_sources(
        LAT,
        LON,
        offline_config(),
        Box::new(Scripted::new(responses)),
        None,
    )
    .expect("valid selector")
}

/// Clic à une position en Lambert-93 sur la figure courante
fn click(selector: &Selector, x: f64, y: f64) -> ClickEvent {
    selector
        .figure()
        .expect("live figure")
        .click_at_data(x, y)
}

fn selected_id(selector: &Selector) -> Option<String> {
    selector.get_selection().map(|b| b.id.clone())
}

#[test]
fn test_fetch_yields_buildings() {
    let mut s = selector(vec![Ok(neighbourhood())]);

    assert!(s.fetch());
    let buildings = s.buildings().unwrap();
    assert_eq!(buildings.len(), 3);
    assert_eq!(buildings.projection().epsg, 2154);
    assert!(s.get_selection().is_none());
    assert!(s.figure().is_none(), "fetch does not render");
}

#[test]
fn test_nearest_building_within_tolerance_is_selected() {
    let mut s = selector(vec![Ok(neighbourhood())]);
    assert!(s.fetch());
    assert_eq!(s.render().unwrap().title(), "Cliquez sur un bâtiment");

    // 10 m de A, 20 m de B
    let event = click(&s, 652420.0, 6862005.0);
    assert!(s.on_click(&event));
    assert_eq!(selected_id(&s).as_deref(), Some("BATIMENT0000000000000A"));

    let figure = s.figure().unwrap();
    assert_eq!(
        figure.title(),
        "Sélection : Résidentiel (ID: BATIMENT0000000000000A)"
    );
    let highlight = figure.layers().last().unwrap();
    assert_eq!(highlight.style, HIGHLIGHT_STYLE);
    assert_eq!(highlight.geometries.len(), 1);
    assert!(figure.to_svg().unwrap().contains(r#"fill="red""#));
}

#[test]
fn test_missing_usage_is_unknown() {
    let mut s = selector(vec![Ok(neighbourhood())]);
    assert!(s.fetch());
    s.render();

    let event = click(&s, 652405.0, 6862093.0);
    assert!(s.on_click(&event));
    assert_eq!(
        s.figure().unwrap().title(),
        "Sélection : Inconnu (ID: BATIMENT0000000000000C)"
    );
}

#[test]
fn test_far_click_leaves_selection_unchanged() {
    let mut s = selector(vec![Ok(neighbourhood())]);
    assert!(s.fetch());
    s.render();

    // Au milieu du vide : > 30 m de tout bâtiment
    let event = click(&s, 652425.0, 6862045.0);
    assert!(!s.on_click(&event));
    assert!(s.get_selection().is_none());

    let event = click(&s, 652446.0, 6862004.0);
    assert!(s.on_click(&event));
    let event = click(&s, 652425.0, 6862045.0);
    assert!(!s.on_click(&event));
    assert_eq!(selected_id(&s).as_deref(), Some("BATIMENT0000000000000B"));
}

#[test]
fn test_tolerance_is_configurable() {
    let mut config = offline_config();
    config.selection_tolerance = 5.0;
    let mut s = Selector::with_sources(
        LAT,
        LON,
        config,
        Box::new(Scripted::new(vec![Ok(neighbourhood())])),
        None,
    )
    .unwrap();
    assert!(s.fetch());
    s.render();

    let event = click(&s, 652420.0, 6862005.0);
    assert!(!s.on_click(&event));
    assert!(s.get_selection().is_none());
}

#[test]
fn test_selection_survives_rerender() {
    let mut s = selector(vec![Ok(neighbourhood())]);
    assert!(s.fetch());
    let first = s.render().unwrap().id();

    let event = click(&s, 652420.0, 6862005.0);
    assert!(s.on_click(&event));

    let second = s.render().unwrap();
    assert_ne!(second.id(), first);
    assert!(second.title().starts_with("Sélection : "));
    assert_eq!(second.layers().len(), 2);
    assert_eq!(selected_id(&s).as_deref(), Some("BATIMENT0000000000000A"));

    // Les clics vers l'ancienne figure sont ignorés
    assert!(!s.on_click(&event));
}

#[test]
fn test_clicks_outside_axes_are_ignored() {
    let mut s = selector(vec![Ok(neighbourhood())]);
    assert!(s.fetch());
    let figure = s.render().unwrap();

    // Bande de titre, puis hors du canevas
    let title_band = figure.click_at_pixel(400.0, 5.0);
    let outside = figure.click_at_pixel(-20.0, 400.0);
    assert!(!s.on_click(&title_band));
    assert!(!s.on_click(&outside));
    assert!(s.get_selection().is_none());
}

#[test]
fn test_empty_collection() {
    let mut s = selector(vec![Ok(collection(Vec::new()))]);

    assert!(s.fetch());
    assert!(s.buildings().unwrap().is_empty());

    // Figure cadrée sur l'emprise de recherche
    let figure = s.render().unwrap();
    let extent = figure.viewport().extent();
    assert!(extent.width() >= 100.0);

    let center = extent.center();
    let event = click(&s, center.x, center.y);
    assert!(!s.on_click(&event));
    assert!(s.get_selection().is_none());
}

#[test]
fn test_render_before_fetch() {
    let mut s = selector(vec![Ok(neighbourhood())]);
    assert!(s.render().is_none());
    assert!(s.figure().is_none());
}

#[test]
fn test_failed_refetch_keeps_state() {
    let mut s = selector(vec![Ok(neighbourhood()), Err(503)]);
    assert!(s.fetch());
    s.render();
    let event = click(&s, 652420.0, 6862005.0);
    assert!(s.on_click(&event));

    assert!(!s.fetch());
    assert_eq!(s.buildings().unwrap().len(), 3);
    assert_eq!(selected_id(&s).as_deref(), Some("BATIMENT0000000000000A"));
    assert!(s.figure().unwrap().is_open());

    let report = s.last_report().unwrap();
    assert_eq!(report.status, batiment_selector::FetchStatus::Failed);
    assert!(report.error.as_deref().unwrap().contains("503"));
}

#[test]
fn test_invalid_response_keeps_state() {
    let mut s = selector(vec![Ok(neighbourhood()), Ok(json!({"type": "Feature"}))]);
    assert!(s.fetch());

    assert!(!s.fetch());
    assert_eq!(s.buildings().unwrap().len(), 3);
}

#[test]
fn test_successful_refetch_clears_selection() {
    let moved = collection(vec![square(
        "BATIMENT0000000000000D",
        Some("Industriel"),
        652500.0,
        6862050.0,
        8.0,
    )]);
    let mut s = selector(vec![Ok(neighbourhood()), Ok(moved)]);
    assert!(s.fetch());
    s.render();
    let stale = click(&s, 652420.0, 6862005.0);
    assert!(s.on_click(&stale));

    assert!(s.fetch());
    assert!(s.get_selection().is_none());
    assert_eq!(s.buildings().unwrap().len(), 1);
    assert!(s.figure().is_none(), "previous figure is closed");

    // Un clic vers la figure fermée ne sélectionne rien
    assert!(!s.on_click(&stale));
    assert!(s.get_selection().is_none());
}

#[test]
fn test_corrupted_features_are_reported() {
    let mut features = match neighbourhood() {
        Value::Object(mut fc) => match fc.remove("features") {
            Some(Value::Array(features)) => features,
            _ => unreachable!(),
        },
        _ => unreachable!(),
    };
    features.push(json!({
        "type": "Feature",
        "id": "batiment.broken",
        "geometry": null,
        "properties": { "cleabs": "BATIMENT000000000BROKEN" }
    }));

    let mut s = selector(vec![Ok(collection(features))]);
    assert!(s.fetch());
    assert_eq!(s.buildings().unwrap().len(), 3);

    let report = s.last_report().unwrap();
    assert_eq!(report.status, batiment_selector::FetchStatus::PartialSuccess);
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn test_basemap_tiles_are_embedded() {
    let mut config = SelectorConfig::default();
    config.basemap.max_tiles = 4;
    let mut s = Selector::with_sources(
        LAT,
        LON,
        config,
        Box::new(Scripted::new(vec![Ok(neighbourhood())])),
        Some(Box::new(PlainTiles)),
    )
    .unwrap();
    assert!(s.fetch());

    let figure = s.render().unwrap();
    assert!(!figure.tiles().is_empty());
    assert!(figure.tiles().len() <= 4);
    assert!(figure.to_svg().unwrap().contains("data:image/png;base64,"));

    // Le fond de carte reste après une sélection
    let event = click(&s, 652420.0, 6862005.0);
    assert!(s.on_click(&event));
    assert!(!s.figure().unwrap().tiles().is_empty());
}

#[test]
fn test_basemap_failure_does_not_block_rendering() {
    let mut s = Selector::with_sources(
        LAT,
        LON,
        SelectorConfig::default(),
        Box::new(Scripted::new(vec![Ok(neighbourhood())])),
        Some(Box::new(OfflineTiles)),
    )
    .unwrap();
    assert!(s.fetch());

    let figure = s.render().unwrap();
    assert!(figure.tiles().is_empty());
    assert!(!figure.to_svg().unwrap().contains("<image"));

    let event = click(&s, 652420.0, 6862005.0);
    assert!(s.on_click(&event));
}

#[test]
fn test_selection_export() {
    let mut s = selector(vec![Ok(neighbourhood())]);
    assert!(s.fetch());
    s.render();
    let event = click(&s, 652420.0, 6862005.0);
    assert!(s.on_click(&event));

    let selection = s.selection_collection().unwrap();
    assert_eq!(selection.len(), 1);

    let path = std::env::temp_dir().join("batiment_selector_selection_test.geojson");
    batiment_selector::export::export_to_geojson(&selection, Some(4326), &path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed["features"][0]["id"], "BATIMENT0000000000000A");
    assert_eq!(parsed["features"][0]["properties"]["usage_1"], "Résidentiel");

    std::fs::remove_file(path).ok();
}

/// Distance réelle du clic (652425, 6862085) à C, après passage par les pixels
fn located_distance_to_c(tolerance: f64) -> (Selector, f64) {
    let mut config = offline_config();
    config.selection_tolerance = tolerance;
    let mut s = Selector::with_sources(
        LAT,
        LON,
        config,
        Box::new(Scripted::new(vec![Ok(neighbourhood())])),
        None,
    )
    .unwrap();
    assert!(s.fetch());
    s.render();

    let event = click(&s, 652425.0, 6862085.0);
    let point = s.figure().unwrap().locate(&event).unwrap();
    let distance = s.buildings().unwrap().get(2).unwrap().distance_to(&point);
    (s, distance)
}

#[test]
fn test_click_at_exact_tolerance_is_ignored() {
    // 15 m à droite de C, 75 m de A et B
    let (_, distance) = located_distance_to_c(15.0);
    assert!((distance - 15.0).abs() < 1e-6, "distance={}", distance);

    // Même figure, tolérance égale à la distance effective
    let (mut s, same) = located_distance_to_c(distance);
    assert_eq!(same, distance);

    let event = click(&s, 652425.0, 6862085.0);
    assert!(!s.on_click(&event));
    assert!(s.get_selection().is_none());
}

#[test]
fn test_click_just_inside_tolerance_is_selected() {
    let mut s = selector(vec![Ok(neighbourhood())]);
    assert!(s.fetch());
    s.render();

    // 14.9 m de C
    let event = click(&s, 652424.9, 6862085.0);
    assert!(s.on_click(&event));
    assert_eq!(selected_id(&s).as_deref(), Some("BATIMENT0000000000000C"));
}
