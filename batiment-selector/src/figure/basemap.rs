//! Fond de carte en tuiles XYZ, en best-effort
//!
//! Un échec (réseau, décodage, reprojection) ne fait jamais échouer le rendu :
//! il est rapporté comme [`BasemapOutcome::Skipped`].

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use geo::Rect;
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::BasemapConfig;
use crate::reproject_lite::mercator::{geographic_to_tile, ground_resolution, tile_to_geographic};
use crate::reproject_lite::{Geographic, SmartReprojector};

/// Zoom maximal servi par les fournisseurs OSM
const MAX_ZOOM: u8 = 19;

/// Erreurs de récupération d'une tuile
#[derive(Debug, Error)]
pub enum BasemapError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tile server responded with {0}")]
    Status(u16),

    #[error("failed to decode tile: {0}")]
    Decode(#[from] image::ImageError),

    #[error("reprojection failed: {0}")]
    Reproject(String),

    #[error("no zoom level fits within {0} tiles")]
    TileBudget(usize),
}

/// Identifiant d'une tuile XYZ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// Source de tuiles : renvoie les octets bruts (PNG/JPEG)
pub trait TileSource {
    fn fetch_tile(&self, tile: TileId) -> Result<Vec<u8>, BasemapError>;
}

/// Tuile décodée et placée dans le repère des données
#[derive(Debug, Clone)]
pub struct PlacedTile {
    pub tile: TileId,
    /// Emprise de la tuile dans le CRS projeté
    pub extent: Rect,
    /// URI `data:` embarquée dans le SVG
    pub data_uri: String,
}

/// Résultat de l'enrichissement par le fond de carte
#[derive(Debug, Clone)]
pub enum BasemapOutcome {
    /// Tuiles posées (et nombre d'échecs individuels)
    Drawn {
        tiles: Vec<PlacedTile>,
        failed: usize,
    },
    /// Fond de carte ignoré
    Skipped(String),
}

/// Client HTTP bloquant vers un serveur de tuiles XYZ
pub struct HttpTileSource {
    client: Client,
    url_template: String,
}

impl HttpTileSource {
    pub fn new(config: &BasemapConfig) -> Result<Self, BasemapError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            url_template: config.url_template.clone(),
        })
    }

    /// Interpole le modèle d'URL
    pub fn tile_url(&self, tile: TileId) -> String {
        build_url_from_template(&self.url_template, tile)
    }
}

impl TileSource for HttpTileSource {
    fn fetch_tile(&self, tile: TileId) -> Result<Vec<u8>, BasemapError> {
        let response = self.client.get(self.tile_url(tile)).send()?;
        if !response.status().is_success() {
            return Err(BasemapError::Status(response.status().as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

fn build_url_from_template(template: &str, tile: TileId) -> String {
    // Sous-domaine stable par tuile
    let subdomain = ["a", "b", "c"][((tile.x + tile.y) % 3) as usize];
    template
        .replace("{s}", subdomain)
        .replace("{z}", &tile.z.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
        .replace("{r}", "")
}

/// Plan de tuiles couvrant une emprise
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlan {
    pub zoom: u8,
    pub tiles: Vec<TileId>,
}

/// Calcule les tuiles couvrant `extent` (CRS `srid`) pour une résolution
/// d'affichage `meters_per_pixel`, sans dépasser `max_tiles`
pub fn plan_tiles(
    extent: Rect,
    srid: u32,
    meters_per_pixel: f64,
    max_tiles: usize,
) -> Result<TilePlan, BasemapError> {
    let to_wgs84 =
        SmartReprojector::new(srid, 4326).map_err(|e| BasemapError::Reproject(e.to_string()))?;

    let corner = |x: f64, y: f64| -> Result<Geographic, BasemapError> {
        let (lon, lat) = to_wgs84
            .transform_point(x, y)
            .map_err(|e| BasemapError::Reproject(e.to_string()))?;
        Ok(Geographic::from_degrees(lon, lat))
    };
    let north_west = corner(extent.min().x, extent.max().y)?;
    let south_east = corner(extent.max().x, extent.min().y)?;
    let center_lat = (north_west.lat + south_east.lat).to_degrees() / 2.0;

    // Zoom le plus faible dont la résolution est au moins aussi fine que l'affichage
    let mut zoom = (0..=MAX_ZOOM)
        .find(|&z| ground_resolution(center_lat, z) <= meters_per_pixel)
        .unwrap_or(MAX_ZOOM);

    loop {
        let tiles = tiles_between(north_west, south_east, zoom);
        if tiles.len() <= max_tiles {
            return Ok(TilePlan { zoom, tiles });
        }
        if zoom == 0 {
            return Err(BasemapError::TileBudget(max_tiles));
        }
        zoom -= 1;
    }
}

fn tiles_between(north_west: Geographic, south_east: Geographic, zoom: u8) -> Vec<TileId> {
    let last = (1u32 << zoom) - 1;
    let clamp = |v: f64| (v.floor().max(0.0) as u32).min(last);

    let (x0, y0) = geographic_to_tile(north_west, zoom);
    let (x1, y1) = geographic_to_tile(south_east, zoom);

    let mut tiles = Vec::new();
    for y in clamp(y0)..=clamp(y1) {
        for x in clamp(x0)..=clamp(x1) {
            tiles.push(TileId { z: zoom, x, y });
        }
    }
    tiles
}

/// Emprise d'une tuile dans le CRS projeté
///
/// Approximation rectangulaire (coins NO/SE) : suffisante à l'échelle d'un quartier.
fn tile_extent(tile: TileId, to_projected: &SmartReprojector) -> Result<Rect, BasemapError> {
    let project = |g: Geographic| -> Result<(f64, f64), BasemapError> {
        let (lon, lat) = g.to_degrees();
        to_projected
            .transform_point(lon, lat)
            .map_err(|e| BasemapError::Reproject(e.to_string()))
    };
    let nw = project(tile_to_geographic(f64::from(tile.x), f64::from(tile.y), tile.z))?;
    let se = project(tile_to_geographic(
        f64::from(tile.x + 1),
        f64::from(tile.y + 1),
        tile.z,
    ))?;
    Ok(Rect::new(nw, se))
}

/// Décode une tuile et l'encode en URI `data:`
fn to_data_uri(bytes: &[u8]) -> Result<String, BasemapError> {
    let format = image::guess_format(bytes)?;
    // Valide le contenu, pas seulement l'en-tête
    image::load_from_memory_with_format(bytes, format)?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    ))
}

/// Ajoute un fond de carte sous les bâtiments, en best-effort
pub fn enrich(
    source: &dyn TileSource,
    extent: Rect,
    srid: u32,
    meters_per_pixel: f64,
    max_tiles: usize,
) -> BasemapOutcome {
    let plan = match plan_tiles(extent, srid, meters_per_pixel, max_tiles) {
        Ok(plan) => plan,
        Err(e) => return BasemapOutcome::Skipped(e.to_string()),
    };
    let to_projected = match SmartReprojector::new(4326, srid) {
        Ok(r) => r,
        Err(e) => return BasemapOutcome::Skipped(e.to_string()),
    };

    let mut tiles = Vec::with_capacity(plan.tiles.len());
    let mut failed = 0;
    let mut last_error = None;

    for tile in plan.tiles {
        let placed = source.fetch_tile(tile).and_then(|bytes| {
            Ok(PlacedTile {
                tile,
                extent: tile_extent(tile, &to_projected)?,
                data_uri: to_data_uri(&bytes)?,
            })
        });
        match placed {
            Ok(placed) => tiles.push(placed),
            Err(e) => {
                debug!(z = tile.z, x = tile.x, y = tile.y, error = %e, "Tuile ignorée");
                failed += 1;
                last_error = Some(e.to_string());
            }
        }
    }

    if tiles.is_empty() {
        let reason = last_error.unwrap_or_else(|| "no tile covers the extent".to_string());
        return BasemapOutcome::Skipped(reason);
    }

    debug!(zoom = plan.zoom, tiles = tiles.len(), failed, "Fond de carte posé");
    BasemapOutcome::Drawn { tiles, failed }
}
