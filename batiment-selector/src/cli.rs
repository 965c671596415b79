//! Définition et implémentation des commandes CLI
//!
//! - `select` : récupération, rendu, clics rejoués, export de la sélection
//! - `fetch` : récupération seule, export GeoJSON de la collection

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::{info, warn};

use batiment_selector::export::export_to_geojson;
use batiment_selector::selector::selection_title;
use batiment_selector::{Selector, SelectorConfig};

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch buildings, render the map and replay clicks to select one
    Select {
        #[command(flatten)]
        area: AreaArgs,

        /// Click position "X,Y" (repeatable), in data coordinates unless --pixel
        #[arg(long, value_parser = parse_click, allow_hyphen_values = true)]
        click: Vec<(f64, f64)>,

        /// Interpret --click positions as figure pixels (origin top-left)
        #[arg(long)]
        pixel: bool,

        /// Output SVG map
        #[arg(short, long, default_value = "map.svg")]
        output: PathBuf,

        /// Export the selected building to GeoJSON
        #[arg(long)]
        export: Option<PathBuf>,

        /// Target SRID for the GeoJSON export (default: source SRID)
        #[arg(long)]
        srid: Option<u32>,
    },

    /// Fetch buildings around a point and export them to GeoJSON
    Fetch {
        #[command(flatten)]
        area: AreaArgs,

        /// Output GeoJSON file
        #[arg(short, long)]
        output: PathBuf,

        /// Target SRID for the GeoJSON export (default: source SRID)
        #[arg(long)]
        srid: Option<u32>,

        /// Save the fetch report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Point central et emprise de recherche
#[derive(Args, Debug)]
pub struct AreaArgs {
    /// Latitude (WGS84, degrees)
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude (WGS84, degrees)
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Side length of the square search area, in meters
    #[arg(long)]
    pub side: Option<f64>,

    /// Path to a JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable the basemap
    #[arg(long)]
    pub no_basemap: bool,
}

/// Parse "X,Y"
fn parse_click(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", s))?;
    let x = x
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid X '{}': {}", x, e))?;
    let y = y
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid Y '{}': {}", y, e))?;
    Ok((x, y))
}

/// Configuration : fichier (optionnel), puis environnement, puis arguments
fn load_config(area: &AreaArgs) -> Result<SelectorConfig> {
    let config = match &area.config {
        Some(path) => SelectorConfig::load(path)?,
        None => SelectorConfig::default(),
    };
    let mut config = config.with_env_overrides()?;

    if let Some(side) = area.side {
        config.side_length = side;
    }
    if area.no_basemap {
        config.basemap.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

fn fetch_or_fail(selector: &mut Selector) -> Result<()> {
    let ok = selector.fetch();
    if let Some(report) = selector.last_report() {
        info!("{}", report.summary());
        report.display();
    }
    if !ok {
        anyhow::bail!("Erreur lors de la récupération des bâtiments");
    }
    Ok(())
}

/// Commande `select`
pub fn cmd_select(
    area: &AreaArgs,
    clicks: &[(f64, f64)],
    pixel: bool,
    output: &Path,
    export: Option<&Path>,
    srid: Option<u32>,
) -> Result<()> {
    let config = load_config(area)?;
    let mut selector = Selector::new(area.lat, area.lon, config)?;

    fetch_or_fail(&mut selector)?;
    if selector.render().is_none() {
        anyhow::bail!("Aucune donnée à afficher");
    }

    for &(x, y) in clicks {
        let figure = selector.figure().context("No live figure")?;
        let event = if pixel {
            figure.click_at_pixel(x, y)
        } else {
            figure.click_at_data(x, y)
        };
        if !selector.on_click(&event) {
            info!(x, y, "Clic sans effet");
        }
    }

    let figure = selector.figure().context("No live figure")?;
    figure.save(output)?;
    info!(output = %output.display(), "Carte enregistrée");

    match selector.get_selection() {
        Some(building) => {
            println!(
                "{}",
                selection_title(building, &selector.config().usage_field)
            );
            if let Some(path) = export {
                let selection = selector
                    .selection_collection()
                    .context("Selection vanished")?;
                export_to_geojson(&selection, srid, path)?;
                info!(output = %path.display(), "Sélection exportée");
            }
        }
        None => {
            println!("Aucun bâtiment sélectionné");
            if export.is_some() {
                warn!("Rien à exporter : aucune sélection");
            }
        }
    }

    Ok(())
}

/// Commande `fetch`
pub fn cmd_fetch(
    area: &AreaArgs,
    output: &Path,
    srid: Option<u32>,
    report_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(area)?;
    let mut selector = Selector::new(area.lat, area.lon, config)?;

    let fetched = fetch_or_fail(&mut selector);
    if let (Some(path), Some(report)) = (report_path, selector.last_report()) {
        report.save_to_file(path)?;
        info!(report = %path.display(), "Rapport enregistré");
    }
    fetched?;

    let buildings = selector.buildings().context("No buildings fetched")?;
    export_to_geojson(buildings, srid, output)?;
    info!(
        output = %output.display(),
        count = buildings.len(),
        "Export GeoJSON terminé"
    );

    Ok(())
}
