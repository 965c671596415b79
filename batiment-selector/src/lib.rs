//! # batiment-selector
//!
//! Sélection interactive d'un bâtiment BD TOPO autour d'un point.
//!
//! ## Features
//!
//! - Récupération des bâtiments via le WFS de l'IGN (Géoplateforme)
//! - Figure SVG avec fond de carte OpenStreetMap (best-effort)
//! - Sélection du bâtiment le plus proche d'un clic (tolérance 15 m)
//! - Export GeoJSON de la sélection
//!
//! ## Usage
//!
//! ```no_run
//! use batiment_selector::{Selector, SelectorConfig};
//!
//! let mut selector = Selector::new(48.8566, 2.3522, SelectorConfig::default())?;
//! if selector.fetch() {
//!     let figure = selector.render().expect("données chargées");
//!     let click = figure.click_at_pixel(400.0, 420.0);
//!     selector.on_click(&click);
//! }
//! if let Some(building) = selector.get_selection() {
//!     println!("{}", building.id);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Usage CLI
//!
//! ```bash
//! batiment-selector select --lat 48.8566 --lon 2.3522 --click 400,420 --output map.svg
//! batiment-selector fetch --lat 48.8566 --lon 2.3522 --output batiments.geojson
//! ```

pub mod config;
pub mod envelope;
pub mod export;
pub mod figure;
pub mod report;
pub mod reproject_lite;
pub mod selector;

pub use config::SelectorConfig;
pub use figure::{ClickEvent, Figure, FigureId};
pub use report::{FetchReport, FetchStatus};
pub use selector::Selector;
