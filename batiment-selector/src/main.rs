//! Point d'entrée CLI pour batiment-selector

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Sélectionner un bâtiment BD TOPO autour d'un point
#[derive(Parser)]
#[command(name = "batiment-selector")]
#[command(author, version)]
#[command(about = "Sélectionner un bâtiment BD TOPO (IGN) autour d'un point")]
#[command(long_about = "Récupère les bâtiments BD TOPO via le WFS de l'IGN dans un carré autour d'un point, \
les dessine sur un fond de carte et sélectionne le bâtiment le plus proche d'un clic.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Select {
            area,
            click,
            pixel,
            output,
            export,
            srid,
        } => {
            info!(lat = area.lat, lon = area.lon, clicks = click.len(), "Sélection de bâtiment");
            cli::cmd_select(&area, &click, pixel, &output, export.as_deref(), srid)?;
        }
        Commands::Fetch {
            area,
            output,
            srid,
            report,
        } => {
            info!(lat = area.lat, lon = area.lon, output = %output.display(), "Export vers GeoJSON");
            cli::cmd_fetch(&area, &output, srid, report.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
