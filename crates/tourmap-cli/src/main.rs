mod plan;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tourmap")]
#[command(about = "Plan, map and share a single delivery tour")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Geocode a stop list, draw the tour and print navigation links
    Plan {
        /// JSON or YAML file with the stop list
        #[arg(long)]
        stops: PathBuf,

        /// Write the drawn map as GeoJSON to this file
        #[arg(long)]
        geojson: Option<PathBuf>,

        /// Connect waypoints with straight lines instead of calling the router
        #[arg(long)]
        straight_lines: bool,
    },
    /// Print navigation links for a stop list without geocoding
    Links {
        /// JSON or YAML file with the stop list
        #[arg(long)]
        stops: PathBuf,
    },
    /// Resolve free-text addresses to coordinates
    Geocode {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("tourmap: run `tourmap --help` for available commands");
        return Ok(());
    };

    let config = tourmap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Plan {
            stops,
            geojson,
            straight_lines,
        } => plan::run_plan(&config, &stops, geojson.as_deref(), straight_lines).await?,
        Commands::Links { stops } => plan::run_links(&config, &stops)?,
        Commands::Geocode { addresses } => plan::run_geocode(&config, &addresses).await?,
    }

    Ok(())
}
