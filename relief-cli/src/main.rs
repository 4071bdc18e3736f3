use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Tiled DEM elevation CLI tool
#[derive(Parser)]
#[command(name = "relief")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing the tile files
    #[arg(short, long, env = "RELIEF_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Maximum resident tiles in the pool
    #[arg(
        short,
        long,
        env = "RELIEF_MAX_TILES",
        default_value = "4",
        global = true
    )]
    max_tiles: usize,

    /// Tile format of the directory (gdem2 or srtm)
    #[arg(short, long, env = "RELIEF_FORMAT", default_value = "gdem2", global = true)]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query elevation for a single coordinate
    Query {
        /// Latitude in decimal degrees
        #[arg(long)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long)]
        lon: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Resolve an ECEF position through a layered stepper
    Step {
        /// ECEF X coordinate in meters
        x: f64,

        /// ECEF Y coordinate in meters
        y: f64,

        /// ECEF Z coordinate in meters
        z: f64,

        /// Add a flat bottom layer at this ground elevation
        #[arg(long)]
        flat: Option<f64>,

        /// Local-frame validity range in meters (0 disables it)
        #[arg(long, default_value = "0.0")]
        range: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Display the grid metadata of a tile file
    Info {
        /// Path to a tile file, or a tile filename resolved against the
        /// data directory
        tile: String,
    },

    /// List the tiles available in the data directory
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relief=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Query { lat, lon, json } => {
            commands::query::run(cli.data_dir, cli.max_tiles, cli.format, lat, lon, json)
        }
        Commands::Step {
            x,
            y,
            z,
            flat,
            range,
            json,
        } => commands::step::run(
            cli.data_dir,
            cli.max_tiles,
            cli.format,
            [x, y, z],
            flat,
            range,
            json,
        ),
        Commands::Info { tile } => commands::info::run(cli.data_dir, tile),
        Commands::List => commands::list::run(cli.data_dir),
    }
}
