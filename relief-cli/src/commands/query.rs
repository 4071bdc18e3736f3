use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ElevationResponse {
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
}

pub fn run(
    data_dir: Option<PathBuf>,
    max_tiles: usize,
    format: String,
    lat: f64,
    lon: f64,
    json: bool,
) -> Result<()> {
    let stack = super::build_stack(data_dir, max_tiles, format)?;

    let elevation = stack
        .elevation(lat, lon)
        .context("failed to get elevation")?;

    if json {
        let response = ElevationResponse {
            lat,
            lon,
            elevation,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        match elevation {
            Some(elevation) => println!("{:.2}", elevation),
            None => println!("outside"),
        }
    }

    Ok(())
}
