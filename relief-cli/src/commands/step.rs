use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use relief::Stepper;

#[derive(Serialize)]
struct StepResponse {
    latitude: f64,
    longitude: f64,
    altitude: f64,
    ground: Option<f64>,
    layer: Option<usize>,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    data_dir: Option<PathBuf>,
    max_tiles: usize,
    format: String,
    position: [f64; 3],
    flat: Option<f64>,
    range: f64,
    json: bool,
) -> Result<()> {
    let stack = super::build_stack(data_dir, max_tiles, format)?;

    let mut stepper = Stepper::new();
    if let Some(ground) = flat {
        stepper.add_flat(ground);
    }
    stepper.add_stack(Arc::new(stack))?;
    stepper.set_range(range);

    let step = stepper
        .step(position)
        .context("failed to resolve the position")?;

    if json {
        let response = StepResponse {
            latitude: step.latitude,
            longitude: step.longitude,
            altitude: step.altitude,
            ground: step.ground.map(|(z, _)| z),
            layer: step.ground.map(|(_, index)| index),
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("latitude   {:.8}", step.latitude);
        println!("longitude  {:.8}", step.longitude);
        println!("altitude   {:.3}", step.altitude);
        match step.ground {
            Some((ground, layer)) => {
                println!("ground     {:.3}", ground);
                println!("layer      {}", layer);
            }
            None => println!("ground     outside"),
        }
    }

    Ok(())
}
