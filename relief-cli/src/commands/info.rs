use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use relief::reader;

pub fn run(data_dir: Option<PathBuf>, tile: String) -> Result<()> {
    // A bare filename is resolved against the data directory.
    let mut path = PathBuf::from(&tile);
    if !path.exists() {
        if let Some(dir) = &data_dir {
            let resolved = dir.join(&tile);
            if resolved.exists() {
                path = resolved;
            }
        }
    }
    if !path.exists() {
        bail!("tile not found: {}", tile);
    }

    let meta = reader::read_meta(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    println!("file       {}", path.display());
    println!("grid       {} x {}", meta.nx, meta.ny);
    println!("origin     {:.6}, {:.6}", meta.x0, meta.y0);
    println!("step       {:.6} x {:.6} deg", meta.dx, meta.dy);
    println!(
        "coverage   lon [{:.3}, {:.3}]  lat [{:.3}, {:.3}]",
        meta.x0,
        meta.x0 + meta.dx * (meta.nx - 1) as f64,
        meta.y0,
        meta.y0 + meta.dy * (meta.ny - 1) as f64,
    );

    Ok(())
}
