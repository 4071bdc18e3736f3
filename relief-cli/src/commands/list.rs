use anyhow::{Context, Result};
use std::path::PathBuf;

use relief::filename::parse_tile_filename;

pub fn run(data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir =
        data_dir.context("no data directory; use --data-dir or set RELIEF_DATA_DIR")?;

    let mut tiles = Vec::new();
    let entries = std::fs::read_dir(&data_dir)
        .with_context(|| format!("cannot read {}", data_dir.display()))?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some((lat, lon)) = parse_tile_filename(&name) {
            tiles.push((name.into_owned(), lat, lon));
        }
    }
    tiles.sort();

    if tiles.is_empty() {
        println!("no tiles in {}", data_dir.display());
        return Ok(());
    }

    for (name, lat, lon) in &tiles {
        println!("{}  lat [{}, {}]  lon [{}, {}]", name, lat, lat + 1, lon, lon + 1);
    }
    println!("{} tile(s)", tiles.len());

    Ok(())
}
