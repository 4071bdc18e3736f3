pub mod info;
pub mod list;
pub mod query;
pub mod step;

use anyhow::{Context, Result};
use relief::{Stack, TileFormat};
use std::path::PathBuf;

/// Build a single-threaded stack from the common CLI options.
pub fn build_stack(
    data_dir: Option<PathBuf>,
    max_tiles: usize,
    format: String,
) -> Result<Stack> {
    let data_dir = data_dir
        .context("no data directory; use --data-dir or set RELIEF_DATA_DIR")?;
    let format: TileFormat = format
        .parse()
        .with_context(|| format!("unknown tile format `{}`", format))?;

    Stack::builder(data_dir)
        .max_size(max_tiles)
        .format(format)
        .build()
        .context("failed to create the tile stack")
}
