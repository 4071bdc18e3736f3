//! Tile filename conventions.
//!
//! This module maps integer-degree tile coordinates to on-disk filenames and
//! back, for the supported mosaic layouts.
//!
//! # Filename Formats
//!
//! - **ASTER-GDEM2**: `ASTGTM2_{N|S}{lat:02}{E|W}{lon:03}_dem.tif`, e.g.
//!   `ASTGTM2_N45E003_dem.tif`
//! - **SRTM**: `{N|S}{lat:02}{E|W}{lon:03}.hgt`, e.g. `N45E003.hgt`
//!
//! In both conventions the coordinates name the **southwest corner** of the
//! 1° × 1° tile.

use std::str::FromStr;

use crate::error::{Error, Result};

/// The mosaic layout of a tile directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileFormat {
    /// ASTER-GDEM2 16-bit signed GeoTIFF tiles.
    #[default]
    Gdem2,
    /// SRTM `.hgt` tiles.
    Srtm,
}

impl TileFormat {
    /// Compute the on-disk filename for the tile whose southwest corner is
    /// at `(lat, lon)` integer degrees.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] if `|lat| > 89` or `|lon| > 180`.
    pub fn filename(&self, lat: i32, lon: i32) -> Result<String> {
        if lat.abs() > 89 {
            return Err(Error::Domain(format!("invalid tile latitude: {}", lat)));
        }
        if lon.abs() > 180 {
            return Err(Error::Domain(format!("invalid tile longitude: {}", lon)));
        }

        let ns = if lat >= 0 { 'N' } else { 'S' };
        let ew = if lon >= 0 { 'E' } else { 'W' };
        let name = match self {
            TileFormat::Gdem2 => format!(
                "ASTGTM2_{}{:02}{}{:03}_dem.tif",
                ns,
                lat.abs(),
                ew,
                lon.abs()
            ),
            TileFormat::Srtm => format!("{}{:02}{}{:03}.hgt", ns, lat.abs(), ew, lon.abs()),
        };
        Ok(name)
    }
}

impl FromStr for TileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gdem2" => Ok(TileFormat::Gdem2),
            "srtm" => Ok(TileFormat::Srtm),
            other => Err(Error::BadFormat(format!("unknown tile format: {}", other))),
        }
    }
}

/// Parse a tile filename to the southwest-corner coordinates.
///
/// Both the GDEM2 and SRTM conventions are recognized; a leading directory
/// path is ignored. Returns `None` if the name matches neither convention.
///
/// # Examples
///
/// ```
/// use relief::filename::parse_tile_filename;
///
/// assert_eq!(parse_tile_filename("ASTGTM2_N45E003_dem.tif"), Some((45, 3)));
/// assert_eq!(parse_tile_filename("S12W077.hgt"), Some((-12, -77)));
/// assert_eq!(parse_tile_filename("readme.txt"), None);
/// ```
pub fn parse_tile_filename(filename: &str) -> Option<(i32, i32)> {
    let name = filename
        .rsplit('/')
        .next()
        .unwrap_or(filename)
        .rsplit('\\')
        .next()
        .unwrap_or(filename);

    let core = if let Some(rest) = name.strip_prefix("ASTGTM2_") {
        rest.strip_suffix("_dem.tif")?
    } else {
        name.strip_suffix(".hgt")?
    };

    // Must be exactly 7 characters: N45E003.
    if core.len() != 7 || !core.is_ascii() {
        return None;
    }

    let lat_sign = match core.as_bytes()[0] {
        b'N' | b'n' => 1,
        b'S' | b's' => -1,
        _ => return None,
    };
    let lat: i32 = core[1..3].parse().ok()?;

    let lon_sign = match core.as_bytes()[3] {
        b'E' | b'e' => 1,
        b'W' | b'w' => -1,
        _ => return None,
    };
    let lon: i32 = core[4..7].parse().ok()?;

    Some((lat * lat_sign, lon * lon_sign))
}
