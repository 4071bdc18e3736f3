//! Tile file readers.
//!
//! Decodes on-disk elevation rasters into in-memory [`Tile`]s. Two formats
//! are consumed (never produced):
//!
//! - **GeoTIFF16**: single-band 16-bit signed GeoTIFF, north-up, carrying
//!   the `GeoPixelScale` and `GeoTiePoints` tags (ASTER-GDEM2 tiles).
//! - **HGT**: raw big-endian 16-bit signed samples on a square grid of
//!   1201 × 1201 (SRTM3) or 3601 × 3601 (SRTM1) nodes, north-up. The grid
//!   origin is inferred from the filename.
//!
//! Both formats store row 0 as the northernmost scanline; the readers
//! reverse rows on ingest so that the in-memory layout is south-up and the
//! tile origin is the lower-left corner.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

use crate::error::{Error, Result};
use crate::filename::parse_tile_filename;
use crate::tile::Tile;

/// GeoTIFF tag 33550: degrees per pixel along each axis (3 doubles).
const TAG_GEO_PIXEL_SCALE: u16 = 33550;

/// GeoTIFF tag 33922: raster-to-model tie points (6 doubles); entries 3
/// and 4 hold the geographic coordinates of the top-left corner.
const TAG_GEO_TIE_POINTS: u16 = 33922;

/// Number of samples per row/column for SRTM1 (1 arc-second).
const SRTM1_SAMPLES: usize = 3601;

/// Number of samples per row/column for SRTM3 (3 arc-second).
const SRTM3_SAMPLES: usize = 1201;

/// Grid metadata of a tile file, without its samples.
#[derive(Debug, Clone, Copy)]
pub struct TileMeta {
    /// Number of grid nodes along the longitude axis.
    pub nx: usize,
    /// Number of grid nodes along the latitude axis.
    pub ny: usize,
    /// Longitude of the lower-left grid node, in degrees.
    pub x0: f64,
    /// Latitude of the lower-left grid node, in degrees.
    pub y0: f64,
    /// Grid step along the longitude axis, in degrees per cell.
    pub dx: f64,
    /// Grid step along the latitude axis, in degrees per cell.
    pub dy: f64,
}

/// Decode a tile file, dispatching on the file extension.
///
/// # Errors
///
/// - [`Error::BadExtension`] for an unrecognized or missing extension
/// - [`Error::Path`] if the file does not exist
/// - [`Error::BadFormat`] if the content does not decode
pub fn read_tile(path: &Path) -> Result<Tile> {
    match extension(path)? {
        TileKind::GeoTiff => read_geotiff16(path),
        TileKind::Hgt => read_hgt(path),
    }
}

/// Read the grid metadata of a tile file without decoding its samples.
pub fn read_meta(path: &Path) -> Result<TileMeta> {
    match extension(path)? {
        TileKind::GeoTiff => {
            let mut decoder = open_geotiff(path)?;
            geotiff_meta(&mut decoder)
        }
        TileKind::Hgt => {
            let len = std::fs::metadata(path)
                .map_err(|e| io_error(e, path))?
                .len() as usize;
            hgt_meta(path, len)
        }
    }
}

enum TileKind {
    GeoTiff,
    Hgt,
}

fn extension(path: &Path) -> Result<TileKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| Error::BadExtension {
            path: path.to_path_buf(),
        })?;
    match ext.to_ascii_lowercase().as_str() {
        "tif" | "tiff" => Ok(TileKind::GeoTiff),
        "hgt" => Ok(TileKind::Hgt),
        _ => Err(Error::BadExtension {
            path: path.to_path_buf(),
        }),
    }
}

fn io_error(e: std::io::Error, path: &Path) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::Path {
            path: path.to_path_buf(),
        }
    } else {
        Error::Io(e)
    }
}

fn open_geotiff(path: &Path) -> Result<Decoder<File>> {
    let file = File::open(path).map_err(|e| io_error(e, path))?;
    let decoder = Decoder::new(file)
        .map_err(|e| Error::BadFormat(format!("{}: {}", path.display(), e)))?;

    // Allow large tiles: a GDEM2 raster is 3601 x 3601 x 2 bytes.
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 256 * 1024 * 1024;
    limits.intermediate_buffer_size = 256 * 1024 * 1024;
    limits.ifd_value_size = 16 * 1024 * 1024;
    Ok(decoder.with_limits(limits))
}

fn geotiff_meta(decoder: &mut Decoder<File>) -> Result<TileMeta> {
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::BadFormat(format!("missing image dimensions: {}", e)))?;
    let (nx, ny) = (width as usize, height as usize);

    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(TAG_GEO_PIXEL_SCALE))
        .map_err(|e| Error::BadFormat(format!("missing GeoPixelScale tag: {}", e)))?;
    if scale.len() < 3 {
        return Err(Error::BadFormat(format!(
            "GeoPixelScale has {} entries, expected 3",
            scale.len()
        )));
    }
    let (dx, dy) = (scale[0], scale[1]);

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(TAG_GEO_TIE_POINTS))
        .map_err(|e| Error::BadFormat(format!("missing GeoTiePoints tag: {}", e)))?;
    if tiepoint.len() < 6 {
        return Err(Error::BadFormat(format!(
            "GeoTiePoints has {} entries, expected 6",
            tiepoint.len()
        )));
    }

    // The tie point is the top-left (north-west) corner; the tile origin
    // is the lower-left one.
    let x0 = tiepoint[3];
    let y0 = tiepoint[4] + (1.0 - ny as f64) * dy;

    Ok(TileMeta {
        nx,
        ny,
        x0,
        y0,
        dx,
        dy,
    })
}

fn read_geotiff16(path: &Path) -> Result<Tile> {
    let mut decoder = open_geotiff(path)?;
    let meta = geotiff_meta(&mut decoder)?;

    let image = decoder
        .read_image()
        .map_err(|e| Error::BadFormat(format!("{}: {}", path.display(), e)))?;
    let mut data = match image {
        DecodingResult::I16(data) => data,
        _ => {
            return Err(Error::BadFormat(format!(
                "{}: expected 16-bit signed samples",
                path.display()
            )))
        }
    };
    if data.len() != meta.nx * meta.ny {
        return Err(Error::BadFormat(format!(
            "{}: {} samples for a {} x {} grid",
            path.display(),
            data.len(),
            meta.nx,
            meta.ny
        )));
    }

    flip_rows(&mut data, meta.nx, meta.ny);
    Tile::new(meta.nx, meta.ny, meta.x0, meta.y0, meta.dx, meta.dy, data)
}

fn hgt_meta(path: &Path, file_len: usize) -> Result<TileMeta> {
    let n = match file_len {
        len if len == SRTM1_SAMPLES * SRTM1_SAMPLES * 2 => SRTM1_SAMPLES,
        len if len == SRTM3_SAMPLES * SRTM3_SAMPLES * 2 => SRTM3_SAMPLES,
        len => {
            return Err(Error::BadFormat(format!(
                "{}: invalid HGT file size {}",
                path.display(),
                len
            )))
        }
    };

    // HGT files carry no georeferencing; the origin comes from the name.
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let (lat, lon) = parse_tile_filename(name).ok_or_else(|| {
        Error::BadFormat(format!(
            "{}: cannot infer tile origin from filename",
            path.display()
        ))
    })?;

    let step = 1.0 / (n - 1) as f64;
    Ok(TileMeta {
        nx: n,
        ny: n,
        x0: f64::from(lon),
        y0: f64::from(lat),
        dx: step,
        dy: step,
    })
}

fn read_hgt(path: &Path) -> Result<Tile> {
    let bytes = std::fs::read(path).map_err(|e| io_error(e, path))?;
    let meta = hgt_meta(path, bytes.len())?;

    // Samples are 16-bit big-endian signed integers.
    let mut data: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    flip_rows(&mut data, meta.nx, meta.ny);
    Tile::new(meta.nx, meta.ny, meta.x0, meta.y0, meta.dx, meta.dy, data)
}

/// Reverse the row order in place, turning a north-up raster south-up.
fn flip_rows(data: &mut [i16], nx: usize, ny: usize) {
    for iy in 0..ny / 2 {
        let top = iy * nx;
        let bottom = (ny - 1 - iy) * nx;
        for ix in 0..nx {
            data.swap(top + ix, bottom + ix);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const SRTM3_SIZE: usize = SRTM3_SAMPLES * SRTM3_SAMPLES * 2;

    /// Write a synthetic SRTM3 tile with a few known samples.
    ///
    /// `samples` are `(row, col, elevation)` triples in file order, i.e.
    /// row 0 is the northernmost scanline.
    fn write_hgt(dir: &Path, name: &str, samples: &[(usize, usize, i16)]) {
        let mut data = vec![0u8; SRTM3_SIZE];
        for &(row, col, z) in samples {
            let offset = (row * SRTM3_SAMPLES + col) * 2;
            let bytes = z.to_be_bytes();
            data[offset] = bytes[0];
            data[offset + 1] = bytes[1];
        }
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(&data).unwrap();
    }

    #[test]
    fn test_read_hgt() {
        let tmp = TempDir::new().unwrap();
        // North-west corner of the file is the highest point.
        write_hgt(tmp.path(), "N45E003.hgt", &[(0, 0, 1000), (1200, 1200, 42)]);

        let tile = read_tile(&tmp.path().join("N45E003.hgt")).unwrap();
        assert_eq!(tile.nx(), SRTM3_SAMPLES);
        assert_eq!(tile.ny(), SRTM3_SAMPLES);
        assert_eq!(tile.x0(), 3.0);
        assert_eq!(tile.y0(), 45.0);
        assert!((tile.dx() - 1.0 / 1200.0).abs() < 1e-12);

        // File row 0 (north) lands on the top in-memory row.
        assert_eq!(tile.z(0, SRTM3_SAMPLES - 1), 1000);
        // File row 1200 col 1200 (south-east) lands on the bottom row.
        assert_eq!(tile.z(SRTM3_SAMPLES - 1, 0), 42);
    }

    #[test]
    fn test_hgt_meta() {
        let tmp = TempDir::new().unwrap();
        write_hgt(tmp.path(), "S12W077.hgt", &[]);

        let meta = read_meta(&tmp.path().join("S12W077.hgt")).unwrap();
        assert_eq!(meta.nx, SRTM3_SAMPLES);
        assert_eq!(meta.x0, -77.0);
        assert_eq!(meta.y0, -12.0);
    }

    #[test]
    fn test_hgt_rejects_bad_size() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("N45E003.hgt"), vec![0u8; 1000]).unwrap();

        let result = read_tile(&tmp.path().join("N45E003.hgt"));
        assert!(matches!(result, Err(Error::BadFormat(_))));
    }

    #[test]
    fn test_hgt_requires_parsable_name() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("terrain.hgt"), vec![0u8; SRTM3_SIZE]).unwrap();

        let result = read_tile(&tmp.path().join("terrain.hgt"));
        assert!(matches!(result, Err(Error::BadFormat(_))));
    }

    #[test]
    fn test_missing_file_is_a_path_error() {
        let tmp = TempDir::new().unwrap();
        let result = read_tile(&tmp.path().join("N45E003.hgt"));
        assert!(matches!(result, Err(Error::Path { .. })));

        let result = read_tile(&tmp.path().join("ASTGTM2_N45E003_dem.tif"));
        assert!(matches!(result, Err(Error::Path { .. })));
    }

    #[test]
    fn test_garbage_geotiff_is_bad_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ASTGTM2_N45E003_dem.tif");
        std::fs::write(&path, b"this is not a tiff file").unwrap();

        let result = read_tile(&path);
        assert!(matches!(result, Err(Error::BadFormat(_))));
    }

    #[test]
    fn test_unknown_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("N45E003.grd");
        std::fs::write(&path, b"").unwrap();

        assert!(matches!(
            read_tile(&path),
            Err(Error::BadExtension { .. })
        ));
        assert!(matches!(
            read_tile(Path::new("noextension")),
            Err(Error::BadExtension { .. })
        ));
    }

    #[test]
    fn test_flip_rows() {
        let mut data = vec![1, 2, 3, 4, 5, 6];
        flip_rows(&mut data, 2, 3);
        assert_eq!(data, vec![5, 6, 3, 4, 1, 2]);

        let mut data = vec![1, 2, 3, 4];
        flip_rows(&mut data, 2, 2);
        assert_eq!(data, vec![3, 4, 1, 2]);
    }
}
