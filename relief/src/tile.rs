//! Decoded elevation tiles and bilinear sampling.
//!
//! A [`Tile`] is one rectangular raster of signed 16-bit elevation samples,
//! typically covering a 1° × 1° cell. Samples are stored south-up: grid row
//! `iy = 0` is the southernmost row, so the tile origin `(x0, y0)` is the
//! lower-left corner. Loaders are responsible for reversing north-up sources
//! on ingest (see [`crate::reader`]).

use crate::error::{Error, Result};

/// A decoded elevation raster.
///
/// Tiles are immutable once constructed and are shared between the owning
/// [`Stack`](crate::Stack) and any pinning [`Client`](crate::Client) through
/// `Arc`. The number of outstanding client pins is therefore the `Arc`
/// strong count minus the cache's own reference.
#[derive(Debug)]
pub struct Tile {
    /// Number of grid nodes along the longitude axis.
    nx: usize,
    /// Number of grid nodes along the latitude axis.
    ny: usize,
    /// Longitude of the lower-left grid node, in degrees.
    x0: f64,
    /// Latitude of the lower-left grid node, in degrees.
    y0: f64,
    /// Grid step along the longitude axis, in degrees per cell.
    dx: f64,
    /// Grid step along the latitude axis, in degrees per cell.
    dy: f64,
    /// Elevation samples in meters, row-major, south-up.
    data: Vec<i16>,
}

impl Tile {
    /// Assemble a tile from decoded samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadFormat`] if the grid is degenerate (`nx` or `ny`
    /// below 2, non-positive steps) or if the sample count does not match
    /// the grid dimensions.
    pub(crate) fn new(
        nx: usize,
        ny: usize,
        x0: f64,
        y0: f64,
        dx: f64,
        dy: f64,
        data: Vec<i16>,
    ) -> Result<Self> {
        if nx < 2 || ny < 2 {
            return Err(Error::BadFormat(format!(
                "degenerate tile grid: {} x {}",
                nx, ny
            )));
        }
        if dx <= 0.0 || dy <= 0.0 {
            return Err(Error::BadFormat(format!(
                "invalid tile step: {} x {}",
                dx, dy
            )));
        }
        if data.len() != nx * ny {
            return Err(Error::BadFormat(format!(
                "sample count {} does not match {} x {} grid",
                data.len(),
                nx,
                ny
            )));
        }
        Ok(Self {
            nx,
            ny,
            x0,
            y0,
            dx,
            dy,
            data,
        })
    }

    /// The elevation sample at grid node `(ix, iy)`, in meters.
    ///
    /// `iy = 0` is the southernmost row. Indices are clamped to the grid.
    pub fn z(&self, ix: usize, iy: usize) -> i16 {
        let ix = ix.min(self.nx - 1);
        let iy = iy.min(self.ny - 1);
        self.data[iy * self.nx + ix]
    }

    /// Convert geodetic coordinates to fractional grid coordinates.
    pub fn grid_coords(&self, latitude: f64, longitude: f64) -> (f64, f64) {
        let hx = (longitude - self.x0) / self.dx;
        let hy = (latitude - self.y0) / self.dy;
        (hx, hy)
    }

    /// Check whether a geodetic coordinate lies within the tile footprint.
    ///
    /// The footprint extends one cell beyond the last grid node on each
    /// axis, matching the sampling domain of [`Tile::interpolate`].
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        let (hx, hy) = self.grid_coords(latitude, longitude);
        hx >= 0.0 && hx <= self.nx as f64 && hy >= 0.0 && hy <= self.ny as f64
    }

    /// Bilinearly interpolate the elevation at fractional grid coordinates.
    ///
    /// Node indices are clamped to the grid, so sampling exactly on a node
    /// returns the stored value and sampling within the outer margin
    /// degrades to the edge value.
    pub fn interpolate(&self, hx: f64, hy: f64) -> f64 {
        let mut ix = hx.floor() as isize;
        let mut iy = hy.floor() as isize;
        let fx = hx - ix as f64;
        let fy = hy - iy as f64;
        if ix < 0 {
            ix = 0;
        }
        if iy < 0 {
            iy = 0;
        }
        let ix = (ix as usize).min(self.nx - 1);
        let iy = (iy as usize).min(self.ny - 1);
        let ix1 = (ix + 1).min(self.nx - 1);
        let iy1 = (iy + 1).min(self.ny - 1);

        f64::from(self.z(ix, iy)) * (1.0 - fx) * (1.0 - fy)
            + f64::from(self.z(ix, iy1)) * (1.0 - fx) * fy
            + f64::from(self.z(ix1, iy)) * fx * (1.0 - fy)
            + f64::from(self.z(ix1, iy1)) * fx * fy
    }

    /// Interpolate the elevation at a geodetic coordinate.
    ///
    /// Returns `None` if the coordinate falls outside the tile footprint.
    pub fn elevation(&self, latitude: f64, longitude: f64) -> Option<f64> {
        if !self.contains(latitude, longitude) {
            return None;
        }
        let (hx, hy) = self.grid_coords(latitude, longitude);
        Some(self.interpolate(hx, hy))
    }

    /// Number of grid nodes along the longitude axis.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of grid nodes along the latitude axis.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Longitude of the lower-left grid node, in degrees.
    pub fn x0(&self) -> f64 {
        self.x0
    }

    /// Latitude of the lower-left grid node, in degrees.
    pub fn y0(&self) -> f64 {
        self.y0
    }

    /// Grid step along the longitude axis, in degrees per cell.
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Grid step along the latitude axis, in degrees per cell.
    pub fn dy(&self) -> f64 {
        self.dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 3 x 3 tile over [45, 46) x [3, 4) with a known gradient.
    fn gradient_tile() -> Tile {
        // South row: 0 10 20, middle: 100 110 120, north: 200 210 220.
        let data = vec![0, 10, 20, 100, 110, 120, 200, 210, 220];
        Tile::new(3, 3, 3.0, 45.0, 0.5, 0.5, data).unwrap()
    }

    #[test]
    fn test_rejects_degenerate_grids() {
        assert!(Tile::new(1, 3, 0.0, 0.0, 0.5, 0.5, vec![0; 3]).is_err());
        assert!(Tile::new(3, 3, 0.0, 0.0, 0.0, 0.5, vec![0; 9]).is_err());
        assert!(Tile::new(3, 3, 0.0, 0.0, 0.5, 0.5, vec![0; 8]).is_err());
    }

    #[test]
    fn test_interpolation_at_nodes_is_exact() {
        let tile = gradient_tile();
        for iy in 0..3 {
            for ix in 0..3 {
                let expected = f64::from(tile.z(ix, iy));
                let got = tile.interpolate(ix as f64, iy as f64);
                assert_eq!(got, expected, "node ({}, {})", ix, iy);
            }
        }
    }

    #[test]
    fn test_interpolation_midpoint() {
        let tile = gradient_tile();
        // Center of the first cell: average of 0, 10, 100, 110.
        let z = tile.interpolate(0.5, 0.5);
        assert!((z - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolation_clamps_at_margin() {
        let tile = gradient_tile();
        // Beyond the last node the edge value is repeated.
        let z = tile.interpolate(2.5, 2.5);
        assert_eq!(z, 220.0);
        let z = tile.interpolate(3.0, 3.0);
        assert_eq!(z, 220.0);
    }

    #[test]
    fn test_contains_footprint() {
        let tile = gradient_tile();
        assert!(tile.contains(45.0, 3.0));
        assert!(tile.contains(45.7, 3.7));
        // The footprint includes the one-cell outer margin.
        assert!(tile.contains(46.4, 4.4));
        assert!(!tile.contains(44.9, 3.5));
        assert!(!tile.contains(45.5, 4.6));
    }

    #[test]
    fn test_elevation_lookup() {
        let tile = gradient_tile();
        // Node (1, 1) sits at (45.5, 3.5).
        assert_eq!(tile.elevation(45.5, 3.5), Some(110.0));
        assert_eq!(tile.elevation(20.0, 3.5), None);
    }

    #[test]
    fn test_z_is_south_up() {
        let tile = gradient_tile();
        assert_eq!(tile.z(0, 0), 0); // south-west corner
        assert_eq!(tile.z(0, 2), 200); // north-west corner
    }
}
