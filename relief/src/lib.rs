//! # Relief - Tiled DEM Elevation Library
//!
//! Library for querying global Digital Elevation Model data (ASTER-GDEM2,
//! SRTM) organized as a tiled 1° × 1° mosaic on disk, with bilinear
//! interpolation at arbitrary geodetic coordinates and step-wise traversal
//! of layered terrain along rays expressed in Earth-Centered-Earth-Fixed
//! (ECEF) coordinates.
//!
//! ## Features
//!
//! - **Bounded memory**: decoded tiles (~25 MB each for GDEM2) live in a
//!   soft-bounded LRU pool shared by all readers
//! - **Lock-free hot path**: per-reader [`Client`] handles pin their last
//!   tile and answer spatially coherent queries without any locking
//! - **Layered sampling**: a [`Stepper`] composes stacks, projected maps
//!   and flat levels, and resolves an ECEF position to the topmost layer
//!   covering it
//! - **Geodesy built in**: WGS84 ECEF conversions, ENU bases, horizontal
//!   coordinates, Lambert and UTM projections
//!
//! ## Quick Start
//!
//! Single-threaded use goes through a [`Stack`] directly:
//!
//! ```ignore
//! use relief::Stack;
//!
//! // Keep at most 16 decoded tiles resident.
//! let stack = Stack::new("/data/gdem2", 16);
//!
//! if let Some(z) = stack.elevation(45.5, 3.5)? {
//!     println!("ground at {:.1} m", z);
//! }
//! ```
//!
//! Concurrent readers share one stack through per-thread [`Client`]s; the
//! critical section is bridged to the caller's synchronization regime by
//! a pair of lock hooks:
//!
//! ```ignore
//! use relief::{Client, Stack};
//! use std::sync::Arc;
//!
//! let stack = Arc::new(
//!     Stack::builder("/data/gdem2")
//!         .max_size(16)
//!         .lock(|| true)    // e.g. bridge to an external mutex
//!         .unlock(|| true)
//!         .build()?,
//! );
//!
//! let mut client = Client::new(Arc::clone(&stack))?;
//! let z = client.elevation(45.5, 3.5)?;
//! ```
//!
//! Ray tracing through layered terrain uses a [`Stepper`]:
//!
//! ```ignore
//! use relief::{Stack, Stepper, geodesy};
//! use std::sync::Arc;
//!
//! let mut stepper = Stepper::new();
//! stepper.add_flat(0.0); // sea level fallback
//! stepper.add_stack(Arc::new(Stack::new("/data/gdem2", 16)))?;
//! stepper.set_range(100.0); // amortize the ECEF transform
//!
//! let mut position = geodesy::geodetic_to_ecef(45.5, 3.5, 2000.0);
//! let direction = geodesy::ecef_from_horizontal(45.5, 3.5, 26.0, -2.0);
//! loop {
//!     let step = stepper.step(position)?;
//!     let Some((ground, _layer)) = step.ground else { break };
//!     if step.altitude <= ground {
//!         break; // the ray hit the terrain
//!     }
//!     for i in 0..3 {
//!         position[i] += 10.0 * direction[i];
//!     }
//! }
//! ```
//!
//! ## Tile Data
//!
//! Tile files are consumed, never produced. A stack directory holds one
//! file per 1° × 1° cell, named after its southwest corner:
//!
//! - ASTER-GDEM2: `ASTGTM2_N45E003_dem.tif` (16-bit signed GeoTIFF)
//! - SRTM: `N45E003.hgt` (raw big-endian 16-bit samples)
//!
//! Download sources:
//! - <https://search.earthdata.nasa.gov/> (ASTER-GDEM)
//! - <https://dwtkns.com/srtm30m/> (SRTM)

pub mod client;
pub mod error;
pub mod filename;
pub mod geodesy;
pub mod map;
pub mod projection;
pub mod reader;
pub mod stack;
pub mod stepper;
pub mod tile;

// Re-export main types at crate root for convenience
pub use client::Client;
pub use error::{Error, ErrorCode, Result};
pub use filename::TileFormat;
pub use map::Map;
pub use projection::{Hemisphere, LambertZone, Projection};
pub use stack::{Stack, StackBuilder, StackStats};
pub use stepper::{Step, Stepper};
pub use tile::Tile;
