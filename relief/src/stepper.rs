//! Layered terrain sampling along ECEF rays.
//!
//! A [`Stepper`] resolves an ECEF position to geodetic coordinates and to
//! the topmost terrain *layer* covering it. Layers are stacked in the
//! order they are added - a typical arrangement is a coarse global flat
//! or stack layer at the bottom with high-resolution local maps on top -
//! and a query is answered by the first layer, scanned from the top, whose
//! footprint contains the position.
//!
//! Stepping a ray samples many nearby positions in sequence, and the exact
//! ECEF to geodetic transform dominates the cost. When a validity range is
//! set with [`Stepper::set_range`], the stepper caches a local
//! East-North-Up frame at the last exactly-transformed position and
//! resolves nearby positions by projecting onto that frame, which is
//! accurate to better than a centimeter within a hundred meters.

use std::sync::Arc;

use tracing::debug;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::geodesy::{curvature_radii, ecef_to_geodetic, enu_basis};
use crate::map::Map;
use crate::stack::Stack;

/// The result of resolving one ECEF position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Geodetic latitude, in degrees.
    pub latitude: f64,
    /// Longitude, in degrees.
    pub longitude: f64,
    /// Altitude above the reference surface, in meters. Orthometric when
    /// a geoid map is set, ellipsoidal otherwise.
    pub altitude: f64,
    /// Ground elevation in meters and index of the topmost covering
    /// layer, or `None` when no layer covers the position.
    pub ground: Option<(f64, usize)>,
}

/// One entry of the stepper's sampling chain.
enum Layer {
    /// A flat layer of constant ground elevation; covers everything.
    Flat { ground: f64 },
    /// A projected or geographic map patch.
    Patch { map: Arc<Map> },
    /// A tile stack accessed through a dedicated owned client.
    Pool { client: Client },
    /// A hook-less tile stack accessed through the direct path.
    Direct { stack: Arc<Stack> },
}

/// The cached local frame of the ECEF to geodetic approximation.
struct LocalFrame {
    origin: [f64; 3],
    latitude: f64,
    longitude: f64,
    altitude: f64,
    east: [f64; 3],
    north: [f64; 3],
    up: [f64; 3],
}

/// Memo of the last resolved position.
struct History {
    position: [f64; 3],
    step: Step,
}

/// A layered terrain sampler over ECEF positions.
///
/// # Example
///
/// ```ignore
/// use relief::{Stack, Stepper};
/// use std::sync::Arc;
///
/// let stack = Arc::new(Stack::new("/data/gdem2", 4));
///
/// let mut stepper = Stepper::new();
/// stepper.add_flat(0.0); // sea level fallback
/// stepper.add_stack(stack)?;
/// stepper.set_range(100.0); // meters of local-frame validity
///
/// let step = stepper.step([4_517_590.9, 243_761.7, 4_487_348.4])?;
/// if let Some((ground, layer)) = step.ground {
///     println!("ground at {} m from layer {}", ground, layer);
/// }
/// ```
pub struct Stepper {
    /// Sampling chain, bottom layer first.
    layers: Vec<Layer>,
    /// Optional geoid undulation model, sampled in geographic
    /// coordinates.
    geoid: Option<Arc<Map>>,
    /// Validity range of the local frame, in meters; disabled when not
    /// positive.
    range: f64,
    frame: Option<LocalFrame>,
    history: Option<History>,
}

impl Stepper {
    /// Create a stepper with no layers.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            geoid: None,
            range: 0.0,
            frame: None,
            history: None,
        }
    }

    /// Append a flat layer of constant ground elevation.
    pub fn add_flat(&mut self, ground: f64) {
        self.layers.push(Layer::Flat { ground });
    }

    /// Append a map layer.
    pub fn add_map(&mut self, map: Arc<Map>) {
        self.layers.push(Layer::Patch { map });
    }

    /// Append a tile stack layer.
    ///
    /// If the stack carries lock hooks the stepper creates and owns a
    /// dedicated [`Client`] for it; otherwise the stack's single-threaded
    /// direct path is used.
    pub fn add_stack(&mut self, stack: Arc<Stack>) -> Result<()> {
        let layer = if stack.has_hooks() {
            Layer::Pool {
                client: Client::new(stack)?,
            }
        } else {
            Layer::Direct { stack }
        };
        self.layers.push(layer);
        Ok(())
    }

    /// Install a geoid undulation model.
    ///
    /// The map is sampled in `(longitude, latitude)` and its value is
    /// subtracted from the ellipsoidal height, so that altitudes and
    /// ground comparisons are orthometric.
    pub fn set_geoid(&mut self, geoid: Arc<Map>) {
        self.geoid = Some(geoid);
    }

    /// Set the validity range of the local-frame approximation, in
    /// meters. A non-positive range disables the approximation.
    pub fn set_range(&mut self, range: f64) {
        self.range = range;
        if range <= 0.0 {
            self.frame = None;
        }
    }

    /// The validity range of the local-frame approximation, in meters.
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Number of layers in the sampling chain.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Resolve an ECEF position to geodetic coordinates and the topmost
    /// covering layer.
    ///
    /// Resolving the same position twice in a row replays the memoized
    /// result without touching the layers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] if a geoid map is set and does not cover
    /// the position, or any error surfaced by a stack layer.
    pub fn step(&mut self, position: [f64; 3]) -> Result<Step> {
        if let Some(history) = &self.history {
            if history.position == position {
                return Ok(history.step);
            }
        }

        let (latitude, longitude, mut altitude) =
            geographic(&mut self.frame, self.range, position);

        if let Some(geoid) = &self.geoid {
            let undulation = geoid
                .elevation(longitude, latitude)
                .ok_or_else(|| Error::Domain("position is outside of the geoid map".into()))?;
            altitude -= undulation;
        }

        let mut ground = None;
        for (index, layer) in self.layers.iter_mut().enumerate().rev() {
            let hit = match layer {
                Layer::Flat { ground } => Some(*ground),
                Layer::Patch { map } => {
                    let (x, y) = match map.projection() {
                        Some(projection) => projection.project(latitude, longitude),
                        None => (longitude, latitude),
                    };
                    map.elevation(x, y)
                }
                Layer::Pool { client } => client.elevation_checked(latitude, longitude)?,
                Layer::Direct { stack } => stack.elevation(latitude, longitude)?,
            };
            if let Some(elevation) = hit {
                ground = Some((elevation, index));
                break;
            }
        }

        let step = Step {
            latitude,
            longitude,
            altitude,
            ground,
        };
        self.history = Some(History { position, step });
        Ok(step)
    }
}

impl Default for Stepper {
    fn default() -> Self {
        Self::new()
    }
}

/// Transform an ECEF position to geodetic coordinates, through the local
/// frame when it is valid, re-priming it from the exact transform
/// otherwise.
fn geographic(
    frame: &mut Option<LocalFrame>,
    range: f64,
    position: [f64; 3],
) -> (f64, f64, f64) {
    if range <= 0.0 {
        return ecef_to_geodetic(position);
    }

    if let Some(frame) = frame.as_ref() {
        let delta = [
            position[0] - frame.origin[0],
            position[1] - frame.origin[1],
            position[2] - frame.origin[2],
        ];
        let distance2 = delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
        if distance2 <= range * range {
            let east = dot(delta, frame.east);
            let north = dot(delta, frame.north);
            let up = dot(delta, frame.up);
            let (meridional, prime_vertical) = curvature_radii(frame.latitude);
            let latitude = frame.latitude + (north / meridional).to_degrees();
            let longitude = frame.longitude
                + (east / (prime_vertical * frame.latitude.to_radians().cos())).to_degrees();
            return (latitude, longitude, frame.altitude + up);
        }
    }

    let (latitude, longitude, altitude) = ecef_to_geodetic(position);
    let (east, north, up) = enu_basis(latitude, longitude);
    debug!(latitude, longitude, "re-primed the local frame");
    *frame = Some(LocalFrame {
        origin: position,
        latitude,
        longitude,
        altitude,
        east,
        north,
        up,
    });
    (latitude, longitude, altitude)
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
