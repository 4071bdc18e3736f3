//! Per-reader handles for concurrent elevation queries.
//!
//! A [`Client`] gives one reader thread-safe access to a shared
//! [`Stack`]. The hot path is lock-free: the client keeps the tile of its
//! last successful query *pinned* (an `Arc` clone that also shields the
//! tile from eviction), so spatially coherent queries resolve without ever
//! entering the stack's critical section. Only a query that leaves the
//! pinned tile takes the lock, to search the shared pool or load from
//! disk.
//!
//! A client also remembers the last 1° × 1° cell for which no tile could
//! be found, so that repeated queries over a hole in the mosaic do not
//! retry the load on every call.
//!
//! Clients are `Send` but not `Sync`: each is owned by a single thread,
//! and all cross-client coordination happens inside the stack.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::stack::{Stack, StackState};
use crate::tile::Tile;

/// A per-reader handle onto a shared [`Stack`].
///
/// # Example
///
/// ```ignore
/// use relief::{Client, Stack};
/// use std::sync::Arc;
///
/// let stack = Arc::new(
///     Stack::builder("/data/gdem2")
///         .lock(|| my_lock())
///         .unlock(|| my_unlock())
///         .build()?,
/// );
///
/// // One client per worker thread.
/// let mut client = Client::new(Arc::clone(&stack))?;
/// let z = client.elevation(45.5, 3.5)?;
/// ```
pub struct Client {
    stack: Arc<Stack>,
    /// The tile of the last successful query, shielded from eviction.
    pinned: Option<Arc<Tile>>,
    /// Integer-degree cell of the last failed load, if any.
    last_failed: Option<(i32, i32)>,
}

impl Client {
    /// Bind a new client to a stack.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAddress`] if the stack carries no lock hooks:
    /// sharing a hook-less stack between clients is a contract violation,
    /// detected here rather than at query time.
    pub fn new(stack: Arc<Stack>) -> Result<Self> {
        if !stack.has_hooks() {
            return Err(Error::BadAddress(
                "a client requires a stack with lock hooks",
            ));
        }
        Ok(Self {
            stack,
            pinned: None,
            last_failed: None,
        })
    }

    /// The stack this client is bound to.
    pub fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }

    /// Get the elevation at a geodetic coordinate.
    ///
    /// # Returns
    ///
    /// The interpolated elevation in meters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Path`] if no tile covers the coordinate. Use
    /// [`Client::elevation_checked`] to treat missing tiles as "outside"
    /// instead.
    pub fn elevation(&mut self, latitude: f64, longitude: f64) -> Result<f64> {
        match self.lookup(latitude, longitude)? {
            Some(elevation) => Ok(elevation),
            None => Err(Error::Path {
                path: self.stack.path().to_path_buf(),
            }),
        }
    }

    /// Get the elevation at a geodetic coordinate, reporting coverage.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(elevation))` - the coordinate is inside the mosaic
    /// - `Ok(None)` - no tile covers the coordinate
    /// - `Err(...)` - domain, decode, or locking failure
    pub fn elevation_checked(&mut self, latitude: f64, longitude: f64) -> Result<Option<f64>> {
        self.lookup(latitude, longitude)
    }

    /// Release the pinned tile, if any.
    ///
    /// The pin swap happens inside the stack's critical section; the tile
    /// is reclaimed immediately when the pool is over its bound and no
    /// other client holds it.
    pub fn clear(&mut self) -> Result<()> {
        let Some(pin) = self.pinned.take() else {
            return Ok(());
        };
        let stack = Arc::clone(&self.stack);
        let mut state = stack.acquire()?;
        let outcome = state.release_pin(pin, stack.max_size());
        let released = stack.release(state);
        released.and(outcome)
    }

    fn lookup(&mut self, latitude: f64, longitude: f64) -> Result<Option<f64>> {
        // Fast path: the pinned tile, no lock taken.
        if let Some(tile) = &self.pinned {
            if tile.contains(latitude, longitude) {
                let (hx, hy) = tile.grid_coords(latitude, longitude);
                return Ok(Some(tile.interpolate(hx, hy)));
            }
        } else if self.last_failed == Some(cell(latitude, longitude)) {
            // Known-missing cell: do not retry the load.
            return Ok(None);
        }

        // Slow path: search and load inside the critical section.
        let stack = Arc::clone(&self.stack);
        let mut state = stack.acquire()?;
        let outcome = self.lookup_locked(&mut state, latitude, longitude);
        let released = stack.release(state);

        // An unlock failure poisons the stack and wins over the lookup
        // outcome; the pin bookkeeping above is already consistent.
        released?;
        let tile = match outcome? {
            Some(tile) => tile,
            None => return Ok(None),
        };

        let (hx, hy) = tile.grid_coords(latitude, longitude);
        Ok(Some(tile.interpolate(hx, hy)))
    }

    /// The critical-section part of a slow-path lookup: search the shared
    /// pool (skipping the already-checked pin), load on miss, and swap the
    /// pin. Returns `Ok(None)` when the covering tile is missing on disk.
    fn lookup_locked(
        &mut self,
        state: &mut StackState,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Arc<Tile>>> {
        let tile = match state.find(latitude, longitude, self.pinned.as_ref()) {
            Some(tile) => tile,
            None => match self.stack.load_locked(state, latitude, longitude) {
                Ok(tile) => tile,
                Err(Error::Path { .. }) => {
                    // Remember the hole and drop the now-stale pin.
                    if let Some(pin) = self.pinned.take() {
                        state.release_pin(pin, self.stack.max_size())?;
                    }
                    self.last_failed = Some(cell(latitude, longitude));
                    return Ok(None);
                }
                Err(e) => return Err(e),
            },
        };

        if let Some(pin) = self.pinned.take() {
            state.release_pin(pin, self.stack.max_size())?;
        }
        self.pinned = Some(Arc::clone(&tile));
        self.last_failed = None;
        Ok(Some(tile))
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // Best effort: a failing hook cannot be reported from here.
        let _ = self.clear();
    }
}

fn cell(latitude: f64, longitude: f64) -> (i32, i32) {
    (latitude.floor() as i32, longitude.floor() as i32)
}
