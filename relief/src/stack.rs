//! Bounded LRU pool of elevation tiles.
//!
//! A [`Stack`] manages the tiles of a 1° × 1° mosaic on disk: it loads them
//! on demand, keeps them ordered by recency of use, and reclaims the least
//! recently used ones when the pool outgrows its bound. Decoded tiles are
//! large (a GDEM2 tile is ~25 MB), so the bound is what keeps a global
//! mosaic usable.
//!
//! The bound is *soft*: a tile pinned by a [`Client`](crate::Client) is
//! never reclaimed, so the pool may temporarily exceed `max_size` when every
//! resident tile is pinned. The stack never blocks or rejects a load on
//! overflow.
//!
//! # Locking
//!
//! All structural mutations happen inside a single critical section backed
//! by an internal mutex, which guarantees the lock is released on every
//! exit path. Callers integrating the stack into an external
//! synchronization regime may additionally install a `lock`/`unlock` hook
//! pair through the builder; the hooks are invoked at the boundary of the
//! critical section and their failures surface as
//! [`Error::Lock`]/[`Error::Unlock`]. Hooks must be provided both or
//! neither. A [`Client`](crate::Client) may only be bound to a stack that
//! carries hooks; the hook-less regime is reserved for single-threaded use
//! through [`Stack::elevation`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{Error, Result};
use crate::filename::TileFormat;
use crate::reader;
use crate::tile::Tile;

/// Default maximum number of resident tiles (a GDEM2 tile is ~25 MB).
const DEFAULT_MAX_SIZE: usize = 4;

type Hook = Box<dyn Fn() -> bool + Send + Sync>;

struct LockHooks {
    lock: Hook,
    unlock: Hook,
}

/// Snapshot of a stack's pool occupancy.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackStats {
    /// Number of resident tiles.
    pub size: usize,
    /// Number of resident tiles currently pinned by at least one client.
    pub pinned: usize,
}

/// The mutable pool state, guarded by the stack's critical section.
pub(crate) struct StackState {
    /// Resident tiles, least recently used first.
    tiles: Vec<Arc<Tile>>,
}

impl StackState {
    /// Find the resident tile covering a coordinate and mark it as most
    /// recently used. `skip` excludes a caller-held tile from the search.
    pub(crate) fn find(
        &mut self,
        latitude: f64,
        longitude: f64,
        skip: Option<&Arc<Tile>>,
    ) -> Option<Arc<Tile>> {
        let pos = self.tiles.iter().rposition(|tile| {
            if let Some(skip) = skip {
                if Arc::ptr_eq(tile, skip) {
                    return false;
                }
            }
            tile.contains(latitude, longitude)
        })?;
        // Touch: move to the MRU end.
        let tile = self.tiles.remove(pos);
        self.tiles.push(Arc::clone(&tile));
        Some(tile)
    }

    /// Reclaim unpinned tiles from the LRU end while the pool is full.
    ///
    /// A scan that cannot free anything leaves the pool over its bound;
    /// the stack is soft-bounded.
    fn evict(&mut self, max_size: usize) {
        while self.tiles.len() >= max_size {
            match self
                .tiles
                .iter()
                .position(|tile| Arc::strong_count(tile) == 1)
            {
                Some(pos) => {
                    let tile = self.tiles.remove(pos);
                    debug!(x0 = tile.x0(), y0 = tile.y0(), "evicted tile");
                }
                None => break,
            }
        }
    }

    /// Drop a client's pin and reclaim the tile if the pool is over its
    /// bound and nobody else holds it.
    pub(crate) fn release_pin(&mut self, pin: Arc<Tile>, max_size: usize) -> Result<()> {
        let pos = self.tiles.iter().position(|tile| Arc::ptr_eq(tile, &pin));
        drop(pin);
        match pos {
            Some(pos) => {
                if self.tiles.len() > max_size && Arc::strong_count(&self.tiles[pos]) == 1 {
                    let tile = self.tiles.remove(pos);
                    debug!(x0 = tile.x0(), y0 = tile.y0(), "evicted released tile");
                }
                Ok(())
            }
            None => Err(Error::Library(
                "released a tile unknown to its stack".into(),
            )),
        }
    }
}

/// A bounded LRU pool of elevation tiles backed by a mosaic directory.
///
/// # Example
///
/// ```ignore
/// use relief::{Stack, TileFormat};
///
/// let stack = Stack::builder("/data/gdem2")
///     .max_size(16)
///     .format(TileFormat::Gdem2)
///     .build()?;
///
/// // Single-threaded direct lookup.
/// if let Some(z) = stack.elevation(45.5, 3.5)? {
///     println!("ground at {} m", z);
/// }
/// ```
pub struct Stack {
    /// Directory containing the tile files.
    path: PathBuf,
    /// Mosaic layout of the directory.
    format: TileFormat,
    /// Soft bound on the number of resident tiles.
    max_size: usize,
    /// Optional caller-supplied critical section hooks.
    hooks: Option<LockHooks>,
    state: Mutex<StackState>,
}

impl Stack {
    /// Create a hook-less stack for single-threaded use.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory containing the tile files
    /// * `max_size` - Soft bound on the number of resident tiles
    pub fn new<P: AsRef<Path>>(path: P, max_size: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format: TileFormat::default(),
            max_size,
            hooks: None,
            state: Mutex::new(StackState { tiles: Vec::new() }),
        }
    }

    /// Create a builder for more configuration options.
    pub fn builder<P: AsRef<Path>>(path: P) -> StackBuilder {
        StackBuilder::new(path)
    }

    /// Whether the stack carries caller-supplied lock hooks.
    pub fn has_hooks(&self) -> bool {
        self.hooks.is_some()
    }

    /// The directory containing the tile files.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The mosaic layout of the directory.
    pub fn format(&self) -> TileFormat {
        self.format
    }

    /// The soft bound on the number of resident tiles.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Snapshot the pool occupancy.
    ///
    /// The snapshot is taken under the internal mutex only; it does not
    /// invoke the caller's hooks.
    pub fn stats(&self) -> StackStats {
        match self.state.lock() {
            Ok(state) => StackStats {
                size: state.tiles.len(),
                pinned: state
                    .tiles
                    .iter()
                    .filter(|tile| Arc::strong_count(tile) > 1)
                    .count(),
            },
            Err(_) => StackStats::default(),
        }
    }

    /// Drop every resident tile that no client currently pins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lock`]/[`Error::Unlock`] if a caller-supplied hook
    /// fails or the internal mutex is poisoned.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.acquire()?;
        let before = state.tiles.len();
        state.tiles.retain(|tile| Arc::strong_count(tile) > 1);
        let dropped = before - state.tiles.len();
        if dropped > 0 {
            debug!(dropped, "cleared unpinned tiles");
        }
        self.release(state)
    }

    /// Get the elevation at a geodetic coordinate, loading the covering
    /// tile if necessary.
    ///
    /// This is the single-threaded convenience path: it does **not**
    /// invoke the caller's lock hooks. Concurrent readers must go through
    /// a [`Client`](crate::Client) instead.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(elevation))` - interpolated elevation in meters
    /// - `Ok(None)` - no tile covers the coordinate
    /// - `Err(...)` - coordinates out of domain, decode or IO failure
    pub fn elevation(&self, latitude: f64, longitude: f64) -> Result<Option<f64>> {
        let mut state = self.state.lock().map_err(|_| Error::Lock)?;
        let tile = match state.find(latitude, longitude, None) {
            Some(tile) => tile,
            None => match self.load_locked(&mut state, latitude, longitude) {
                Ok(tile) => tile,
                Err(Error::Path { .. }) => return Ok(None),
                Err(e) => return Err(e),
            },
        };
        drop(state);
        Ok(tile.elevation(latitude, longitude))
    }

    /// Enter the stack's critical section.
    pub(crate) fn acquire(&self) -> Result<MutexGuard<'_, StackState>> {
        if let Some(hooks) = &self.hooks {
            if !(hooks.lock)() {
                return Err(Error::Lock);
            }
        }
        match self.state.lock() {
            Ok(state) => Ok(state),
            Err(_) => {
                // The guard was never handed out; undo the caller's hook.
                if let Some(hooks) = &self.hooks {
                    (hooks.unlock)();
                }
                Err(Error::Lock)
            }
        }
    }

    /// Leave the stack's critical section.
    pub(crate) fn release(&self, state: MutexGuard<'_, StackState>) -> Result<()> {
        drop(state);
        if let Some(hooks) = &self.hooks {
            if !(hooks.unlock)() {
                return Err(Error::Unlock);
            }
        }
        Ok(())
    }

    /// Load the tile covering a coordinate and push it on the MRU end,
    /// reclaiming older tiles first to keep the pool within its bound.
    ///
    /// Must be called with the critical section held. The load itself is
    /// synchronous file IO performed under the lock; this serializes loads
    /// but keeps the evicted/loaded accounting atomic.
    pub(crate) fn load_locked(
        &self,
        state: &mut StackState,
        latitude: f64,
        longitude: f64,
    ) -> Result<Arc<Tile>> {
        let lat = latitude.floor() as i32;
        let lon = longitude.floor() as i32;
        let name = self.format.filename(lat, lon)?;
        let path = self.path.join(&name);

        let tile = Arc::new(reader::read_tile(&path)?);
        debug!(tile = %name, "loaded tile");

        state.evict(self.max_size);
        state.tiles.push(Arc::clone(&tile));
        Ok(tile)
    }
}

/// Builder for creating a [`Stack`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use relief::Stack;
///
/// let lock = my_mutex.clone();
/// let unlock = my_mutex.clone();
/// let stack = Stack::builder("/data/gdem2")
///     .max_size(16)
///     .lock(move || lock.acquire())
///     .unlock(move || unlock.release())
///     .build()?;
/// ```
pub struct StackBuilder {
    path: PathBuf,
    max_size: usize,
    format: TileFormat,
    lock: Option<Hook>,
    unlock: Option<Hook>,
}

impl StackBuilder {
    /// Create a new builder with the specified tile directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_size: DEFAULT_MAX_SIZE,
            format: TileFormat::default(),
            lock: None,
            unlock: None,
        }
    }

    /// Set the soft bound on the number of resident tiles.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the mosaic layout of the tile directory.
    pub fn format(mut self, format: TileFormat) -> Self {
        self.format = format;
        self
    }

    /// Install the caller's lock hook. The hook returns `true` on success.
    pub fn lock<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.lock = Some(Box::new(hook));
        self
    }

    /// Install the caller's unlock hook. The hook returns `true` on
    /// success.
    pub fn unlock<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.unlock = Some(Box::new(hook));
        self
    }

    /// Build the [`Stack`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAddress`] if exactly one of the lock and unlock
    /// hooks was provided.
    pub fn build(self) -> Result<Stack> {
        let hooks = match (self.lock, self.unlock) {
            (Some(lock), Some(unlock)) => Some(LockHooks { lock, unlock }),
            (None, None) => None,
            _ => return Err(Error::BadAddress("inconsistent lock and unlock hooks")),
        };
        Ok(Stack {
            path: self.path,
            format: self.format,
            max_size: self.max_size,
            hooks,
            state: Mutex::new(StackState { tiles: Vec::new() }),
        })
    }
}
