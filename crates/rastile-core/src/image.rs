//! Tile access contracts and the in-memory tiled image.
//!
//! This module defines what the processing engine requires from an image:
//!
//! - [`TileSource`] - read access: grid geometry plus `tile(tx, ty)`
//! - [`TileSink`] - write access: paired `acquire_tile`/`release_tile`
//!
//! and provides [`GridImage`], a concrete in-memory implementation backed
//! by one lock-protected sample buffer per tile, so that disjoint tiles
//! can be read and written concurrently.
//!
//! # Contract
//!
//! Implementations must be safe for concurrent calls on disjoint
//! `(tx, ty)`. The engine guarantees that each tile coordinate is claimed
//! by exactly one worker at a time, so implementations need no additional
//! locking of tile content beyond what their own storage requires.
//!
//! Every `acquire_tile` must be paired with exactly one `release_tile`,
//! even when the operation applied to the tile fails. [`GridImage`] tracks
//! the pairing: [`GridImage::has_tile_writers`] reports whether any
//! writable tile is still checked out.
//!
//! # Usage
//!
//! ```rust
//! use rastile_core::{GridImage, PixelRect, TileGrid, TileSink, TileSource};
//!
//! let grid = TileGrid::new(PixelRect::from_size(64, 64), 32, 32).unwrap();
//! let img: GridImage<f32> = GridImage::new(grid, 1).unwrap();
//!
//! {
//!     let mut tile = img.acquire_tile(0, 0).unwrap();
//!     tile.set_sample(5, 5, 0, 1.0);
//! }
//! img.release_tile(0, 0);
//!
//! assert!(!img.has_tile_writers());
//! assert_eq!(img.tile(0, 0).unwrap().sample(5, 5, 0), 1.0);
//! ```

use crate::{Error, Result, Sample, Tile, TileGrid, TileMut};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

/// Read access to a grid-partitioned raster.
///
/// The associated [`Tile`](TileSource::Tile) type borrows from the image
/// and must not be retained past one callback invocation.
pub trait TileSource {
    /// Borrowed read-only tile view.
    type Tile<'a>
    where
        Self: 'a;

    /// Returns the tile grid geometry of this image.
    fn grid(&self) -> &TileGrid;

    /// Fetches the tile at `(tx, ty)`.
    ///
    /// Must be safe to call concurrently for disjoint tile indices.
    ///
    /// # Errors
    ///
    /// [`Error::TileOutOfRange`] for indices outside the grid, or
    /// [`Error::TileUnavailable`] when the implementation cannot produce
    /// the tile.
    fn tile(&self, tx: i32, ty: i32) -> Result<Self::Tile<'_>>;
}

/// Write access to a grid-partitioned raster.
///
/// `acquire_tile` and `release_tile` must be paired exactly once per
/// checkout; the engine releases through a scope guard so the pairing
/// holds on every exit path, including callback failure.
pub trait TileSink: TileSource {
    /// Borrowed writable tile view.
    type TileMut<'a>
    where
        Self: 'a;

    /// Checks out the tile at `(tx, ty)` for writing.
    ///
    /// Must be safe to call concurrently for disjoint tile indices.
    ///
    /// # Errors
    ///
    /// [`Error::TileOutOfRange`] for indices outside the grid, or
    /// [`Error::TileUnavailable`] when the implementation cannot produce
    /// the tile.
    fn acquire_tile(&self, tx: i32, ty: i32) -> Result<Self::TileMut<'_>>;

    /// Returns a previously acquired tile.
    ///
    /// Called exactly once per successful
    /// [`acquire_tile`](TileSink::acquire_tile) call. Releasing a tile
    /// that was never acquired is a caller defect; implementations should
    /// tolerate it without corrupting their state.
    fn release_tile(&self, tx: i32, ty: i32);
}

/// In-memory tiled raster with per-tile interior mutability.
///
/// Each tile owns a full `tile_width * tile_height * channels` sample
/// buffer behind its own `RwLock`; edge tiles allocate the full size and
/// expose a clipped rectangle. Reads take the shared lock, writable
/// checkouts the exclusive lock, so concurrent access to disjoint tiles
/// never contends.
///
/// # Example
///
/// ```rust
/// use rastile_core::{GridImage, PixelRect, TileGrid};
///
/// let grid = TileGrid::new(PixelRect::from_size(256, 256), 64, 64).unwrap();
/// let img: GridImage<u16> = GridImage::filled(grid, 3, 1024).unwrap();
/// assert_eq!(img.channels(), 3);
/// ```
pub struct GridImage<T: Sample> {
    grid: TileGrid,
    channels: u32,
    /// One buffer per tile, row-major tile order.
    tiles: Vec<RwLock<Box<[T]>>>,
    /// Checked-out writable tile counts, same order as `tiles`.
    writers: Vec<AtomicU32>,
}

impl<T: Sample> GridImage<T> {
    /// Creates an image with all samples zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGrid`] if `channels` is zero or a tile
    /// buffer would not fit in memory.
    pub fn new(grid: TileGrid, channels: u32) -> Result<Self> {
        Self::filled(grid, channels, T::zero())
    }

    /// Creates an image with every sample set to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGrid`] if `channels` is zero or a tile
    /// buffer would not fit in memory.
    pub fn filled(grid: TileGrid, channels: u32, value: T) -> Result<Self> {
        if channels == 0 {
            return Err(Error::invalid_grid("channel count must be non-zero"));
        }
        let samples_per_tile = grid.tile_width() as u64 * grid.tile_height() as u64 * channels as u64;
        let samples_per_tile = usize::try_from(samples_per_tile)
            .map_err(|_| Error::invalid_grid("tile buffer exceeds addressable memory"))?;
        let tile_count = usize::try_from(grid.tile_count())
            .map_err(|_| Error::invalid_grid("tile count exceeds addressable memory"))?;

        let tiles = (0..tile_count)
            .map(|_| RwLock::new(vec![value; samples_per_tile].into_boxed_slice()))
            .collect();
        let writers = (0..tile_count).map(|_| AtomicU32::new(0)).collect();
        Ok(Self {
            grid,
            channels,
            tiles,
            writers,
        })
    }

    /// Returns the number of sample components per pixel.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Returns `true` if tile `(tx, ty)` is currently checked out for
    /// writing.
    pub fn is_tile_writable(&self, tx: i32, ty: i32) -> bool {
        self.tile_slot(tx, ty)
            .map(|i| self.writers[i].load(Ordering::Acquire) > 0)
            .unwrap_or(false)
    }

    /// Returns `true` if any tile is currently checked out for writing.
    pub fn has_tile_writers(&self) -> bool {
        self.writers
            .iter()
            .any(|w| w.load(Ordering::Acquire) > 0)
    }

    /// Maps tile indices to the row-major tile slot.
    fn tile_slot(&self, tx: i32, ty: i32) -> Result<usize> {
        if !self.grid.contains_tile(tx, ty) {
            return Err(Error::TileOutOfRange {
                tx,
                ty,
                num_x: self.grid.num_tiles_x(),
                num_y: self.grid.num_tiles_y(),
            });
        }
        let col = (tx as i64 - self.grid.min_tile_x() as i64) as usize;
        let row = (ty as i64 - self.grid.min_tile_y() as i64) as usize;
        Ok(row * self.grid.num_tiles_x() as usize + col)
    }

    fn tile_geometry(&self, tx: i32, ty: i32) -> Result<(crate::PixelRect, (i64, i64), usize)> {
        let rect = self.grid.tile_rect(tx, ty)?;
        let origin = (self.grid.tile_origin_x(tx), self.grid.tile_origin_y(ty));
        let stride = self.grid.tile_width() as usize * self.channels as usize;
        Ok((rect, origin, stride))
    }
}

impl<T: Sample> TileSource for GridImage<T> {
    type Tile<'a>
        = Tile<'a, T>
    where
        Self: 'a;

    fn grid(&self) -> &TileGrid {
        &self.grid
    }

    fn tile(&self, tx: i32, ty: i32) -> Result<Self::Tile<'_>> {
        let slot = self.tile_slot(tx, ty)?;
        let (rect, origin, stride) = self.tile_geometry(tx, ty)?;
        let data = self.tiles[slot].read().expect("tile lock poisoned");
        Ok(Tile::new(rect, origin, stride, self.channels, data))
    }
}

impl<T: Sample> TileSink for GridImage<T> {
    type TileMut<'a>
        = TileMut<'a, T>
    where
        Self: 'a;

    fn acquire_tile(&self, tx: i32, ty: i32) -> Result<Self::TileMut<'_>> {
        let slot = self.tile_slot(tx, ty)?;
        let (rect, origin, stride) = self.tile_geometry(tx, ty)?;
        let data = self.tiles[slot].write().expect("tile lock poisoned");
        self.writers[slot].fetch_add(1, Ordering::AcqRel);
        Ok(TileMut::new(rect, origin, stride, self.channels, data))
    }

    fn release_tile(&self, tx: i32, ty: i32) {
        if let Ok(slot) = self.tile_slot(tx, ty) {
            let balanced = self.writers[slot]
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok();
            debug_assert!(balanced, "release of tile ({tx}, {ty}) without acquire");
        }
    }
}
