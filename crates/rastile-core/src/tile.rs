//! Borrowed tile views.
//!
//! A tile is one rectangular block of an image's pixel grid, borrowed for
//! the duration of a single callback invocation and never retained past
//! it. [`Tile`] is the read-only view, [`TileMut`] the writable view
//! handed out by [`crate::image::GridImage::acquire_tile`].
//!
//! Both views address samples in absolute pixel coordinates: the view
//! knows its own (possibly clipped) pixel rectangle and the un-clipped
//! tile origin used for row indexing.

use crate::{PixelRect, Sample};
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

/// Computes the buffer index of sample `(x, y, c)` for a tile anchored at
/// `origin` with the given row stride.
#[inline]
fn sample_index(
    origin: (i64, i64),
    stride: usize,
    channels: u32,
    x: i64,
    y: i64,
    c: u32,
) -> usize {
    debug_assert!(c < channels, "channel {c} out of {channels}");
    let dx = (x - origin.0) as usize;
    let dy = (y - origin.1) as usize;
    dy * stride + dx * channels as usize + c as usize
}

/// Read-only view of one tile.
///
/// Holds a shared lock on the tile's buffer for the lifetime of the view.
///
/// # Example
///
/// ```rust
/// use rastile_core::{GridImage, PixelRect, TileGrid, TileSource};
///
/// let grid = TileGrid::new(PixelRect::from_size(64, 64), 32, 32).unwrap();
/// let img: GridImage<f32> = GridImage::filled(grid, 1, 0.5).unwrap();
///
/// let tile = img.tile(1, 1).unwrap();
/// assert_eq!(tile.rect(), &PixelRect::new(32, 32, 32, 32));
/// assert_eq!(tile.sample(40, 40, 0), 0.5);
/// ```
pub struct Tile<'a, T: Sample> {
    rect: PixelRect,
    origin: (i64, i64),
    stride: usize,
    channels: u32,
    data: RwLockReadGuard<'a, Box<[T]>>,
}

impl<'a, T: Sample> Tile<'a, T> {
    pub(crate) fn new(
        rect: PixelRect,
        origin: (i64, i64),
        stride: usize,
        channels: u32,
        data: RwLockReadGuard<'a, Box<[T]>>,
    ) -> Self {
        Self {
            rect,
            origin,
            stride,
            channels,
            data,
        }
    }

    /// Returns the pixel rectangle covered by this tile, clipped to the
    /// image bounds.
    #[inline]
    pub fn rect(&self) -> &PixelRect {
        &self.rect
    }

    /// Returns the number of sample components per pixel.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Returns the number of samples per buffer row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the raw sample buffer of the full (un-clipped) tile.
    #[inline]
    pub fn samples(&self) -> &[T] {
        &self.data
    }

    /// Returns the sample at absolute pixel `(x, y)`, component `c`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside this tile's rectangle or `c` is not a
    /// valid channel.
    #[inline]
    pub fn sample(&self, x: i64, y: i64, c: u32) -> T {
        debug_assert!(self.rect.contains(x, y), "pixel ({x}, {y}) outside {}", self.rect);
        self.data[sample_index(self.origin, self.stride, self.channels, x, y, c)]
    }
}

/// Writable view of one tile.
///
/// Holds an exclusive lock on the tile's buffer for the lifetime of the
/// view. Obtained through [`crate::image::GridImage::acquire_tile`], which
/// must be paired with a `release_tile` call.
pub struct TileMut<'a, T: Sample> {
    rect: PixelRect,
    origin: (i64, i64),
    stride: usize,
    channels: u32,
    data: RwLockWriteGuard<'a, Box<[T]>>,
}

impl<'a, T: Sample> TileMut<'a, T> {
    pub(crate) fn new(
        rect: PixelRect,
        origin: (i64, i64),
        stride: usize,
        channels: u32,
        data: RwLockWriteGuard<'a, Box<[T]>>,
    ) -> Self {
        Self {
            rect,
            origin,
            stride,
            channels,
            data,
        }
    }

    /// Returns the pixel rectangle covered by this tile, clipped to the
    /// image bounds.
    #[inline]
    pub fn rect(&self) -> &PixelRect {
        &self.rect
    }

    /// Returns the number of sample components per pixel.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Returns the number of samples per buffer row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the raw sample buffer of the full (un-clipped) tile.
    #[inline]
    pub fn samples(&self) -> &[T] {
        &self.data
    }

    /// Returns the raw sample buffer mutably.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns the sample at absolute pixel `(x, y)`, component `c`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside this tile's rectangle or `c` is not a
    /// valid channel.
    #[inline]
    pub fn sample(&self, x: i64, y: i64, c: u32) -> T {
        debug_assert!(self.rect.contains(x, y), "pixel ({x}, {y}) outside {}", self.rect);
        self.data[sample_index(self.origin, self.stride, self.channels, x, y, c)]
    }

    /// Sets the sample at absolute pixel `(x, y)`, component `c`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside this tile's rectangle or `c` is not a
    /// valid channel.
    #[inline]
    pub fn set_sample(&mut self, x: i64, y: i64, c: u32, value: T) {
        debug_assert!(self.rect.contains(x, y), "pixel ({x}, {y}) outside {}", self.rect);
        let idx = sample_index(self.origin, self.stride, self.channels, x, y, c);
        self.data[idx] = value;
    }

    /// Fills every sample of the tile buffer with `value`.
    #[inline]
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}
