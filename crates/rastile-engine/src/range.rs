//! Tile index ranges.
//!
//! A [`TileRange`] is the inclusive rectangle of tile indices a sweep will
//! visit: the whole grid, or the tiles intersecting a region of interest.
//! It may be empty (no tile to visit), which is a valid outcome of a
//! region of interest that misses the image, not an error.
//!
//! Pixel-to-tile arithmetic runs in 64 bits and is narrowed to the 32-bit
//! tile index space afterwards, so offset grids near the index limits
//! produce [`Error::TileIndexOverflow`](rastile_core::Error::TileIndexOverflow)
//! instead of a wrapped index.
//!
//! # Usage
//!
//! ```rust
//! use rastile_core::{PixelRect, Roi, TileGrid};
//! use rastile_engine::TileRange;
//!
//! let grid = TileGrid::new(PixelRect::from_size(100, 60), 32, 32).unwrap();
//!
//! let full = TileRange::full(&grid);
//! assert_eq!(full.tile_count(), 8);
//!
//! let roi = Roi::Region(PixelRect::new(30, 30, 10, 10));
//! let range = TileRange::compute(&grid, &roi).unwrap();
//! assert_eq!((range.min_tile_x(), range.min_tile_y()), (0, 0));
//! assert_eq!((range.max_tile_x(), range.max_tile_y()), (1, 1));
//! assert!(range.is_multi_tiled());
//! ```

use rastile_core::{Error, Result, Roi, TileGrid};

/// Inclusive rectangle of tile indices to visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

/// Narrows a 64-bit tile index to the native tile index space.
fn narrow(value: i64, axis: &'static str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::TileIndexOverflow { axis, value })
}

impl TileRange {
    /// The empty range: zero tiles to visit.
    pub const EMPTY: TileRange = TileRange {
        min_x: 0,
        min_y: 0,
        max_x: -1,
        max_y: -1,
    };

    /// Returns the range covering the image's full tile grid.
    pub fn full(grid: &TileGrid) -> Self {
        Self {
            min_x: grid.min_tile_x(),
            min_y: grid.min_tile_y(),
            max_x: grid.max_tile_x(),
            max_y: grid.max_tile_y(),
        }
    }

    /// Computes the range of tiles intersecting a region of interest.
    ///
    /// `Roi::Full` uses the image's own tile grid. A bounded region is
    /// first clipped to the image bounds; if nothing remains, the result
    /// is [`TileRange::EMPTY`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::TileIndexOverflow`] if a computed index does not
    /// fit in the 32-bit tile index space.
    pub fn compute(grid: &TileGrid, roi: &Roi) -> Result<Self> {
        if roi.is_full() {
            return Ok(Self::full(grid));
        }
        let region = roi.resolve(grid.bounds());
        if region.is_empty() {
            return Ok(Self::EMPTY);
        }
        Ok(Self {
            min_x: narrow(grid.tile_x_at(region.x), "x")?,
            min_y: narrow(grid.tile_y_at(region.y), "y")?,
            max_x: narrow(grid.tile_x_at(region.right() - 1), "x")?,
            max_y: narrow(grid.tile_y_at(region.bottom() - 1), "y")?,
        })
    }

    /// Returns the index of the first tile column (inclusive).
    #[inline]
    pub const fn min_tile_x(&self) -> i32 {
        self.min_x
    }

    /// Returns the index of the first tile row (inclusive).
    #[inline]
    pub const fn min_tile_y(&self) -> i32 {
        self.min_y
    }

    /// Returns the index of the last tile column (inclusive).
    #[inline]
    pub const fn max_tile_x(&self) -> i32 {
        self.max_x
    }

    /// Returns the index of the last tile row (inclusive).
    #[inline]
    pub const fn max_tile_y(&self) -> i32 {
        self.max_y
    }

    /// Returns `true` if there is no tile to visit.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.max_x < self.min_x || self.max_y < self.min_y
    }

    /// Returns the number of tile columns in the range.
    #[inline]
    pub const fn num_tiles_x(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            (self.max_x as i64 - self.min_x as i64 + 1) as u32
        }
    }

    /// Returns the number of tile rows in the range.
    #[inline]
    pub const fn num_tiles_y(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            (self.max_y as i64 - self.min_y as i64 + 1) as u32
        }
    }

    /// Returns the total number of tiles in the range.
    #[inline]
    pub const fn tile_count(&self) -> u64 {
        self.num_tiles_x() as u64 * self.num_tiles_y() as u64
    }

    /// Returns `true` if the range spans two tiles or more.
    ///
    /// A single tile or an empty range does not justify the parallel
    /// machinery; callers use this to fall back to the sequential path.
    #[inline]
    pub const fn is_multi_tiled(&self) -> bool {
        self.tile_count() > 1
    }

    /// Returns `true` if `(tx, ty)` lies inside the range.
    #[inline]
    pub const fn contains(&self, tx: i32, ty: i32) -> bool {
        tx >= self.min_x && tx <= self.max_x && ty >= self.min_y && ty <= self.max_y
    }

    /// Returns a row-major iterator over the tile indices of the range.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rastile_core::{PixelRect, TileGrid};
    /// use rastile_engine::TileRange;
    ///
    /// let grid = TileGrid::new(PixelRect::from_size(64, 64), 32, 32).unwrap();
    /// let tiles: Vec<_> = TileRange::full(&grid).iter().collect();
    /// assert_eq!(tiles, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    /// ```
    pub fn iter(&self) -> TileIter {
        TileIter {
            range: *self,
            next: if self.is_empty() {
                None
            } else {
                Some((self.min_x, self.min_y))
            },
        }
    }
}

impl std::fmt::Display for TileRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "TileRange(empty)")
        } else {
            write!(
                f,
                "TileRange(({}, {})..=({}, {}))",
                self.min_x, self.min_y, self.max_x, self.max_y
            )
        }
    }
}

/// Row-major iterator over the tile indices of a [`TileRange`].
pub struct TileIter {
    range: TileRange,
    next: Option<(i32, i32)>,
}

impl Iterator for TileIter {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        let current = self.next?;
        let (x, y) = current;
        self.next = if x < self.range.max_x {
            Some((x + 1, y))
        } else if y < self.range.max_y {
            Some((self.range.min_x, y + 1))
        } else {
            None
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            None => (0, Some(0)),
            Some((x, y)) => {
                let per_row = self.range.num_tiles_x() as u64;
                let rows_left = (self.range.max_y as i64 - y as i64) as u64;
                let in_row = (self.range.max_x as i64 - x as i64) as u64 + 1;
                let remaining = (rows_left * per_row + in_row) as usize;
                (remaining, Some(remaining))
            }
        }
    }
}

impl ExactSizeIterator for TileIter {}

impl IntoIterator for &TileRange {
    type Item = (i32, i32);
    type IntoIter = TileIter;

    fn into_iter(self) -> TileIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rastile_core::PixelRect;

    fn grid_100x60() -> TileGrid {
        TileGrid::new(PixelRect::from_size(100, 60), 32, 32).unwrap()
    }

    #[test]
    fn test_full_range_matches_grid() {
        let range = TileRange::full(&grid_100x60());
        assert_eq!(range.min_tile_x(), 0);
        assert_eq!(range.max_tile_x(), 3);
        assert_eq!(range.max_tile_y(), 1);
        assert_eq!(range.tile_count(), 8);
        assert!(range.is_multi_tiled());
    }

    #[test]
    fn test_roi_outside_is_empty() {
        let roi = Roi::Region(PixelRect::new(1000, 1000, 10, 10));
        let range = TileRange::compute(&grid_100x60(), &roi).unwrap();
        assert!(range.is_empty());
        assert_eq!(range.tile_count(), 0);
        assert!(!range.is_multi_tiled());
        assert_eq!(range.iter().count(), 0);
    }

    #[test]
    fn test_single_pixel_roi() {
        let roi = Roi::Region(PixelRect::new(33, 33, 1, 1));
        let range = TileRange::compute(&grid_100x60(), &roi).unwrap();
        assert_eq!((range.min_tile_x(), range.min_tile_y()), (1, 1));
        assert_eq!((range.max_tile_x(), range.max_tile_y()), (1, 1));
        assert_eq!(range.tile_count(), 1);
        assert!(!range.is_multi_tiled());
    }

    #[test]
    fn test_roi_spanning_tile_boundary() {
        let roi = Roi::Region(PixelRect::new(31, 0, 2, 1));
        let range = TileRange::compute(&grid_100x60(), &roi).unwrap();
        assert_eq!(range.min_tile_x(), 0);
        assert_eq!(range.max_tile_x(), 1);
        assert_eq!(range.num_tiles_y(), 1);
    }

    #[test]
    fn test_roi_clipped_to_bounds() {
        // Extends past the right edge; clipped before tile mapping.
        let roi = Roi::Region(PixelRect::new(90, 0, 100, 100));
        let range = TileRange::compute(&grid_100x60(), &roi).unwrap();
        assert_eq!(range.min_tile_x(), 2);
        assert_eq!(range.max_tile_x(), 3);
        assert_eq!(range.max_tile_y(), 1);
    }

    #[test]
    fn test_negative_grid_offsets() {
        let bounds = PixelRect::new(-64, -64, 128, 128);
        let grid = TileGrid::with_min_tile(bounds, 32, 32, -2, -2).unwrap();
        let range = TileRange::full(&grid);
        assert_eq!(range.min_tile_x(), -2);
        assert_eq!(range.max_tile_x(), 1);

        let roi = Roi::Region(PixelRect::new(-1, -1, 2, 2));
        let range = TileRange::compute(&grid, &roi).unwrap();
        assert_eq!((range.min_tile_x(), range.min_tile_y()), (-1, -1));
        assert_eq!((range.max_tile_x(), range.max_tile_y()), (0, 0));
    }

    #[test]
    fn test_row_major_iteration() {
        let range = TileRange::full(&grid_100x60());
        let tiles: Vec<_> = range.iter().collect();
        assert_eq!(tiles.len(), 8);
        assert_eq!(tiles[0], (0, 0));
        assert_eq!(tiles[3], (3, 0));
        assert_eq!(tiles[4], (0, 1));
        assert_eq!(tiles[7], (3, 1));
    }

    #[test]
    fn test_iter_len() {
        let range = TileRange::full(&grid_100x60());
        let mut iter = range.iter();
        assert_eq!(iter.len(), 8);
        iter.next();
        assert_eq!(iter.len(), 7);
    }

    #[test]
    fn test_contains() {
        let range = TileRange::full(&grid_100x60());
        assert!(range.contains(0, 0));
        assert!(range.contains(3, 1));
        assert!(!range.contains(4, 0));
        assert!(!TileRange::EMPTY.contains(0, 0));
    }
}
