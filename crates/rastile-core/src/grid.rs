//! Tile grid geometry for grid-partitioned rasters.
//!
//! A [`TileGrid`] describes how an image's pixel bounds are partitioned
//! into a regular grid of tiles: the tile dimensions, the indices of the
//! first tile, and the derived tile counts and pixel offsets. It carries
//! geometry only; sample storage lives in [`crate::image::GridImage`] or in
//! whatever implements the tile access contracts.
//!
//! # Tile Addressing
//!
//! Tiles are addressed by signed 32-bit indices `(tx, ty)`. The grid is
//! anchored so that tile `(min_tile_x, min_tile_y)` covers the top-left
//! corner of the image bounds. Edge tiles may extend past the bounds; their
//! pixel rectangles are clipped.
//!
//! ```text
//! bounds.x
//!   │
//!   ┌────────┬────────┬────┐
//!   │ (0,0)  │ (1,0)  │(2,0)  ← last column clipped
//!   ├────────┼────────┼────┤
//!   │ (0,1)  │ (1,1)  │(2,1)
//!   └────────┴────────┴────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use rastile_core::{PixelRect, TileGrid};
//!
//! let grid = TileGrid::new(PixelRect::from_size(100, 60), 32, 32).unwrap();
//! assert_eq!(grid.num_tiles_x(), 4);
//! assert_eq!(grid.num_tiles_y(), 2);
//!
//! // Edge tiles are clipped to the image bounds.
//! let edge = grid.tile_rect(3, 1).unwrap();
//! assert_eq!(edge, PixelRect::new(96, 32, 4, 28));
//! ```
//!
//! # Used By
//!
//! - [`crate::image::GridImage`] - Storage layout
//! - `rastile-engine` - Tile range computation

use crate::{Error, PixelRect, Result};

/// Floor division for 64-bit pixel arithmetic, rounding toward negative
/// infinity. `b` must be positive.
#[inline]
pub(crate) const fn floor_div(a: i64, b: i64) -> i64 {
    let d = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        d - 1
    } else {
        d
    }
}

/// Geometry of a grid-partitioned raster.
///
/// Construction validates the grid eagerly: tile dimensions must be
/// non-zero, the bounds non-empty, and every tile index representable in
/// the signed 32-bit tile index space.
///
/// # Example
///
/// ```rust
/// use rastile_core::{PixelRect, TileGrid};
///
/// // A raster anchored at (-64, 0), tiled 64x64, first tile index (-1, 0).
/// let grid = TileGrid::with_min_tile(PixelRect::new(-64, 0, 192, 64), 64, 64, -1, 0).unwrap();
/// assert_eq!(grid.num_tiles_x(), 3);
/// assert_eq!(grid.tile_origin_x(-1), -64);
/// assert_eq!(grid.tile_x_at(-1), -1);
/// assert_eq!(grid.tile_x_at(0), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    /// Image bounds in pixel space.
    bounds: PixelRect,
    /// Tile width in pixels.
    tile_width: u32,
    /// Tile height in pixels.
    tile_height: u32,
    /// Index of the first tile column.
    min_tile_x: i32,
    /// Index of the first tile row.
    min_tile_y: i32,
}

impl TileGrid {
    /// Creates a grid whose first tile has index (0, 0).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGrid`] for empty bounds, zero tile
    /// dimensions, or a grid too large for 32-bit tile indices.
    pub fn new(bounds: PixelRect, tile_width: u32, tile_height: u32) -> Result<Self> {
        Self::with_min_tile(bounds, tile_width, tile_height, 0, 0)
    }

    /// Creates a grid with explicit minimum tile indices.
    ///
    /// Tile `(min_tile_x, min_tile_y)` is anchored at the top-left corner
    /// of `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGrid`] for empty bounds, zero tile
    /// dimensions, or a grid too large for 32-bit tile indices.
    pub fn with_min_tile(
        bounds: PixelRect,
        tile_width: u32,
        tile_height: u32,
        min_tile_x: i32,
        min_tile_y: i32,
    ) -> Result<Self> {
        if bounds.is_empty() {
            return Err(Error::invalid_grid(format!("empty image bounds {bounds}")));
        }
        if tile_width == 0 || tile_height == 0 {
            return Err(Error::invalid_grid(format!(
                "tile dimensions {tile_width}x{tile_height} must be non-zero"
            )));
        }
        let num_x = bounds.width.div_ceil(tile_width as u64);
        let num_y = bounds.height.div_ceil(tile_height as u64);
        if u32::try_from(num_x).is_err() || u32::try_from(num_y).is_err() {
            return Err(Error::invalid_grid(format!(
                "{num_x}x{num_y} tiles exceed the supported tile count"
            )));
        }
        let max_x = min_tile_x as i64 + num_x as i64 - 1;
        let max_y = min_tile_y as i64 + num_y as i64 - 1;
        if i32::try_from(max_x).is_err() || i32::try_from(max_y).is_err() {
            return Err(Error::invalid_grid(format!(
                "maximum tile index ({max_x}, {max_y}) exceeds the 32-bit tile index space"
            )));
        }
        Ok(Self {
            bounds,
            tile_width,
            tile_height,
            min_tile_x,
            min_tile_y,
        })
    }

    /// Returns the image bounds in pixel space.
    #[inline]
    pub const fn bounds(&self) -> &PixelRect {
        &self.bounds
    }

    /// Returns the tile width in pixels.
    #[inline]
    pub const fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Returns the tile height in pixels.
    #[inline]
    pub const fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Returns the index of the first tile column.
    #[inline]
    pub const fn min_tile_x(&self) -> i32 {
        self.min_tile_x
    }

    /// Returns the index of the first tile row.
    #[inline]
    pub const fn min_tile_y(&self) -> i32 {
        self.min_tile_y
    }

    /// Returns the number of tile columns.
    #[inline]
    pub const fn num_tiles_x(&self) -> u32 {
        self.bounds.width.div_ceil(self.tile_width as u64) as u32
    }

    /// Returns the number of tile rows.
    #[inline]
    pub const fn num_tiles_y(&self) -> u32 {
        self.bounds.height.div_ceil(self.tile_height as u64) as u32
    }

    /// Returns the index of the last tile column (inclusive).
    #[inline]
    pub const fn max_tile_x(&self) -> i32 {
        // Fits in i32 by construction, but the tile count alone may not.
        (self.min_tile_x as i64 + self.num_tiles_x() as i64 - 1) as i32
    }

    /// Returns the index of the last tile row (inclusive).
    #[inline]
    pub const fn max_tile_y(&self) -> i32 {
        (self.min_tile_y as i64 + self.num_tiles_y() as i64 - 1) as i32
    }

    /// Returns the total number of tiles in the grid.
    #[inline]
    pub const fn tile_count(&self) -> u64 {
        self.num_tiles_x() as u64 * self.num_tiles_y() as u64
    }

    /// Returns the pixel X coordinate where tile column 0 begins.
    ///
    /// May lie outside the image bounds when `min_tile_x` is non-zero.
    #[inline]
    pub const fn tile_grid_x_offset(&self) -> i64 {
        self.bounds.x - self.min_tile_x as i64 * self.tile_width as i64
    }

    /// Returns the pixel Y coordinate where tile row 0 begins.
    #[inline]
    pub const fn tile_grid_y_offset(&self) -> i64 {
        self.bounds.y - self.min_tile_y as i64 * self.tile_height as i64
    }

    /// Returns the pixel X coordinate of the left edge of tile column `tx`,
    /// not clipped to the image bounds.
    #[inline]
    pub const fn tile_origin_x(&self, tx: i32) -> i64 {
        self.tile_grid_x_offset() + tx as i64 * self.tile_width as i64
    }

    /// Returns the pixel Y coordinate of the top edge of tile row `ty`,
    /// not clipped to the image bounds.
    #[inline]
    pub const fn tile_origin_y(&self, ty: i32) -> i64 {
        self.tile_grid_y_offset() + ty as i64 * self.tile_height as i64
    }

    /// Maps a pixel X coordinate to its tile column index.
    ///
    /// Uses floor division, so coordinates left of tile column 0 map to
    /// negative indices. The result is not clipped to the grid.
    #[inline]
    pub const fn tile_x_at(&self, px: i64) -> i64 {
        floor_div(px - self.tile_grid_x_offset(), self.tile_width as i64)
    }

    /// Maps a pixel Y coordinate to its tile row index.
    #[inline]
    pub const fn tile_y_at(&self, py: i64) -> i64 {
        floor_div(py - self.tile_grid_y_offset(), self.tile_height as i64)
    }

    /// Returns `true` if `(tx, ty)` addresses a tile of this grid.
    #[inline]
    pub const fn contains_tile(&self, tx: i32, ty: i32) -> bool {
        tx >= self.min_tile_x
            && tx <= self.max_tile_x()
            && ty >= self.min_tile_y
            && ty <= self.max_tile_y()
    }

    /// Returns the pixel rectangle covered by tile `(tx, ty)`, clipped to
    /// the image bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TileOutOfRange`] if the indices are outside the
    /// grid.
    pub fn tile_rect(&self, tx: i32, ty: i32) -> Result<PixelRect> {
        if !self.contains_tile(tx, ty) {
            return Err(Error::TileOutOfRange {
                tx,
                ty,
                num_x: self.num_tiles_x(),
                num_y: self.num_tiles_y(),
            });
        }
        let full = PixelRect::new(
            self.tile_origin_x(tx),
            self.tile_origin_y(ty),
            self.tile_width as u64,
            self.tile_height as u64,
        );
        // In-grid tiles always overlap the bounds.
        Ok(full.intersect(&self.bounds).unwrap_or_default())
    }
}

impl std::fmt::Display for TileGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TileGrid({} tiles of {}x{} over {})",
            self.tile_count(),
            self.tile_width,
            self.tile_height,
            self.bounds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_div_rounds_toward_negative() {
        assert_eq!(floor_div(7, 4), 1);
        assert_eq!(floor_div(8, 4), 2);
        assert_eq!(floor_div(-1, 4), -1);
        assert_eq!(floor_div(-4, 4), -1);
        assert_eq!(floor_div(-5, 4), -2);
        assert_eq!(floor_div(0, 4), 0);
    }

    #[test]
    fn test_exact_tiling() {
        let grid = TileGrid::new(PixelRect::from_size(128, 64), 32, 32).unwrap();
        assert_eq!(grid.num_tiles_x(), 4);
        assert_eq!(grid.num_tiles_y(), 2);
        assert_eq!(grid.tile_count(), 8);
        assert_eq!(grid.max_tile_x(), 3);
        assert_eq!(grid.max_tile_y(), 1);
    }

    #[test]
    fn test_partial_edge_tiles() {
        let grid = TileGrid::new(PixelRect::from_size(100, 60), 32, 32).unwrap();
        assert_eq!(grid.num_tiles_x(), 4);
        assert_eq!(grid.num_tiles_y(), 2);
        assert_eq!(grid.tile_rect(0, 0).unwrap(), PixelRect::new(0, 0, 32, 32));
        assert_eq!(grid.tile_rect(3, 1).unwrap(), PixelRect::new(96, 32, 4, 28));
    }

    #[test]
    fn test_offset_grid() {
        let bounds = PixelRect::new(-64, 32, 192, 64);
        let grid = TileGrid::with_min_tile(bounds, 64, 64, -1, 2).unwrap();
        assert_eq!(grid.tile_grid_x_offset(), 0);
        assert_eq!(grid.tile_grid_y_offset(), 32 - 2 * 64);
        assert_eq!(grid.tile_origin_x(-1), -64);
        assert_eq!(grid.tile_origin_y(2), 32);
        assert_eq!(grid.max_tile_x(), 1);
        assert_eq!(grid.tile_x_at(-1), -1);
        assert_eq!(grid.tile_x_at(0), 0);
        assert_eq!(grid.tile_x_at(-65), -2);
    }

    #[test]
    fn test_rejects_zero_tile_size() {
        let err = TileGrid::new(PixelRect::from_size(10, 10), 0, 32).unwrap_err();
        assert!(matches!(err, Error::InvalidGrid { .. }));
    }

    #[test]
    fn test_rejects_empty_bounds() {
        let err = TileGrid::new(PixelRect::from_size(0, 10), 32, 32).unwrap_err();
        assert!(matches!(err, Error::InvalidGrid { .. }));
    }

    #[test]
    fn test_rejects_index_overflow() {
        let bounds = PixelRect::from_size(u32::MAX as u64 * 2, 1);
        let err = TileGrid::with_min_tile(bounds, 1, 1, 0, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidGrid { .. }));

        let bounds = PixelRect::from_size(256, 1);
        let err = TileGrid::with_min_tile(bounds, 1, 1, i32::MAX - 10, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidGrid { .. }));
    }

    #[test]
    fn test_tile_rect_out_of_range() {
        let grid = TileGrid::new(PixelRect::from_size(64, 64), 32, 32).unwrap();
        assert!(grid.tile_rect(2, 0).is_err());
        assert!(grid.tile_rect(-1, 0).is_err());
    }
}
