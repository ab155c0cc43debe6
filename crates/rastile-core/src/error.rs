//! Error types for tiled raster operations.
//!
//! This module provides the unified error type shared by the grid geometry,
//! the tile access contracts and the concrete image buffers.
//!
//! # Overview
//!
//! The [`Error`] enum covers the failure modes of:
//! - Tile grid construction and validation
//! - Tile addressing (indices outside the grid)
//! - Tile index arithmetic (ranges too large for 32-bit tile indices)
//! - Tile fetch and acquisition by image implementations
//!
//! # Usage
//!
//! ```rust
//! use rastile_core::{Error, Result};
//!
//! fn check_tile(tx: i32, ty: i32, num_x: u32, num_y: u32) -> Result<()> {
//!     if tx < 0 || ty < 0 || tx as u32 >= num_x || ty as u32 >= num_y {
//!         return Err(Error::TileOutOfRange { tx, ty, num_x, num_y });
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - Derive macro error implementation
//!
//! # Used By
//!
//! - [`crate::grid::TileGrid`] - Grid validation
//! - [`crate::image::GridImage`] - Tile addressing
//! - `rastile-engine` - Range computation and tile fetch reporting

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while addressing or fetching tiles.
///
/// This enum uses [`thiserror`] for automatic [`std::error::Error`] and
/// [`std::fmt::Display`] implementations.
#[derive(Debug, Error)]
pub enum Error {
    /// The tile grid parameters are inconsistent.
    ///
    /// Returned by [`crate::grid::TileGrid::new`] when a tile dimension is
    /// zero or the image extent is not representable as whole tiles.
    #[error("invalid tile grid: {reason}")]
    InvalidGrid {
        /// Which consistency check failed.
        reason: String,
    },

    /// Tile indices are outside the image's tile grid.
    #[error("tile ({tx}, {ty}) out of range for a {num_x}x{num_y} tile grid")]
    TileOutOfRange {
        /// X index of the requested tile.
        tx: i32,
        /// Y index of the requested tile.
        ty: i32,
        /// Number of tile columns in the grid.
        num_x: u32,
        /// Number of tile rows in the grid.
        num_y: u32,
    },

    /// A computed tile index does not fit in the 32-bit tile index space.
    ///
    /// Tile coordinates are computed in 64-bit pixel arithmetic and then
    /// narrowed; a region of interest far outside the addressable grid
    /// produces this error rather than a wrapped index.
    #[error("tile index {value} on the {axis} axis exceeds the 32-bit tile index space")]
    TileIndexOverflow {
        /// `"x"` or `"y"`.
        axis: &'static str,
        /// The 64-bit value that failed to narrow.
        value: i64,
    },

    /// An image implementation failed to produce the requested tile.
    ///
    /// Wraps the implementation-specific cause (decoding failure, I/O
    /// error, evicted cache entry) together with the tile coordinates.
    #[error("cannot fetch tile ({tx}, {ty})")]
    TileUnavailable {
        /// X index of the tile that could not be produced.
        tx: i32,
        /// Y index of the tile that could not be produced.
        ty: i32,
        /// Implementation-specific cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Creates an [`Error::InvalidGrid`] from anything displayable.
    pub fn invalid_grid(reason: impl Into<String>) -> Self {
        Error::InvalidGrid {
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::TileUnavailable`] wrapping an arbitrary cause.
    pub fn tile_unavailable(
        tx: i32,
        ty: i32,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::TileUnavailable {
            tx,
            ty,
            source: Box::new(source),
        }
    }
}
