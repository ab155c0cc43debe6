//! # rastile-core
//!
//! Core types for tiled raster processing.
//!
//! This crate provides the foundational types used throughout the RASTILE
//! workspace:
//!
//! - [`PixelRect`], [`Roi`] - Pixel-space rectangles and regions of interest
//! - [`TileGrid`] - Geometry of a grid-partitioned raster
//! - [`Sample`] - Component types for tile buffers (u8, u16, f16, f32)
//! - [`TileSource`], [`TileSink`] - The access contracts the processing
//!   engine requires from images
//! - [`Tile`], [`TileMut`] - Borrowed tile views
//! - [`GridImage`] - In-memory tiled raster with per-tile locking
//!
//! ## Design Philosophy
//!
//! The engine in `rastile-engine` never owns image lifetime: it borrows
//! one tile at a time through the [`TileSource`]/[`TileSink`] contracts
//! and returns it before the next tile is claimed. Everything in this
//! crate exists to make that borrow cheap, concurrent for disjoint tiles,
//! and impossible to hold past a callback invocation.
//!
//! ## Crate Structure
//!
//! This crate is the foundation of the workspace and has no internal
//! dependencies:
//!
//! ```text
//! rastile-core (this crate)
//!    ^
//!    |
//!    +-- rastile-engine (tile sweep scheduling and reduction)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod grid;
pub mod image;
pub mod rect;
pub mod sample;
pub mod tile;

// Re-exports for convenience
pub use error::{Error, Result};
pub use grid::TileGrid;
pub use image::{GridImage, TileSink, TileSource};
pub use rect::{PixelRect, Roi};
pub use sample::Sample;
pub use tile::{Tile, TileMut};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use rastile_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::grid::TileGrid;
    pub use crate::image::{GridImage, TileSink, TileSource};
    pub use crate::rect::{PixelRect, Roi};
    pub use crate::sample::Sample;
    pub use crate::tile::{Tile, TileMut};
}
