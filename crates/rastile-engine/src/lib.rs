//! # rastile-engine
//!
//! Sequential and parallel tile sweeps over grid-partitioned rasters.
//!
//! This crate schedules a read or write operation over every tile of an
//! image region, optionally in parallel, and reduces per-tile results into
//! a single value under a unified error-handling contract. The image
//! itself is an external collaborator reached through the
//! [`TileSource`](rastile_core::TileSource) and
//! [`TileSink`](rastile_core::TileSink) contracts of `rastile-core`; the
//! engine borrows one tile at a time and never owns image lifetime.
//!
//! # Modules
//!
//! - [`range`] - The inclusive rectangle of tile indices a sweep visits
//! - [`collect`] - The supplier/fold/combine/finish reduction protocol
//! - [`executor`] - Sequential and parallel entry points
//! - [`error`] - Consolidated sweep errors
//!
//! # Example
//!
//! ```rust
//! use rastile_core::{GridImage, PixelRect, Roi, Tile, TileGrid, TileSource};
//! use rastile_engine::{Collector, TileExecutor};
//!
//! let grid = TileGrid::new(PixelRect::from_size(512, 512), 128, 128).unwrap();
//! let img: GridImage<f32> = GridImage::filled(grid, 1, 0.25).unwrap();
//!
//! // Find the maximum sample over a region of interest, in parallel.
//! let roi = Roi::Region(PixelRect::new(100, 100, 300, 300));
//! let exec = TileExecutor::new(img.grid(), roi).unwrap();
//! let max = exec
//!     .execute_on_readable(
//!         &img,
//!         Collector::new(
//!             || f32::NEG_INFINITY,
//!             |max: &mut f32, tile: Tile<'_, f32>| {
//!                 let r = *tile.rect();
//!                 for y in r.y..r.bottom() {
//!                     for x in r.x..r.right() {
//!                         *max = max.max(tile.sample(x, y, 0));
//!                     }
//!                 }
//!                 Ok(())
//!             },
//!             f32::max,
//!             |max| max,
//!         ),
//!         None,
//!     )
//!     .unwrap();
//! assert_eq!(max, 0.25);
//! ```
//!
//! # Failure Policies
//!
//! Read sweeps abandon remaining tiles on the first failure (the result
//! would be discarded anyway); write sweeps process every tile and surface
//! one consolidated [`ProcessError`] at the end, keeping the target image
//! as consistent as possible. See [`executor`] for the full contract.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod collect;
mod cursor;
pub mod error;
pub mod executor;
pub mod range;
mod sequential;
mod worker;

pub use collect::Collector;
pub use error::{AccessMode, BoxError, ProcessError, TileFailure, TileOpResult};
pub use executor::TileExecutor;
pub use range::{TileIter, TileRange};
