//! The reduction protocol for tile sweeps.
//!
//! A [`Collector`] bundles the four functions a reducing sweep needs:
//!
//! - **supply** creates one fresh accumulator per worker thread. The
//!   accumulator is private to its worker and needs no synchronization; a
//!   worker may fold any number of tiles into it, including zero.
//! - **fold** is the per-tile callback. It receives the worker's
//!   accumulator and one borrowed tile, and mutates the accumulator in
//!   place.
//! - **combine** merges two workers' accumulators. Tile completion order
//!   is unordered across threads, so it must be associative and tolerate
//!   any pairing order.
//! - **finish** converts the fully combined accumulator into the final
//!   result, exactly once, on the calling thread.
//!
//! # Example
//!
//! ```rust
//! use rastile_core::{GridImage, PixelRect, Roi, Tile, TileGrid, TileSource};
//! use rastile_engine::{Collector, TileExecutor};
//!
//! let grid = TileGrid::new(PixelRect::from_size(100, 60), 32, 32).unwrap();
//! let img: GridImage<f32> = GridImage::filled(grid, 1, 2.0).unwrap();
//!
//! // Sum every sample inside each tile's visible rectangle.
//! let collector = Collector::new(
//!     || 0.0f64,
//!     |acc: &mut f64, tile: Tile<'_, f32>| {
//!         let r = *tile.rect();
//!         for y in r.y..r.bottom() {
//!             for x in r.x..r.right() {
//!                 *acc += tile.sample(x, y, 0) as f64;
//!             }
//!         }
//!         Ok(())
//!     },
//!     |a, b| a + b,
//!     |a| a,
//! );
//!
//! let exec = TileExecutor::new(img.grid(), Roi::Full).unwrap();
//! let sum = exec.execute_on_readable(&img, collector, None).unwrap();
//! assert_eq!(sum, 100.0 * 60.0 * 2.0);
//! ```

/// The (supply, fold, combine, finish) quadruple driving a reducing sweep.
///
/// The closure signatures are constrained by the executor entry points
/// ([`execute_on_readable`](crate::TileExecutor::execute_on_readable) and
/// [`execute_on_writable`](crate::TileExecutor::execute_on_writable)); this
/// type only carries them. When writing the fold closure inline, annotate
/// its tile parameter (for example `tile: Tile<'_, f32>`) so it is generic
/// over the tile borrow.
pub struct Collector<S, P, C, F> {
    pub(crate) supply: S,
    pub(crate) fold: P,
    pub(crate) combine: C,
    pub(crate) finish: F,
}

impl<S, P, C, F> Collector<S, P, C, F> {
    /// Bundles the four reduction functions.
    pub fn new(supply: S, fold: P, combine: C, finish: F) -> Self {
        Self {
            supply,
            fold,
            combine,
            finish,
        }
    }
}
