//! The tile sweep executor.
//!
//! [`TileExecutor`] applies a read or write operation to every tile of a
//! grid-partitioned raster intersecting a region of interest, either
//! sequentially or in parallel, and optionally reduces per-tile results
//! into one value.
//!
//! # Entry Points
//!
//! | Operation | Sequential | Parallel |
//! |---|---|---|
//! | Read, side effects only | [`read_from`](TileExecutor::read_from) | [`parallel_read_from`](TileExecutor::parallel_read_from) |
//! | Write, side effects only | [`write_to`](TileExecutor::write_to) | [`parallel_write_to`](TileExecutor::parallel_write_to) |
//! | Read, reduced result | [`execute_on_readable`](TileExecutor::execute_on_readable) | same |
//! | Write, reduced result | [`execute_on_writable`](TileExecutor::execute_on_writable) | same |
//!
//! The reducing entry points decide the degree of parallelism themselves:
//! with a single tile (or none) they run entirely on the calling thread.
//!
//! # Errors Management
//!
//! Failures fetching or processing a tile are consolidated into one
//! [`ProcessError`]: first failure primary, later ones suppressed. Read
//! sweeps stop claiming new tiles after the first failure unless an error
//! handler is supplied; write sweeps always process every tile. Failures
//! inside the combiner or finisher are programming defects and propagate
//! as panics.
//!
//! # Concurrency Requirements
//!
//! For the parallel entry points the per-tile callback runs on arbitrary
//! threads and must be `Sync`; the image's tile access must support
//! concurrent calls on disjoint tiles. Workers are dispatched into the
//! shared rayon pool and the calling thread participates as one more
//! worker, so a sweep uses at most `parallelism + 1` threads.
//!
//! # Example
//!
//! ```rust
//! use rastile_core::{GridImage, PixelRect, Roi, TileGrid, TileMut, TileSource};
//! use rastile_engine::TileExecutor;
//!
//! let grid = TileGrid::new(PixelRect::from_size(256, 256), 64, 64).unwrap();
//! let img: GridImage<f32> = GridImage::new(grid, 1).unwrap();
//!
//! // Fill every tile in parallel.
//! let exec = TileExecutor::new(img.grid(), Roi::Full).unwrap();
//! exec.parallel_write_to(&img, |mut tile: TileMut<'_, f32>| {
//!     tile.fill(1.0);
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(img.tile(0, 0).unwrap().sample(0, 0, 0), 1.0);
//! ```

use crate::collect::Collector;
use crate::cursor::Cursor;
use crate::error::{AccessMode, ProcessError, TileOpResult};
use crate::range::TileRange;
use crate::{sequential, worker};
use rastile_core::{Result, Roi, TileGrid, TileSink, TileSource};
use tracing::debug;

/// A read or write sweep over the tiles of an image region.
///
/// The executor is cheap to build: it resolves the region of interest to a
/// [`TileRange`] once and carries no other state, so one is typically
/// constructed per operation.
pub struct TileExecutor {
    range: TileRange,
    /// Upper bound on background workers for parallel sweeps.
    max_workers: usize,
}

impl TileExecutor {
    /// Creates an executor for the tiles of `grid` intersecting `roi`.
    ///
    /// A region of interest that misses the image yields an executor with
    /// an empty range; its sweeps visit zero tiles, which is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TileIndexOverflow`](rastile_core::Error::TileIndexOverflow)
    /// if the region maps to tile indices outside the 32-bit index space.
    pub fn new(grid: &TileGrid, roi: Roi) -> Result<Self> {
        Ok(Self {
            range: TileRange::compute(grid, &roi)?,
            max_workers: rayon::current_num_threads(),
        })
    }

    /// Caps the number of background workers used by parallel sweeps.
    ///
    /// The default cap is the rayon pool size. The calling thread always
    /// participates in addition to the cap; a cap of zero therefore means
    /// "run everything on the calling thread".
    #[must_use]
    pub fn with_parallelism(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Returns the range of tile indices this executor will visit.
    #[inline]
    pub fn tile_range(&self) -> &TileRange {
        &self.range
    }

    /// Returns the number of tiles this executor will visit.
    #[inline]
    pub fn tile_count(&self) -> u64 {
        self.range.tile_count()
    }

    /// Returns `true` if the sweep covers at least two tiles.
    #[inline]
    pub fn is_multi_tiled(&self) -> bool {
        self.range.is_multi_tiled()
    }

    /// Reads every tile sequentially on the calling thread.
    ///
    /// Stops at the first fetch or callback failure; remaining tiles are
    /// not processed. Suited to operations whose result is discarded on
    /// error.
    ///
    /// # Errors
    ///
    /// A single-failure [`ProcessError`] identifying the failing tile and
    /// preserving the original cause.
    pub fn read_from<I, P>(&self, source: &I, op: P) -> std::result::Result<(), ProcessError>
    where
        I: TileSource,
        P: for<'t> FnMut(I::Tile<'t>) -> TileOpResult,
    {
        sequential::read_from(&self.range, source, op)
    }

    /// Updates every tile sequentially on the calling thread.
    ///
    /// Each tile is acquired, passed to the callback, and released on
    /// every exit path. Failures do not stop the sweep; they are
    /// consolidated and raised after the last tile.
    ///
    /// # Errors
    ///
    /// A [`ProcessError`] whose primary is the first failure and whose
    /// suppressed list carries the rest.
    pub fn write_to<I, P>(&self, target: &I, op: P) -> std::result::Result<(), ProcessError>
    where
        I: TileSink,
        P: for<'t> FnMut(I::TileMut<'t>) -> TileOpResult,
    {
        sequential::write_to(&self.range, target, op)
    }

    /// Reads every tile, in parallel when the range spans several tiles.
    ///
    /// With zero or one tile this is exactly
    /// [`read_from`](TileExecutor::read_from): the thread-pool overhead is
    /// not justified for a single tile. Otherwise tiles are distributed
    /// over the worker pool; on the first failure no further tiles are
    /// claimed, but tiles already dispatched finish.
    ///
    /// The callback runs on arbitrary threads and must be `Sync`.
    pub fn parallel_read_from<I, P>(
        &self,
        source: &I,
        op: P,
    ) -> std::result::Result<(), ProcessError>
    where
        I: TileSource + Sync,
        P: for<'t> Fn(I::Tile<'t>) -> TileOpResult + Sync,
    {
        if self.is_multi_tiled() {
            self.dispatch_read(
                source,
                || (),
                |_: &mut (), tile| op(tile),
                |_, _| (),
                |_| (),
                None,
            )
        } else {
            self.read_from(source, op)
        }
    }

    /// Updates every tile, in parallel when the range spans several tiles.
    ///
    /// With zero or one tile this is exactly
    /// [`write_to`](TileExecutor::write_to). Failures never stop the
    /// sweep; the consolidated error is raised after all tiles finished.
    ///
    /// The callback runs on arbitrary threads and must be `Sync`.
    pub fn parallel_write_to<I, P>(
        &self,
        target: &I,
        op: P,
    ) -> std::result::Result<(), ProcessError>
    where
        I: TileSink + Sync,
        P: for<'t> Fn(I::TileMut<'t>) -> TileOpResult + Sync,
    {
        if self.is_multi_tiled() {
            self.dispatch_write(
                target,
                || (),
                |_: &mut (), tile| op(tile),
                |_, _| (),
                |_| (),
                None,
            )
        } else {
            self.write_to(target, op)
        }
    }

    /// Reads every tile and reduces per-tile results through a
    /// [`Collector`].
    ///
    /// Worker accumulators come from the collector's supplier (one per
    /// participating thread, used without synchronization), tiles are
    /// folded in on arbitrary threads, accumulators are combined pairwise
    /// in unspecified order, and the finisher runs once on the calling
    /// thread.
    ///
    /// # Errors Management
    ///
    /// With `error_handler == None`, the first failure stops further tile
    /// claims and is returned as `Err` after in-flight tiles finish. With
    /// a handler, processing continues through all tiles, the handler
    /// receives the consolidated error once, and the (possibly partial)
    /// result is returned as `Ok`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rastile_core::{GridImage, PixelRect, Roi, Tile, TileGrid, TileSource};
    /// use rastile_engine::{Collector, TileExecutor};
    ///
    /// let grid = TileGrid::new(PixelRect::from_size(128, 128), 32, 32).unwrap();
    /// let img: GridImage<u8> = GridImage::filled(grid, 1, 7).unwrap();
    ///
    /// let exec = TileExecutor::new(img.grid(), Roi::Full).unwrap();
    /// let tiles_seen = exec
    ///     .execute_on_readable(
    ///         &img,
    ///         Collector::new(
    ///             || 0u64,
    ///             |n: &mut u64, _tile: Tile<'_, u8>| {
    ///                 *n += 1;
    ///                 Ok(())
    ///             },
    ///             |a, b| a + b,
    ///             |a| a,
    ///         ),
    ///         None,
    ///     )
    ///     .unwrap();
    /// assert_eq!(tiles_seen, 16);
    /// ```
    pub fn execute_on_readable<I, A, R, S, P, C, F>(
        &self,
        source: &I,
        collector: Collector<S, P, C, F>,
        error_handler: Option<&mut dyn FnMut(ProcessError)>,
    ) -> std::result::Result<R, ProcessError>
    where
        I: TileSource + Sync,
        A: Send,
        S: Fn() -> A + Sync,
        P: for<'t> Fn(&mut A, I::Tile<'t>) -> TileOpResult + Sync,
        C: Fn(A, A) -> A + Sync,
        F: FnOnce(A) -> R,
    {
        let Collector {
            supply,
            fold,
            combine,
            finish,
        } = collector;
        self.dispatch_read(source, supply, fold, combine, finish, error_handler)
    }

    /// Updates every tile and reduces per-tile results through a
    /// [`Collector`].
    ///
    /// Like [`execute_on_readable`](TileExecutor::execute_on_readable),
    /// but tiles are acquired writable and released on every exit path,
    /// and failures never stop the sweep regardless of the handler: the
    /// consolidated error is surfaced only after all tiles finished.
    pub fn execute_on_writable<I, A, R, S, P, C, F>(
        &self,
        target: &I,
        collector: Collector<S, P, C, F>,
        error_handler: Option<&mut dyn FnMut(ProcessError)>,
    ) -> std::result::Result<R, ProcessError>
    where
        I: TileSink + Sync,
        A: Send,
        S: Fn() -> A + Sync,
        P: for<'t> Fn(&mut A, I::TileMut<'t>) -> TileOpResult + Sync,
        C: Fn(A, A) -> A + Sync,
        F: FnOnce(A) -> R,
    {
        let Collector {
            supply,
            fold,
            combine,
            finish,
        } = collector;
        self.dispatch_write(target, supply, fold, combine, finish, error_handler)
    }

    /// Parallel read dispatch: spawn background workers, run one inline,
    /// join, finish.
    fn dispatch_read<I, A, R, S, P, C, F>(
        &self,
        source: &I,
        supply: S,
        fold: P,
        combine: C,
        finish: F,
        error_handler: Option<&mut dyn FnMut(ProcessError)>,
    ) -> std::result::Result<R, ProcessError>
    where
        I: TileSource + Sync,
        A: Send,
        S: Fn() -> A + Sync,
        P: for<'t> Fn(&mut A, I::Tile<'t>) -> TileOpResult + Sync,
        C: Fn(A, A) -> A + Sync,
        F: FnOnce(A) -> R,
    {
        // Reads abandon remaining tiles on the first failure only when
        // the caller is not collecting errors through a handler.
        let stop_on_error = error_handler.is_none();
        let cursor = Cursor::new(&self.range, AccessMode::Read, stop_on_error, &combine);
        let background = cursor.suggested_workers(self.max_workers);
        debug!(tiles = self.range.tile_count(), background, "read sweep");
        if background == 0 {
            worker::run_reader(&cursor, source, &fold, supply());
        } else {
            rayon::in_place_scope(|scope| {
                for _ in 0..background {
                    let acc = supply();
                    let cursor = &cursor;
                    let fold = &fold;
                    scope.spawn(move |_| worker::run_reader(cursor, source, fold, acc));
                }
                worker::run_reader(&cursor, source, &fold, supply());
            });
        }
        cursor.finish(finish, error_handler)
    }

    /// Parallel write dispatch. Unlike reads, failures never stop the
    /// claim loop.
    fn dispatch_write<I, A, R, S, P, C, F>(
        &self,
        target: &I,
        supply: S,
        fold: P,
        combine: C,
        finish: F,
        error_handler: Option<&mut dyn FnMut(ProcessError)>,
    ) -> std::result::Result<R, ProcessError>
    where
        I: TileSink + Sync,
        A: Send,
        S: Fn() -> A + Sync,
        P: for<'t> Fn(&mut A, I::TileMut<'t>) -> TileOpResult + Sync,
        C: Fn(A, A) -> A + Sync,
        F: FnOnce(A) -> R,
    {
        let cursor = Cursor::new(&self.range, AccessMode::Write, false, &combine);
        let background = cursor.suggested_workers(self.max_workers);
        debug!(tiles = self.range.tile_count(), background, "write sweep");
        if background == 0 {
            worker::run_writer(&cursor, target, &fold, supply());
        } else {
            rayon::in_place_scope(|scope| {
                for _ in 0..background {
                    let acc = supply();
                    let cursor = &cursor;
                    let fold = &fold;
                    scope.spawn(move |_| worker::run_writer(cursor, target, fold, acc));
                }
                worker::run_writer(&cursor, target, &fold, supply());
            });
        }
        cursor.finish(finish, error_handler)
    }
}

impl std::fmt::Debug for TileExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileExecutor")
            .field("range", &self.range)
            .field("max_workers", &self.max_workers)
            .finish()
    }
}
