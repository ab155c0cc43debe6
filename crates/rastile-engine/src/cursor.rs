//! The shared claim-and-merge point for worker threads.
//!
//! All workers of one parallel sweep share a single [`Cursor`]. It hands
//! out tile indices in row-major order no matter which thread asks, on the
//! assumption that when tile fetches trigger file reads, iteration order
//! corresponds to consecutive data and sequential reads are cheaper.
//!
//! The cursor is the only cross-thread mutable state of a sweep: an atomic
//! claim counter, plus one mutex guarding the combined accumulator and the
//! consolidated error. The mutex is entered once per worker completion and
//! once per failure, so contention stays negligible.

use crate::error::{AccessMode, BoxError, ProcessError, TileFailure};
use crate::range::TileRange;
use crossbeam_utils::CachePadded;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// Accumulator and error state merged under one lock.
struct SharedState<A> {
    /// Combined result of all finished workers, absent until the first
    /// worker turns in its accumulator.
    accumulator: Option<A>,
    /// First-seen failure with later ones attached as suppressed detail.
    error: Option<ProcessError>,
}

/// Tile indices of the next tile to process in a multi-threaded sweep,
/// plus the merge point for per-worker results and failures.
///
/// The linear claim counter maps to tile indices as
/// `tx = min_tile_x + index % tiles_per_row` and
/// `ty = min_tile_y + index / tiles_per_row`. Claims at or past the tile
/// count report no more work. Forcing the counter to `i64::MIN` makes
/// every later claim fail, which is how stop-on-error halts dispatch while
/// letting in-flight tiles finish.
pub(crate) struct Cursor<'c, A, C> {
    /// Claim counter; padded so claims do not false-share with neighbors.
    index: CachePadded<AtomicI64>,
    min_tile_x: i64,
    min_tile_y: i64,
    tiles_per_row: i64,
    /// Total number of tiles in the range.
    count: i64,
    /// Whether the first failure should stop further dispatch.
    stop_on_error: bool,
    mode: AccessMode,
    combine: &'c C,
    shared: Mutex<SharedState<A>>,
}

impl<'c, A, C: Fn(A, A) -> A> Cursor<'c, A, C> {
    pub(crate) fn new(
        range: &TileRange,
        mode: AccessMode,
        stop_on_error: bool,
        combine: &'c C,
    ) -> Self {
        Self {
            index: CachePadded::new(AtomicI64::new(0)),
            min_tile_x: range.min_tile_x() as i64,
            min_tile_y: range.min_tile_y() as i64,
            tiles_per_row: range.num_tiles_x().max(1) as i64,
            count: range.tile_count() as i64,
            stop_on_error,
            mode,
            combine,
            shared: Mutex::new(SharedState {
                accumulator: None,
                error: None,
            }),
        }
    }

    /// Claims the next tile in row-major order, or reports that there is
    /// no more work.
    ///
    /// Each index is handed out exactly once across all threads.
    pub(crate) fn next(&self) -> Option<(i32, i32)> {
        let index = self.index.fetch_add(1, Ordering::SeqCst);
        if index >= 0 && index < self.count {
            let tx = self.min_tile_x + index % self.tiles_per_row;
            let ty = self.min_tile_y + index / self.tiles_per_row;
            Some((tx as i32, ty as i32))
        } else {
            None
        }
    }

    /// Suggested number of background workers, excluding the calling
    /// thread, which always runs a worker itself.
    ///
    /// Never more than `cap`, never more than `tile_count - 1`, never
    /// negative.
    pub(crate) fn suggested_workers(&self, cap: usize) -> usize {
        let spare_tiles = self.count.max(0) as u64;
        spare_tiles.saturating_sub(1).min(cap as u64) as usize
    }

    /// Records a failure on tile `(tx, ty)`.
    ///
    /// In stop-on-error mode this also forces the claim counter to its
    /// sentinel so other workers promptly observe "no more work"; tiles
    /// already dispatched are allowed to finish.
    pub(crate) fn record_failure(&self, tx: i32, ty: i32, cause: BoxError) {
        if self.stop_on_error {
            self.index.store(i64::MIN, Ordering::SeqCst);
        }
        let mut shared = self.shared.lock().expect("cursor state poisoned");
        let failure = TileFailure::new(tx, ty, cause);
        match &mut shared.error {
            Some(error) => error.suppress(failure),
            None => shared.error = Some(ProcessError::new(self.mode, failure)),
        }
    }

    /// Merges a worker's final accumulator into the combined result.
    ///
    /// Invoked exactly once per worker, after its claim loop is exhausted.
    pub(crate) fn merge(&self, acc: A) {
        let mut shared = self.shared.lock().expect("cursor state poisoned");
        shared.accumulator = Some(match shared.accumulator.take() {
            Some(combined) => (self.combine)(combined, acc),
            None => acc,
        });
    }

    /// Computes the final result and surfaces the consolidated error.
    ///
    /// Called on the calling thread after every worker has completed. The
    /// finisher runs first; a recorded error is then either delivered to
    /// `handler` (returning the possibly partial result) or returned as
    /// `Err`.
    pub(crate) fn finish<R, F>(
        self,
        finisher: F,
        handler: Option<&mut dyn FnMut(ProcessError)>,
    ) -> Result<R, ProcessError>
    where
        F: FnOnce(A) -> R,
    {
        let shared = self
            .shared
            .into_inner()
            .expect("cursor state poisoned");
        // The calling thread always runs a worker, so a merged
        // accumulator exists even for an empty range.
        let acc = shared
            .accumulator
            .expect("no worker turned in an accumulator");
        let result = finisher(acc);
        match shared.error {
            None => Ok(result),
            Some(error) => match handler {
                Some(handler) => {
                    handler(error);
                    Ok(result)
                }
                None => Err(error),
            },
        }
    }
}

impl<A, C> std::fmt::Debug for Cursor<'_, A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.index.load(Ordering::SeqCst);
        let mut s = f.debug_struct("Cursor");
        if index >= 0 && index < self.count {
            let tx = self.min_tile_x + index % self.tiles_per_row;
            let ty = self.min_tile_y + index / self.tiles_per_row;
            s.field("tile", &(tx, ty));
        } else {
            s.field("tile", &"done");
        }
        s.field("count", &self.count)
            .field("stop_on_error", &self.stop_on_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rastile_core::{PixelRect, TileGrid};

    fn combine_unit(_: (), _: ()) {}

    fn range_4x2() -> TileRange {
        let grid = TileGrid::new(PixelRect::from_size(100, 60), 32, 32).unwrap();
        TileRange::full(&grid)
    }

    #[test]
    fn test_row_major_claim_order() {
        let range = range_4x2();
        let cursor = Cursor::new(&range, AccessMode::Read, true, &combine_unit);
        let claimed: Vec<_> = std::iter::from_fn(|| cursor.next()).collect();
        assert_eq!(claimed, range.iter().collect::<Vec<_>>());
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_claims_unique_across_threads() {
        let range = range_4x2();
        let combine = |mut a: Vec<(i32, i32)>, b: Vec<(i32, i32)>| {
            a.extend(b);
            a
        };
        let cursor = Cursor::new(&range, AccessMode::Read, true, &combine);

        std::thread::scope(|s| {
            for _ in 0..4 {
                let cursor = &cursor;
                s.spawn(move || {
                    let mut mine = Vec::new();
                    while let Some(tile) = cursor.next() {
                        mine.push(tile);
                    }
                    cursor.merge(mine);
                });
            }
        });

        let mut all = cursor
            .finish(|v| v, None)
            .expect("no failure recorded");
        all.sort();
        assert_eq!(all, range.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_stop_on_error_halts_dispatch() {
        let range = range_4x2();
        let cursor = Cursor::new(&range, AccessMode::Read, true, &combine_unit);
        assert!(cursor.next().is_some());
        cursor.record_failure(0, 0, "boom".into());
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_continue_on_error_keeps_dispatching() {
        let range = range_4x2();
        let cursor = Cursor::new(&range, AccessMode::Write, false, &combine_unit);
        assert!(cursor.next().is_some());
        cursor.record_failure(0, 0, "boom".into());
        assert!(cursor.next().is_some());
    }

    #[test]
    fn test_later_failures_are_suppressed() {
        let range = range_4x2();
        let cursor = Cursor::new(&range, AccessMode::Write, false, &combine_unit);
        cursor.record_failure(1, 0, "first".into());
        cursor.record_failure(3, 1, "second".into());
        cursor.merge(());
        let err = cursor.finish(|_| (), None).unwrap_err();
        assert_eq!(err.primary().tile(), (1, 0));
        assert_eq!(err.suppressed().len(), 1);
        assert_eq!(err.suppressed()[0].tile(), (3, 1));
    }

    #[test]
    fn test_handler_receives_error_and_result_survives() {
        let range = range_4x2();
        let combine = |a: u32, b: u32| a + b;
        let cursor = Cursor::new(&range, AccessMode::Read, false, &combine);
        cursor.merge(5);
        cursor.merge(7);
        cursor.record_failure(2, 0, "boom".into());
        let mut seen = None;
        let result = cursor
            .finish(|a| a * 2, Some(&mut |e| seen = Some(e)))
            .expect("handler mode returns the result");
        assert_eq!(result, 24);
        assert_eq!(seen.expect("handler invoked").primary().tile(), (2, 0));
    }

    #[test]
    fn test_suggested_workers_bounds() {
        let range = range_4x2();
        let cursor = Cursor::new(&range, AccessMode::Read, true, &combine_unit);
        assert_eq!(cursor.suggested_workers(16), 7);
        assert_eq!(cursor.suggested_workers(3), 3);
        assert_eq!(cursor.suggested_workers(0), 0);

        let empty = Cursor::new(&TileRange::EMPTY, AccessMode::Read, true, &combine_unit);
        assert_eq!(empty.suggested_workers(16), 0);
    }

    #[test]
    fn test_debug_shows_next_tile_then_done() {
        let range = range_4x2();
        let cursor = Cursor::new(&range, AccessMode::Read, true, &combine_unit);
        assert!(format!("{cursor:?}").contains("(0, 0)"));
        while cursor.next().is_some() {}
        assert!(format!("{cursor:?}").contains("done"));
    }
}
