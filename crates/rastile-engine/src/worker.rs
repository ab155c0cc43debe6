//! Worker loops for tile sweeps.
//!
//! One worker runs per participating thread. A worker owns its private
//! accumulator, so it needs no synchronization of its own: it pulls tile
//! indices from the shared [`Cursor`], processes each tile, and reports
//! failures back to the cursor instead of returning them. When the cursor
//! is exhausted, the worker turns its accumulator in for merging.
//!
//! The loop itself never fails: tile fetch and callback failures are
//! funneled through [`Cursor::record_failure`], and the worker simply
//! moves on to the next claim.

use crate::cursor::Cursor;
use crate::error::{BoxError, TileOpResult};
use rastile_core::{TileSink, TileSource};
use tracing::trace;

/// Releases an acquired writable tile when dropped, so the release runs
/// on every exit path of the callback, including failure and unwind.
pub(crate) struct ReleaseGuard<'a, I: TileSink> {
    target: &'a I,
    tx: i32,
    ty: i32,
}

impl<'a, I: TileSink> ReleaseGuard<'a, I> {
    pub(crate) fn new(target: &'a I, tx: i32, ty: i32) -> Self {
        Self { target, tx, ty }
    }
}

impl<I: TileSink> Drop for ReleaseGuard<'_, I> {
    fn drop(&mut self) {
        self.target.release_tile(self.tx, self.ty);
    }
}

/// Acquires, processes and releases one writable tile.
pub(crate) fn write_one<I, A, P>(target: &I, tx: i32, ty: i32, acc: &mut A, fold: &P) -> TileOpResult
where
    I: TileSink,
    P: for<'t> Fn(&mut A, I::TileMut<'t>) -> TileOpResult,
{
    let tile = target.acquire_tile(tx, ty)?;
    let _release = ReleaseGuard::new(target, tx, ty);
    fold(acc, tile)
}

/// Runs one read worker to cursor exhaustion.
pub(crate) fn run_reader<I, A, P, C>(cursor: &Cursor<'_, A, C>, source: &I, fold: &P, mut acc: A)
where
    I: TileSource,
    P: for<'t> Fn(&mut A, I::Tile<'t>) -> TileOpResult,
    C: Fn(A, A) -> A,
{
    while let Some((tx, ty)) = cursor.next() {
        trace!(tx, ty, "reading tile");
        let outcome = source
            .tile(tx, ty)
            .map_err(BoxError::from)
            .and_then(|tile| fold(&mut acc, tile));
        if let Err(cause) = outcome {
            cursor.record_failure(tx, ty, cause);
        }
    }
    cursor.merge(acc);
}

/// Runs one write worker to cursor exhaustion.
pub(crate) fn run_writer<I, A, P, C>(cursor: &Cursor<'_, A, C>, target: &I, fold: &P, mut acc: A)
where
    I: TileSink,
    P: for<'t> Fn(&mut A, I::TileMut<'t>) -> TileOpResult,
    C: Fn(A, A) -> A,
{
    while let Some((tx, ty)) = cursor.next() {
        trace!(tx, ty, "updating tile");
        if let Err(cause) = write_one(target, tx, ty, &mut acc, fold) {
            cursor.record_failure(tx, ty, cause);
        }
    }
    cursor.merge(acc);
}
