//! Sequential tile sweeps on the calling thread.
//!
//! Both runners iterate the tile range in row-major order. They differ in
//! failure policy:
//!
//! - **Read** stops at the first failure. A failed read makes the result
//!   unusable, so processing the remaining tiles is wasted work.
//! - **Write** continues through all remaining tiles and raises the
//!   consolidated error only after the full sweep. A failed write leaves
//!   the target image partially mutated but still valid, and driving the
//!   sweep to completion keeps its state as consistent as possible.

use crate::error::{AccessMode, BoxError, ProcessError, TileFailure, TileOpResult};
use crate::range::TileRange;
use crate::worker;
use rastile_core::{TileSink, TileSource};

/// Reads every tile of `range` from `source`, aborting on the first
/// failure.
pub(crate) fn read_from<I, P>(range: &TileRange, source: &I, mut op: P) -> Result<(), ProcessError>
where
    I: TileSource,
    P: for<'t> FnMut(I::Tile<'t>) -> TileOpResult,
{
    for (tx, ty) in range.iter() {
        let outcome = source
            .tile(tx, ty)
            .map_err(BoxError::from)
            .and_then(|tile| op(tile));
        if let Err(cause) = outcome {
            return Err(ProcessError::new(
                AccessMode::Read,
                TileFailure::new(tx, ty, cause),
            ));
        }
    }
    Ok(())
}

/// Updates every tile of `range` in `target`, continuing past failures
/// and consolidating them.
///
/// Each acquired tile is released on every exit path of the callback.
pub(crate) fn write_to<I, P>(range: &TileRange, target: &I, mut op: P) -> Result<(), ProcessError>
where
    I: TileSink,
    P: for<'t> FnMut(I::TileMut<'t>) -> TileOpResult,
{
    let mut error: Option<ProcessError> = None;
    for (tx, ty) in range.iter() {
        let outcome = (|| -> TileOpResult {
            let tile = target.acquire_tile(tx, ty)?;
            let _release = worker::ReleaseGuard::new(target, tx, ty);
            op(tile)
        })();
        if let Err(cause) = outcome {
            let failure = TileFailure::new(tx, ty, cause);
            match &mut error {
                Some(error) => error.suppress(failure),
                None => error = Some(ProcessError::new(AccessMode::Write, failure)),
            }
        }
    }
    match error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
