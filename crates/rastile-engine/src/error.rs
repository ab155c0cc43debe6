//! Consolidated error types for tile sweeps.
//!
//! A sweep over many tiles can fail on more than one of them. Rather than
//! discarding everything after the first failure, the engine keeps the
//! first failure as the primary error and attaches later ones as
//! suppressed detail, so a caller sees one [`ProcessError`] describing the
//! whole sweep.
//!
//! # Overview
//!
//! - [`BoxError`] - The boxed cause type produced by tile callbacks
//! - [`TileOpResult`] - What a per-tile callback returns
//! - [`TileFailure`] - One failure attributed to a tile coordinate
//! - [`ProcessError`] - The consolidated error for a whole sweep
//!
//! Failures inside the combiner or finisher are programming defects, not
//! data-dependent tile failures; they surface as panics and never appear
//! here.

use thiserror::Error;

/// Boxed error type for operation-callback failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by per-tile callbacks.
///
/// Callbacks that compute something return it through their accumulator;
/// the `Result` only reports whether the tile was processed.
pub type TileOpResult = std::result::Result<(), BoxError>;

/// Whether a sweep reads tiles or updates them in place.
///
/// The two modes differ in failure policy (read aborts early by default,
/// write always completes the sweep) and in how the consolidated error
/// describes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Tiles are fetched read-only.
    Read,
    /// Tiles are acquired writable and released after the callback.
    Write,
}

/// One failure attributed to a specific tile.
#[derive(Debug, Error)]
#[error("tile ({tx}, {ty})")]
pub struct TileFailure {
    tx: i32,
    ty: i32,
    #[source]
    cause: BoxError,
}

impl TileFailure {
    /// Creates a failure record for tile `(tx, ty)`.
    pub fn new(tx: i32, ty: i32, cause: BoxError) -> Self {
        Self { tx, ty, cause }
    }

    /// Returns the indices of the tile that failed.
    #[inline]
    pub fn tile(&self) -> (i32, i32) {
        (self.tx, self.ty)
    }

    /// Returns the underlying cause.
    #[inline]
    pub fn cause(&self) -> &(dyn std::error::Error + 'static) {
        self.cause.as_ref()
    }
}

/// Consolidated error for a tile sweep.
///
/// The first failure observed is the primary one; every later failure is
/// kept as suppressed detail instead of being discarded. The display
/// message identifies the primary tile and the access mode
/// ("process" for reads, "update" for writes).
///
/// # Example
///
/// ```rust
/// use rastile_engine::{AccessMode, ProcessError, TileFailure};
///
/// let mut err = ProcessError::new(
///     AccessMode::Write,
///     TileFailure::new(1, 1, "bad samples".into()),
/// );
/// err.suppress(TileFailure::new(2, 1, "also bad".into()));
///
/// assert_eq!(err.to_string(), "cannot update tile (1, 1)");
/// assert_eq!(err.primary().tile(), (1, 1));
/// assert_eq!(err.suppressed().len(), 1);
/// ```
#[derive(Debug)]
pub struct ProcessError {
    mode: AccessMode,
    primary: TileFailure,
    suppressed: Vec<TileFailure>,
}

impl ProcessError {
    /// Creates a consolidated error from its first failure.
    pub fn new(mode: AccessMode, primary: TileFailure) -> Self {
        Self {
            mode,
            primary,
            suppressed: Vec::new(),
        }
    }

    /// Attaches a later failure as suppressed detail.
    pub fn suppress(&mut self, failure: TileFailure) {
        self.suppressed.push(failure);
    }

    /// Returns the access mode of the failed sweep.
    #[inline]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Returns the first failure.
    #[inline]
    pub fn primary(&self) -> &TileFailure {
        &self.primary
    }

    /// Returns the failures recorded after the first, in the order they
    /// were reported.
    #[inline]
    pub fn suppressed(&self) -> &[TileFailure] {
        &self.suppressed
    }

    /// Returns the total number of failed tiles.
    #[inline]
    pub fn failure_count(&self) -> usize {
        1 + self.suppressed.len()
    }
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (tx, ty) = self.primary.tile();
        match self.mode {
            AccessMode::Read => write!(f, "cannot process tile ({tx}, {ty})"),
            AccessMode::Write => write!(f, "cannot update tile ({tx}, {ty})"),
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.primary.cause())
    }
}
