// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

/// Errors that can occur while configuring or running a grid search.
///
/// Everything except `Io` and `Other` is a configuration or data-shape
/// failure and aborts the search without partial results.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Coordinate arrays of an unstructured grid differ in length.
    #[error("coordinate length mismatch: axis '{axis}' has {got} points, expected {expected}")]
    CoordinateLengthMismatch {
        /// Name of the offending axis.
        axis: String,
        /// Length of the first axis.
        expected: usize,
        /// Length of the offending axis.
        got: usize,
    },
    /// Axis names and coordinate arrays do not pair up, or an axis is empty.
    #[error("invalid axes: {0}")]
    InvalidAxes(String),
    /// Iteration window `[start, stop)` does not fit the grid.
    #[error("invalid range [{start}, {stop}) for grid of {total} points")]
    InvalidRange {
        /// Requested start index.
        start: usize,
        /// Requested stop index.
        stop: usize,
        /// Total number of points available.
        total: usize,
    },
    /// Only grids starting at index zero can be partitioned.
    #[error("cannot partition a grid with start index {start} (must be 0)")]
    PartitionNonZeroStart {
        /// The grid's start index.
        start: usize,
    },
    /// Partition count must be at least one.
    #[error("invalid partition count: {0} (must be >= 1)")]
    InvalidPartitionCount(usize),
    /// The grid callback expects a different number of axes.
    #[error("callback expects {expected} coordinates but grid has {got} axes")]
    CallbackArity {
        /// Number of coordinates the callback consumes.
        expected: usize,
        /// Number of grid axes.
        got: usize,
    },
    /// Grid index outside the iteration window.
    #[error("index {index} outside grid window [{start}, {stop})")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Window start.
        start: usize,
        /// Window stop.
        stop: usize,
    },
    /// Time series of one station differ in sample count or interval.
    #[error("inconsistent time sampling at '{id}': {reason}")]
    InconsistentSampling {
        /// Station identifier.
        id: String,
        /// What differs.
        reason: String,
    },
    /// An elemental trace required by the active basis is absent.
    #[error("missing elemental trace {component}.{element} at '{id}'")]
    MissingElementalTrace {
        /// Station identifier.
        id: String,
        /// Output component.
        component: String,
        /// Source basis element.
        element: String,
    },
    /// Source vector length does not match the basis of the response store.
    #[error("source vector has {got} components, basis expects {expected}")]
    SourceLengthMismatch {
        /// Basis length.
        expected: usize,
        /// Provided length.
        got: usize,
    },
    /// Time-shift bounds are not finite or are reversed.
    #[error("invalid time-shift bounds [{min}, {max}]")]
    InvalidTimeShiftBounds {
        /// Lower bound in seconds.
        min: f64,
        /// Upper bound in seconds.
        max: f64,
    },
    /// Array shape does not match expected shape.
    #[error("shape mismatch at '{id}': expected {expected:?}, got {got:?}")]
    DataShape {
        /// Station identifier (or array name).
        id: String,
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Operation not allowed in the current search state.
    #[error("invalid search state: expected {expected}, found {found}")]
    InvalidState {
        /// The state the operation requires.
        expected: &'static str,
        /// The state the search was in.
        found: &'static str,
    },
    /// Unsupported file format (unrecognized extension).
    #[error("unsupported file format: {0}")]
    UnsupportedFileFormat(String),
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Other error with a descriptive message.
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results with SearchError.
pub type Result<T> = std::result::Result<T, SearchError>;
