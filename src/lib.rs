// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Grid-search source estimation by waveform misfit.
//!
//! Candidate moment tensors and forces are laid out on a parameter grid,
//! turned into source vectors, combined with per-station elemental
//! responses into synthetic waveforms, and scored against observed data
//! with a cross-correlation aligned misfit. The search splits the grid
//! across worker threads, or across external workers via `partition`, and
//! returns one misfit per grid point in grid order.

#![warn(missing_docs)]

/// Observed waveforms.
pub mod dataset;
/// Error types for the library.
pub mod error;
/// Elemental responses and synthesis.
pub mod greens;
/// Regular and unstructured parameter grids.
pub mod grid;
/// File I/O for station bundles and search results.
pub mod io;
/// Uniform moment tensor and force parameterizations.
pub mod lune;
/// Waveform misfit with time-shift search.
pub mod misfit;
/// Parallel grid-search driver.
pub mod search;
/// Correlation and convolution kernels.
pub mod signal;
/// Station and origin metadata.
pub mod station;

pub use crate::dataset::{Dataset, StationData, Trace};
pub use crate::error::{Result, SearchError};
pub use crate::greens::{Component, Element, GreensTensor, GreensTensorList, SourceBasis};
pub use crate::grid::{Callback, ParameterGrid, RegularGrid, UnstructuredGrid};
pub use crate::misfit::{Misfit, Norm};
pub use crate::search::{GridSearch, ProgressInfo, SearchState};
pub use crate::station::{Origin, Station};
