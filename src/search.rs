// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::dataset::{Dataset, StationData};
use crate::error::{Result, SearchError};
use crate::greens::{GreensTensor, GreensTensorList};
use crate::grid::ParameterGrid;
use crate::misfit::{ComponentFit, Misfit};

/// Progress information passed to the optional callback.
#[derive(Debug, Clone, Copy)]
pub struct ProgressInfo {
    /// Number of candidates evaluated so far.
    pub candidates_evaluated: u64,
    /// Number of candidates in the window being searched.
    pub total: usize,
    /// Elapsed time since the search started.
    pub elapsed: Duration,
}

/// Lifecycle of a [`GridSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Inputs bound, no results yet.
    Idle,
    /// Evaluating candidates.
    Running,
    /// Results complete and read-only.
    Done,
}

impl SearchState {
    fn name(&self) -> &'static str {
        match self {
            SearchState::Idle => "idle",
            SearchState::Running => "running",
            SearchState::Done => "done",
        }
    }
}

type ProgressCallback = Box<dyn Fn(ProgressInfo) + Send + Sync>;

struct ProgressTracker<'a> {
    callback: Option<&'a ProgressCallback>,
    interval_ms: u64,
    start: Instant,
    last_ms: AtomicU64,
    evaluated: AtomicU64,
    total: usize,
}

impl ProgressTracker<'_> {
    fn tick(&self) {
        let evaluated = self.evaluated.fetch_add(1, Ordering::Relaxed) + 1;
        let Some(cb) = self.callback else {
            return;
        };
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let last = self.last_ms.load(Ordering::Relaxed);
        if elapsed_ms >= last + self.interval_ms
            && self
                .last_ms
                .compare_exchange(last, elapsed_ms, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            cb(ProgressInfo {
                candidates_evaluated: evaluated,
                total: self.total,
                elapsed: self.start.elapsed(),
            });
        }
    }
}

/// Grid search over source parameters.
///
/// Each observed station is paired with the Green's tensor recorded at the
/// same station. For every grid point the source vector is synthesized at
/// each station and the station misfits are summed into the point's slot.
/// Slot `i` of the results always holds grid index `start + i`.
pub struct GridSearch {
    stations: Vec<(StationData, GreensTensor)>,
    misfit: Misfit,
    num_threads: Option<usize>,
    progress_interval: Duration,
    progress_callback: Option<ProgressCallback>,
    state: SearchState,
    results: Vec<f64>,
    offset: usize,
}

impl GridSearch {
    /// Bind observed data, Green's tensors and a misfit function.
    ///
    /// Every station's Green's tensor selects the observed components that
    /// belong to some time-shift group. Stations with no such component are
    /// dropped with a warning.
    ///
    /// # Errors
    /// Returns an error if a station has no Green's tensor, if sample
    /// intervals disagree, if a required elemental trace is missing, or if
    /// the elemental traces are not `npts + npts_padding` samples long.
    pub fn new(data: Dataset, greens: GreensTensorList, misfit: Misfit) -> Result<Self> {
        let mut stations = Vec::with_capacity(data.len());
        for observed in data.iter() {
            let id = observed.id();
            let mut tensor = greens
                .select_station(observed.station())
                .into_iter()
                .next()
                .cloned()
                .ok_or_else(|| {
                    SearchError::Other(format!("no Green's tensor for station '{}'", id))
                })?;

            if tensor.dt() != observed.dt() {
                return Err(SearchError::InconsistentSampling {
                    id,
                    reason: format!(
                        "observed dt {} differs from Green's tensor dt {}",
                        observed.dt(),
                        tensor.dt()
                    ),
                });
            }

            let components: Vec<_> = observed
                .components()
                .into_iter()
                .filter(|c| misfit.time_shift_groups().iter().any(|g| g.contains(c)))
                .collect();
            if !misfit.has_usable_components(observed, &components) {
                warn!(station = %id, "no usable components, skipping station");
                continue;
            }

            let expected = observed.npts() + misfit.npts_padding(observed.dt());
            if tensor.npts() != expected {
                return Err(SearchError::DataShape {
                    id,
                    expected: vec![expected],
                    got: vec![tensor.npts()],
                });
            }
            tensor.set_components(&components)?;
            stations.push((observed.clone(), tensor));
        }

        Ok(GridSearch {
            stations,
            misfit,
            num_threads: None,
            progress_interval: Duration::from_millis(500),
            progress_callback: None,
            state: SearchState::Idle,
            results: Vec::new(),
            offset: 0,
        })
    }

    /// Set the number of worker threads (builder method).
    /// If not specified, defaults to the number of available CPU cores.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Set a progress callback (builder method).
    /// The callback is invoked at most once per progress interval.
    pub fn with_progress(mut self, callback: Box<dyn Fn(ProgressInfo) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set the minimum time between progress callbacks (builder method).
    /// Default is 500 ms.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Number of stations taking part in the search.
    pub fn num_stations(&self) -> usize {
        self.stations.len()
    }

    /// Misfit function in use.
    pub fn misfit(&self) -> &Misfit {
        &self.misfit
    }

    fn get_num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Evaluate every point of `grid` and return the misfit per point.
    ///
    /// The window is split into contiguous chunks, one per worker, that
    /// together cover every index. Any error aborts the whole search, leaves
    /// no results behind and returns the search to `Idle`.
    ///
    /// # Errors
    /// Returns [`SearchError::InvalidState`] unless the search is `Idle`, or
    /// the first error raised while evaluating a candidate.
    pub fn run<G: ParameterGrid>(&mut self, grid: &G) -> Result<&[f64]> {
        if self.state != SearchState::Idle {
            return Err(SearchError::InvalidState {
                expected: SearchState::Idle.name(),
                found: self.state.name(),
            });
        }
        self.check_source_length(grid)?;
        self.state = SearchState::Running;
        match self.evaluate(grid) {
            Ok(results) => {
                self.results = results;
                self.offset = grid.start();
                self.state = SearchState::Done;
                Ok(&self.results)
            }
            Err(e) => {
                self.state = SearchState::Idle;
                Err(e)
            }
        }
    }

    /// Evaluate only sub-grid `rank` of `grid.partition(nproc)`.
    ///
    /// Results of all ranks, concatenated in rank order with
    /// [`gather`](Self::gather), line up with the grid's leading
    /// `nproc * (len / nproc)` indices.
    ///
    /// # Errors
    /// Returns an error if the grid cannot be partitioned, `rank >= nproc`,
    /// or [`run`](Self::run) fails.
    pub fn run_partition<G: ParameterGrid>(
        &mut self,
        grid: &G,
        rank: usize,
        nproc: usize,
    ) -> Result<&[f64]> {
        let part = grid
            .partition(nproc)?
            .into_iter()
            .nth(rank)
            .ok_or_else(|| {
                SearchError::Other(format!("rank {} out of range for {} workers", rank, nproc))
            })?;
        self.run(&part)
    }

    /// Concatenate per-rank results in rank order.
    pub fn gather(parts: Vec<Vec<f64>>) -> Vec<f64> {
        parts.concat()
    }

    /// Misfit per grid point of the last run.
    ///
    /// # Errors
    /// Returns [`SearchError::InvalidState`] before a run has completed.
    pub fn results(&self) -> Result<&[f64]> {
        self.require_done()?;
        Ok(&self.results)
    }

    /// Take ownership of the results, returning the search to `Idle`.
    ///
    /// # Errors
    /// Returns [`SearchError::InvalidState`] before a run has completed.
    pub fn take_results(&mut self) -> Result<Vec<f64>> {
        self.require_done()?;
        self.state = SearchState::Idle;
        Ok(std::mem::take(&mut self.results))
    }

    /// Global grid index and value of the smallest misfit; first on ties.
    ///
    /// # Errors
    /// Returns an error before a run has completed or when the window was empty.
    pub fn best(&self) -> Result<(usize, f64)> {
        self.require_done()?;
        let mut best: Option<(usize, f64)> = None;
        for (i, &value) in self.results.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, b)| value < b) {
                best = Some((i, value));
            }
        }
        best.map(|(i, v)| (self.offset + i, v))
            .ok_or_else(|| SearchError::Other("no candidates were evaluated".to_string()))
    }

    /// Per-station, per-component alignment and misfit for one source vector.
    ///
    /// # Errors
    /// Returns synthesis or misfit errors.
    pub fn explain(&self, source: &[f64]) -> Result<Vec<(String, Vec<ComponentFit>)>> {
        self.stations
            .iter()
            .map(|(observed, tensor)| {
                let synthetics = tensor.synthesize(source)?;
                let fits = self.misfit.explain_station(
                    observed,
                    synthetics.view(),
                    tensor.components(),
                )?;
                Ok((observed.id(), fits))
            })
            .collect()
    }

    fn check_source_length<G: ParameterGrid>(&self, grid: &G) -> Result<()> {
        if grid.is_empty() {
            return Ok(());
        }
        let got = grid.get(grid.start())?.len();
        for (_, tensor) in &self.stations {
            let expected = tensor.basis().len();
            if got != expected {
                return Err(SearchError::SourceLengthMismatch { expected, got });
            }
        }
        Ok(())
    }

    fn require_done(&self) -> Result<()> {
        if self.state != SearchState::Done {
            return Err(SearchError::InvalidState {
                expected: SearchState::Done.name(),
                found: self.state.name(),
            });
        }
        Ok(())
    }

    fn evaluate<G: ParameterGrid>(&self, grid: &G) -> Result<Vec<f64>> {
        let total = grid.len();
        let num_threads = self.get_num_threads().max(1);
        let chunk_size = total.div_ceil(num_threads).max(1);
        info!(
            candidates = total,
            stations = self.stations.len(),
            threads = num_threads,
            norm = %self.misfit.norm(),
            "starting grid search"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| SearchError::Other(e.to_string()))?;

        let tracker = ProgressTracker {
            callback: self.progress_callback.as_ref(),
            interval_ms: self.progress_interval.as_millis() as u64,
            start: Instant::now(),
            last_ms: AtomicU64::new(0),
            evaluated: AtomicU64::new(0),
            total,
        };

        let mut results = vec![0.0; total];
        let start = grid.start();
        pool.install(|| {
            results
                .par_chunks_mut(chunk_size)
                .enumerate()
                .try_for_each(|(k, chunk)| {
                    self.evaluate_chunk(grid, start + k * chunk_size, chunk, &tracker)
                })
        })?;

        info!(
            candidates = total,
            elapsed_s = tracker.start.elapsed().as_secs_f64(),
            "grid search finished"
        );
        Ok(results)
    }

    fn evaluate_chunk<G: ParameterGrid>(
        &self,
        grid: &G,
        first: usize,
        out: &mut [f64],
        tracker: &ProgressTracker<'_>,
    ) -> Result<()> {
        debug!(first, len = out.len(), "evaluating chunk");
        // private per-worker synthesis buffers
        let mut scratch: Vec<Array2<f64>> = self
            .stations
            .iter()
            .map(|(_, tensor)| tensor.allocate_synthetics())
            .collect();

        for (offset, slot) in out.iter_mut().enumerate() {
            let source = grid.get(first + offset)?;
            let mut total = 0.0;
            for ((observed, tensor), buffer) in self.stations.iter().zip(&mut scratch) {
                tensor.synthesize_into(&source, buffer)?;
                total += self
                    .misfit
                    .evaluate_station(observed, buffer.view(), tensor.components())?;
            }
            *slot = total;
            tracker.tick();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Trace;
    use crate::greens::tests::{coded_traces, origin};
    use crate::greens::{Component, ElementalTrace, SourceBasis};
    use crate::grid::{RegularGrid, UnstructuredGrid};
    use crate::misfit::Norm;
    use crate::station::Station;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    /// One station whose Z elemental traces are unit impulses at distinct
    /// samples, so the synthetic is a sum of scaled impulses.
    fn impulse_setup(observed_source: [f64; 6]) -> (Dataset, GreensTensorList) {
        let station = Station::new("XX", "IMP", 0.0, 1.0);
        let npts = 12;
        let traces: Vec<ElementalTrace> = SourceBasis::MomentTensor
            .elements()
            .iter()
            .enumerate()
            .map(|(k, &element)| {
                let mut data = vec![0.0; npts];
                data[3 + k] = 1.0;
                ElementalTrace {
                    component: Component::Z,
                    element,
                    dt: 1.0,
                    data,
                }
            })
            .collect();
        let tensor =
            GreensTensor::new(station.clone(), origin(), SourceBasis::MomentTensor, traces)
                .unwrap();

        let mut z = vec![0.0; npts];
        for (k, &m) in observed_source.iter().enumerate() {
            z[3 + k] = m;
        }
        let observed = StationData::new(station, 1.0, vec![Trace::new(Component::Z, z)]).unwrap();
        (
            std::iter::once(observed).collect(),
            std::iter::once(tensor).collect(),
        )
    }

    fn candidate_grid() -> UnstructuredGrid {
        // candidate 2 matches the observed source
        UnstructuredGrid::new(
            &["a", "b", "c", "d", "e", "f"],
            vec![
                vec![0.0, 1.0, 1.0, 2.0, 0.0],
                vec![0.0, 0.0, 2.0, 0.0, 0.0],
                vec![1.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, -1.0, 0.0, 5.0],
            ],
        )
        .unwrap()
    }

    fn search(threads: usize) -> GridSearch {
        let (data, greens) = impulse_setup([1.0, 2.0, 0.0, 0.0, 0.0, -1.0]);
        let misfit = Misfit::new(Norm::L2, &["Z"], 0.0, 0.0).unwrap();
        GridSearch::new(data, greens, misfit)
            .unwrap()
            .with_threads(threads)
    }

    #[test]
    fn finds_matching_candidate() {
        let mut s = search(2);
        let grid = candidate_grid();
        let results = s.run(&grid).unwrap().to_vec();
        assert_eq!(results.len(), 5);
        assert_eq!(results[2], 0.0);
        // candidate 0: residual (-1, -2, 1, 0, 0, 1)
        assert!((results[0] - 7.0).abs() < 1e-12);
        assert_eq!(s.best().unwrap(), (2, 0.0));
        assert_eq!(s.state(), SearchState::Done);
    }

    #[test]
    fn thread_count_does_not_change_results() {
        let grid = candidate_grid();
        let one = search(1).run(&grid).unwrap().to_vec();
        for threads in [2, 3, 8] {
            let many = search(threads).run(&grid).unwrap().to_vec();
            assert_eq!(one, many);
        }
    }

    #[test]
    fn rerun_requires_idle() {
        let mut s = search(1);
        let grid = candidate_grid();
        s.run(&grid).unwrap();
        assert!(matches!(
            s.run(&grid),
            Err(SearchError::InvalidState {
                expected: "idle",
                found: "done"
            })
        ));
        let taken = s.take_results().unwrap();
        assert_eq!(taken.len(), 5);
        assert_eq!(s.state(), SearchState::Idle);
        assert!(s.results().is_err());
    }

    #[test]
    fn partitions_gather_in_rank_order() {
        let grid = RegularGrid::new(
            &["a", "b", "c", "d", "e", "f"],
            vec![
                vec![0.0, 1.0],
                vec![0.0, 2.0],
                vec![1.0, 0.0],
                vec![0.0],
                vec![0.0],
                vec![-1.0, 0.0],
            ],
        )
        .unwrap();
        let full = search(2).run(&grid).unwrap().to_vec();
        let nproc = 3;
        let parts: Vec<Vec<f64>> = (0..nproc)
            .map(|rank| search(1).run_partition(&grid, rank, nproc).unwrap().to_vec())
            .collect();
        let gathered = GridSearch::gather(parts);
        // 16 points, 3 workers: the last point is dropped
        assert_eq!(gathered.len(), 15);
        assert_eq!(&full[..15], gathered.as_slice());
        assert!(search(1).run_partition(&grid, 3, 3).is_err());
    }

    #[test]
    fn best_reports_global_index() {
        let grid = candidate_grid().with_range(1, 4).unwrap();
        let mut s = search(1);
        s.run(&grid).unwrap();
        assert_eq!(s.best().unwrap(), (2, 0.0));
    }

    #[test]
    fn source_length_mismatch_rejected_before_evaluation() {
        let grid = RegularGrid::new(&["x", "y"], vec![vec![1.0, 2.0], vec![2.0]]).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut s = search(2)
            .with_progress_interval(Duration::ZERO)
            .with_progress(Box::new(move |_: ProgressInfo| {
                seen.fetch_add(1, Ordering::Relaxed);
            }));
        assert!(matches!(
            s.run(&grid),
            Err(SearchError::SourceLengthMismatch {
                expected: 6,
                got: 2
            })
        ));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert_eq!(s.state(), SearchState::Idle);
        assert!(s.results().is_err());
    }

    #[test]
    fn station_without_components_is_skipped() {
        let (data, greens) = impulse_setup([0.0; 6]);
        let misfit = Misfit::new(Norm::L2, &["T"], 0.0, 0.0).unwrap();
        let mut s = GridSearch::new(data, greens, misfit).unwrap();
        assert_eq!(s.num_stations(), 0);
        let results = s.run(&candidate_grid()).unwrap();
        assert!(results.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn short_greens_rejected() {
        let (data, greens) = impulse_setup([0.0; 6]);
        let misfit = Misfit::new(Norm::L2, &["Z"], -1.0, 1.0).unwrap();
        assert!(matches!(
            GridSearch::new(data, greens, misfit),
            Err(SearchError::DataShape { .. })
        ));
    }

    #[test]
    fn missing_greens_rejected() {
        let (data, _) = impulse_setup([0.0; 6]);
        let other = GreensTensor::new(
            Station::new("XX", "ELSE", 0.0, 2.0),
            origin(),
            SourceBasis::MomentTensor,
            coded_traces(12, SourceBasis::MomentTensor),
        )
        .unwrap();
        let misfit = Misfit::new(Norm::L2, &["Z"], 0.0, 0.0).unwrap();
        assert!(GridSearch::new(data, std::iter::once(other).collect(), misfit).is_err());
    }

    #[test]
    fn explain_matches_run() {
        let mut s = search(1);
        let grid = candidate_grid();
        let results = s.run(&grid).unwrap().to_vec();
        let source = grid.get(0).unwrap();
        let fits = s.explain(&source).unwrap();
        assert_eq!(fits.len(), 1);
        let total: f64 = fits[0].1.iter().map(|f| f.misfit).sum();
        assert!((total - results[0]).abs() < 1e-12);
    }

    #[test]
    fn progress_callback_fires() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut s = search(2)
            .with_progress_interval(Duration::ZERO)
            .with_progress(Box::new(move |info: ProgressInfo| {
                assert_eq!(info.total, 5);
                seen.fetch_add(1, Ordering::Relaxed);
            }));
        s.run(&candidate_grid()).unwrap();
        assert!(calls.load(Ordering::Relaxed) >= 1);
    }
}
