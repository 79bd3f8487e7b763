// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use ndarray::Array2;
use rand::Rng;

use crate::error::{Result, SearchError};
use crate::lune::{open_interval, to_mij, to_rho, to_rtp, V_MAX, W_MAX};

/// Axis names of moment tensor grids.
pub const MT_DIMS: [&str; 6] = ["rho", "v", "w", "kappa", "sigma", "h"];

/// Axis names of force grids.
pub const FORCE_DIMS: [&str; 3] = ["F0", "phi", "h"];

/// Plain function mapping a raw grid point to another parameterization.
pub type PointMap = fn(&[f64]) -> Vec<f64>;

/// Mapping applied by `get` and `as_array` when reading out a point.
#[derive(Clone, Copy)]
pub enum Callback {
    /// `(rho, v, w, kappa, sigma, h)` to `(Mrr, Mtt, Mpp, Mrt, Mrp, Mtp)`.
    MomentTensor,
    /// `(F0, phi, h)` to `(Fr, Ft, Fp)`.
    Force,
    /// User-supplied mapping consuming `arity` coordinates.
    Custom {
        /// Number of coordinates consumed.
        arity: usize,
        /// The mapping.
        map: PointMap,
    },
}

impl Callback {
    /// Number of grid coordinates the mapping consumes.
    pub fn arity(&self) -> usize {
        match self {
            Callback::MomentTensor => 6,
            Callback::Force => 3,
            Callback::Custom { arity, .. } => *arity,
        }
    }

    /// Apply the mapping to a raw point.
    pub fn apply(&self, p: &[f64]) -> Vec<f64> {
        match self {
            Callback::MomentTensor => to_mij(p[0], p[1], p[2], p[3], p[4], p[5]).to_vec(),
            Callback::Force => to_rtp(p[0], p[1], p[2]).to_vec(),
            Callback::Custom { map, .. } => map(p),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::MomentTensor => write!(f, "MomentTensor"),
            Callback::Force => write!(f, "Force"),
            Callback::Custom { arity, .. } => write!(f, "Custom({})", arity),
        }
    }
}

/// Shared interface of regular and unstructured parameter grids.
///
/// Points are addressed by a global linear index in the window
/// `[start, stop)`. Partitioned sub-grids keep global indices, so results
/// from several workers concatenate back into grid order.
pub trait ParameterGrid: Send + Sync {
    /// Axis names.
    fn dims(&self) -> &[String];

    /// Per-axis coordinate arrays.
    fn coords(&self) -> &[Vec<f64>];

    /// Mapping applied by `get`, if any.
    fn callback(&self) -> Option<Callback>;

    /// First index of the iteration window.
    fn start(&self) -> usize;

    /// One past the last index of the iteration window.
    fn stop(&self) -> usize;

    /// Write the raw (unmapped) coordinates of point `i` into `out`.
    ///
    /// `i` must already be inside the window and `out` must have `ndim` slots.
    fn fill_point(&self, i: usize, out: &mut [f64]);

    /// Split into `nproc` contiguous sub-grids of `len / nproc` points each.
    ///
    /// The last `len % nproc` points belong to no sub-grid. Callers that need
    /// every point evaluated must size the grid to a multiple of `nproc`.
    fn partition(&self, nproc: usize) -> Result<Vec<Self>>
    where
        Self: Sized;

    /// Number of axes.
    fn ndim(&self) -> usize {
        self.dims().len()
    }

    /// Number of points in the window.
    fn len(&self) -> usize {
        self.stop() - self.start()
    }

    /// Whether the window is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw coordinates of point `i`, never mapped.
    fn get_raw(&self, i: usize) -> Result<Vec<f64>> {
        if i < self.start() || i >= self.stop() {
            return Err(SearchError::IndexOutOfRange {
                index: i,
                start: self.start(),
                stop: self.stop(),
            });
        }
        let mut point = vec![0.0; self.ndim()];
        self.fill_point(i, &mut point);
        Ok(point)
    }

    /// Point `i`, mapped through the callback when one is configured.
    fn get(&self, i: usize) -> Result<Vec<f64>> {
        let point = self.get_raw(i)?;
        Ok(match self.callback() {
            Some(cb) => cb.apply(&point),
            None => point,
        })
    }

    /// Point `i` as axis name to raw coordinate, in axis order.
    fn get_dict(&self, i: usize) -> Result<IndexMap<String, f64>> {
        let point = self.get_raw(i)?;
        Ok(self.dims().iter().cloned().zip(point).collect())
    }

    /// All points of the window as a `(len, width)` array, mapped like `get`.
    fn as_array(&self) -> Result<Array2<f64>> {
        let mut flat = Vec::new();
        let mut width = None;
        for i in self.start()..self.stop() {
            let row = self.get(i)?;
            match width {
                None => width = Some(row.len()),
                Some(w) if w != row.len() => {
                    return Err(SearchError::DataShape {
                        id: format!("grid point {}", i),
                        expected: vec![w],
                        got: vec![row.len()],
                    })
                }
                Some(_) => {}
            }
            flat.extend(row);
        }
        let width = width.unwrap_or(self.ndim());
        Array2::from_shape_vec((self.len(), width), flat)
            .map_err(|e| SearchError::Other(format!("shape error: {}", e)))
    }

    /// Restartable sequential iterator over mapped points.
    fn iter(&self) -> GridIter<'_, Self>
    where
        Self: Sized,
    {
        GridIter {
            grid: self,
            index: self.start(),
        }
    }

    /// Save axis coordinates together with named arrays defined on the grid.
    fn save(&self, path: &Path, items: &[(&str, &[f64])]) -> Result<()> {
        crate::io::save(path, self.dims(), self.coords(), items)
    }
}

/// Sequential cursor over a grid window.
///
/// After returning `None` the cursor rewinds to `start`, so the next call
/// to `next` begins a fresh pass. A cursor is not meant to be shared; take
/// one per consumer.
pub struct GridIter<'a, G: ParameterGrid> {
    grid: &'a G,
    index: usize,
}

impl<G: ParameterGrid> GridIter<'_, G> {
    /// Index of the point the next call to `next` returns.
    pub fn position(&self) -> usize {
        self.index
    }
}

impl<G: ParameterGrid> Iterator for GridIter<'_, G> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        if self.index >= self.grid.stop() {
            self.index = self.grid.start();
            return None;
        }
        let point = self.grid.get(self.index).ok();
        self.index += 1;
        point
    }
}

fn axis_names(dims: &[&str], naxes: usize) -> Result<Vec<String>> {
    if dims.len() != naxes {
        return Err(SearchError::InvalidAxes(format!(
            "{} names for {} coordinate arrays",
            dims.len(),
            naxes
        )));
    }
    if naxes == 0 {
        return Err(SearchError::InvalidAxes("grid has no axes".to_string()));
    }
    Ok(dims.iter().map(|d| d.to_string()).collect())
}

fn check_callback(callback: &Callback, ndim: usize) -> Result<()> {
    if callback.arity() != ndim {
        return Err(SearchError::CallbackArity {
            expected: callback.arity(),
            got: ndim,
        });
    }
    Ok(())
}

fn check_nproc(start: usize, nproc: usize) -> Result<()> {
    if start != 0 {
        return Err(SearchError::PartitionNonZeroStart { start });
    }
    if nproc == 0 {
        return Err(SearchError::InvalidPartitionCount(nproc));
    }
    Ok(())
}

/// Cartesian product of per-axis coordinate arrays.
///
/// Linear indices decode mixed-radix with the first axis varying fastest.
#[derive(Debug, Clone)]
pub struct RegularGrid {
    dims: Vec<String>,
    coords: Vec<Vec<f64>>,
    shape: Vec<usize>,
    start: usize,
    stop: usize,
    callback: Option<Callback>,
}

impl RegularGrid {
    /// Create a grid spanning every combination of the given axes.
    ///
    /// # Errors
    /// Returns an error if the names and arrays do not pair up or an axis is empty.
    pub fn new(dims: &[&str], coords: Vec<Vec<f64>>) -> Result<Self> {
        let dims = axis_names(dims, coords.len())?;
        let shape: Vec<usize> = coords.iter().map(|c| c.len()).collect();
        if let Some(axis) = shape.iter().position(|&n| n == 0) {
            return Err(SearchError::InvalidAxes(format!(
                "axis '{}' has no coordinates",
                dims[axis]
            )));
        }
        let total = shape.iter().product();
        Ok(RegularGrid {
            dims,
            coords,
            shape,
            start: 0,
            stop: total,
            callback: None,
        })
    }

    /// Set the mapping applied by `get` (builder method).
    ///
    /// # Errors
    /// Returns an error if the mapping's arity differs from the number of axes.
    pub fn with_callback(mut self, callback: Callback) -> Result<Self> {
        check_callback(&callback, self.dims.len())?;
        self.callback = Some(callback);
        Ok(self)
    }

    /// Restrict iteration to `[start, stop)` (builder method).
    ///
    /// # Errors
    /// Returns an error unless `start <= stop <= total points`.
    pub fn with_range(mut self, start: usize, stop: usize) -> Result<Self> {
        let total = self.total();
        if start > stop || stop > total {
            return Err(SearchError::InvalidRange { start, stop, total });
        }
        self.start = start;
        self.stop = stop;
        Ok(self)
    }

    /// Number of points along each axis.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of points in the full product, ignoring the window.
    pub fn total(&self) -> usize {
        self.shape.iter().product()
    }

    /// Per-axis indices of linear index `i`.
    pub fn unravel(&self, i: usize) -> Vec<usize> {
        let mut remainder = i;
        self.shape
            .iter()
            .map(|&n| {
                let idx = remainder % n;
                remainder /= n;
                idx
            })
            .collect()
    }
}

impl ParameterGrid for RegularGrid {
    fn dims(&self) -> &[String] {
        &self.dims
    }

    fn coords(&self) -> &[Vec<f64>] {
        &self.coords
    }

    fn callback(&self) -> Option<Callback> {
        self.callback
    }

    fn start(&self) -> usize {
        self.start
    }

    fn stop(&self) -> usize {
        self.stop
    }

    fn fill_point(&self, i: usize, out: &mut [f64]) {
        let mut remainder = i;
        for (slot, axis) in out.iter_mut().zip(&self.coords) {
            *slot = axis[remainder % axis.len()];
            remainder /= axis.len();
        }
    }

    fn partition(&self, nproc: usize) -> Result<Vec<Self>> {
        check_nproc(self.start, nproc)?;
        let chunk = self.len() / nproc;
        Ok((0..nproc)
            .map(|rank| RegularGrid {
                start: rank * chunk,
                stop: (rank + 1) * chunk,
                ..self.clone()
            })
            .collect())
    }
}

/// Explicit list of points, one entry per index in each coordinate array.
///
/// The arrays hold exactly the points of the window: entry `k` is grid
/// index `start + k`.
#[derive(Debug, Clone)]
pub struct UnstructuredGrid {
    dims: Vec<String>,
    coords: Vec<Vec<f64>>,
    start: usize,
    stop: usize,
    callback: Option<Callback>,
}

impl UnstructuredGrid {
    /// Create a grid from equal-length coordinate arrays.
    ///
    /// # Errors
    /// Returns an error if the arrays differ in length or do not pair up with the names.
    pub fn new(dims: &[&str], coords: Vec<Vec<f64>>) -> Result<Self> {
        let dims = axis_names(dims, coords.len())?;
        let size = coords[0].len();
        for (name, array) in dims.iter().zip(&coords) {
            if array.len() != size {
                return Err(SearchError::CoordinateLengthMismatch {
                    axis: name.clone(),
                    expected: size,
                    got: array.len(),
                });
            }
        }
        Ok(UnstructuredGrid {
            dims,
            coords,
            start: 0,
            stop: size,
            callback: None,
        })
    }

    /// Set the mapping applied by `get` (builder method).
    ///
    /// # Errors
    /// Returns an error if the mapping's arity differs from the number of axes.
    pub fn with_callback(mut self, callback: Callback) -> Result<Self> {
        check_callback(&callback, self.dims.len())?;
        self.callback = Some(callback);
        Ok(self)
    }

    /// Restrict to `[start, stop)`, dropping the points outside (builder method).
    ///
    /// # Errors
    /// Returns an error unless the new window lies inside the current one.
    pub fn with_range(mut self, start: usize, stop: usize) -> Result<Self> {
        if start < self.start || start > stop || stop > self.stop {
            return Err(SearchError::InvalidRange {
                start,
                stop,
                total: self.stop,
            });
        }
        let (lo, hi) = (start - self.start, stop - self.start);
        for array in &mut self.coords {
            array.truncate(hi);
            array.drain(..lo);
        }
        self.start = start;
        self.stop = stop;
        Ok(self)
    }
}

impl ParameterGrid for UnstructuredGrid {
    fn dims(&self) -> &[String] {
        &self.dims
    }

    fn coords(&self) -> &[Vec<f64>] {
        &self.coords
    }

    fn callback(&self) -> Option<Callback> {
        self.callback
    }

    fn start(&self) -> usize {
        self.start
    }

    fn stop(&self) -> usize {
        self.stop
    }

    fn fill_point(&self, i: usize, out: &mut [f64]) {
        let k = i - self.start;
        for (slot, axis) in out.iter_mut().zip(&self.coords) {
            *slot = axis[k];
        }
    }

    fn partition(&self, nproc: usize) -> Result<Vec<Self>> {
        check_nproc(self.start, nproc)?;
        let chunk = self.len() / nproc;
        Ok((0..nproc)
            .map(|rank| {
                let (start, stop) = (rank * chunk, (rank + 1) * chunk);
                UnstructuredGrid {
                    dims: self.dims.clone(),
                    coords: self.coords.iter().map(|c| c[start..stop].to_vec()).collect(),
                    start,
                    stop,
                    callback: self.callback,
                }
            })
            .collect())
    }
}

fn rho_axis(magnitudes: &[f64]) -> Vec<f64> {
    magnitudes.iter().map(|&mw| to_rho(mw)).collect()
}

fn uniform(rng: &mut (impl Rng + ?Sized), lo: f64, hi: f64, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(lo..hi)).collect()
}

/// Repeat one draw per magnitude: `tile` copies the draw, `scale` repeats each value `npts` times.
fn tile_per_magnitude(draws: Vec<Vec<f64>>, scale: &[f64], npts: usize) -> Vec<Vec<f64>> {
    let mut coords = vec![scale.iter().flat_map(|&s| std::iter::repeat(s).take(npts)).collect()];
    coords.extend(draws.into_iter().map(|d| d.repeat(scale.len())));
    coords
}

/// Full moment tensor grid, regularly spaced in the uniform parameters.
///
/// Size is `magnitudes.len() * npts_per_axis^5`.
pub fn full_moment_tensor_grid_regular(
    magnitudes: &[f64],
    npts_per_axis: usize,
) -> Result<RegularGrid> {
    RegularGrid::new(
        &MT_DIMS,
        vec![
            rho_axis(magnitudes),
            open_interval(-V_MAX, V_MAX, npts_per_axis),
            open_interval(-W_MAX, W_MAX, npts_per_axis),
            open_interval(0.0, 360.0, npts_per_axis),
            open_interval(-90.0, 90.0, npts_per_axis),
            open_interval(0.0, 1.0, npts_per_axis),
        ],
    )?
    .with_callback(Callback::MomentTensor)
}

/// Full moment tensor grid drawn uniformly at random, `npts` per magnitude.
pub fn full_moment_tensor_grid_random(
    magnitudes: &[f64],
    npts: usize,
    rng: &mut (impl Rng + ?Sized),
) -> Result<UnstructuredGrid> {
    let draws = vec![
        uniform(rng, -V_MAX, V_MAX, npts),
        uniform(rng, -W_MAX, W_MAX, npts),
        uniform(rng, 0.0, 360.0, npts),
        uniform(rng, -90.0, 90.0, npts),
        uniform(rng, 0.0, 1.0, npts),
    ];
    UnstructuredGrid::new(&MT_DIMS, tile_per_magnitude(draws, &rho_axis(magnitudes), npts))?
        .with_callback(Callback::MomentTensor)
}

/// Double-couple grid, regularly spaced in strike, slip and dip cosine.
///
/// Size is `magnitudes.len() * npts_per_axis^3`.
pub fn double_couple_grid_regular(
    magnitudes: &[f64],
    npts_per_axis: usize,
) -> Result<RegularGrid> {
    RegularGrid::new(
        &MT_DIMS,
        vec![
            rho_axis(magnitudes),
            vec![0.0],
            vec![0.0],
            open_interval(0.0, 360.0, npts_per_axis),
            open_interval(-90.0, 90.0, npts_per_axis),
            open_interval(0.0, 1.0, npts_per_axis),
        ],
    )?
    .with_callback(Callback::MomentTensor)
}

/// Double-couple grid drawn uniformly at random, `npts` per magnitude.
pub fn double_couple_grid_random(
    magnitudes: &[f64],
    npts: usize,
    rng: &mut (impl Rng + ?Sized),
) -> Result<UnstructuredGrid> {
    let draws = vec![
        vec![0.0; npts],
        vec![0.0; npts],
        uniform(rng, 0.0, 360.0, npts),
        uniform(rng, -90.0, 90.0, npts),
        uniform(rng, 0.0, 1.0, npts),
    ];
    UnstructuredGrid::new(&MT_DIMS, tile_per_magnitude(draws, &rho_axis(magnitudes), npts))?
        .with_callback(Callback::MomentTensor)
}

/// Force grid, regularly spaced in azimuth and vertical cosine.
pub fn force_grid_regular(magnitudes_in_n: &[f64], npts_per_axis: usize) -> Result<RegularGrid> {
    RegularGrid::new(
        &FORCE_DIMS,
        vec![
            magnitudes_in_n.to_vec(),
            open_interval(0.0, 360.0, npts_per_axis),
            open_interval(-1.0, 1.0, npts_per_axis),
        ],
    )?
    .with_callback(Callback::Force)
}

/// Force grid drawn uniformly at random, `npts` per magnitude.
pub fn force_grid_random(
    magnitudes_in_n: &[f64],
    npts: usize,
    rng: &mut (impl Rng + ?Sized),
) -> Result<UnstructuredGrid> {
    let draws = vec![uniform(rng, 0.0, 360.0, npts), uniform(rng, -1.0, 1.0, npts)];
    UnstructuredGrid::new(&FORCE_DIMS, tile_per_magnitude(draws, magnitudes_in_n, npts))?
        .with_callback(Callback::Force)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn xy_grid() -> RegularGrid {
        RegularGrid::new(&["x", "y"], vec![vec![0.0, 1.0, 2.0], vec![10.0, 20.0]]).unwrap()
    }

    #[test]
    fn regular_decode_first_axis_fastest() {
        let grid = xy_grid();
        assert_eq!(grid.get(0).unwrap(), vec![0.0, 10.0]);
        assert_eq!(grid.get(1).unwrap(), vec![1.0, 10.0]);
        assert_eq!(grid.get(3).unwrap(), vec![0.0, 20.0]);
        assert_eq!(grid.get(5).unwrap(), vec![2.0, 20.0]);
        assert_eq!(grid.unravel(4), vec![1, 1]);
    }

    #[test]
    fn get_dict_preserves_axis_order() {
        let grid = xy_grid();
        let point = grid.get_dict(3).unwrap();
        let keys: Vec<&str> = point.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(point["x"], 0.0);
        assert_eq!(point["y"], 20.0);
    }

    #[test]
    fn regular_len_honours_start() {
        let grid = xy_grid();
        assert_eq!(grid.len(), 6);
        let grid = grid.with_range(2, 6).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.get(2).unwrap(), vec![2.0, 10.0]);
        assert!(matches!(
            grid.get(1),
            Err(SearchError::IndexOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn regular_invalid_range() {
        let result = xy_grid().with_range(0, 7);
        assert!(matches!(result, Err(SearchError::InvalidRange { .. })));
    }

    #[test]
    fn empty_axis_rejected() {
        let result = RegularGrid::new(&["x", "y"], vec![vec![1.0], vec![]]);
        assert!(matches!(result, Err(SearchError::InvalidAxes(_))));
    }

    #[test]
    fn unstructured_length_mismatch() {
        let result = UnstructuredGrid::new(&["a", "b"], vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(
            result,
            Err(SearchError::CoordinateLengthMismatch {
                expected: 2,
                got: 1,
                ..
            })
        ));
    }

    #[test]
    fn unstructured_range_indexes_from_start() {
        let grid = UnstructuredGrid::new(&["a"], vec![vec![5.0, 6.0, 7.0, 8.0]])
            .unwrap()
            .with_range(1, 4)
            .unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.get(1).unwrap(), vec![6.0]);
        assert_eq!(grid.get(3).unwrap(), vec![8.0]);
    }

    #[test]
    fn partition_rejects_non_zero_start() {
        let grid = xy_grid().with_range(1, 6).unwrap();
        assert!(matches!(
            grid.partition(2),
            Err(SearchError::PartitionNonZeroStart { start: 1 })
        ));
        assert!(matches!(
            xy_grid().partition(0),
            Err(SearchError::InvalidPartitionCount(0))
        ));
    }

    #[test]
    fn partition_drops_remainder() {
        let grid = UnstructuredGrid::new(&["a"], vec![(0..10).map(|i| i as f64).collect()]).unwrap();
        let parts = grid.partition(3).unwrap();
        assert_eq!(parts.len(), 3);
        let ranges: Vec<(usize, usize)> = parts.iter().map(|p| (p.start(), p.stop())).collect();
        assert_eq!(ranges, vec![(0, 3), (3, 6), (6, 9)]);
        assert_eq!(parts[2].get(8).unwrap(), vec![8.0]);
        assert!(parts.iter().all(|p| p.get(9).is_err()));
    }

    #[test]
    fn iterator_restarts_after_exhaustion() {
        let grid = xy_grid();
        let mut it = grid.iter();
        let first: Vec<Vec<f64>> = it.by_ref().collect();
        assert_eq!(first.len(), 6);
        assert_eq!(it.position(), 0);
        let second: Vec<Vec<f64>> = it.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn callback_arity_checked() {
        let result = xy_grid().with_callback(Callback::MomentTensor);
        assert!(matches!(
            result,
            Err(SearchError::CallbackArity {
                expected: 6,
                got: 2
            })
        ));
    }

    #[test]
    fn custom_callback_and_as_array() {
        fn sum(p: &[f64]) -> Vec<f64> {
            vec![p.iter().sum()]
        }
        let grid = xy_grid()
            .with_callback(Callback::Custom { arity: 2, map: sum })
            .unwrap();
        let array = grid.as_array().unwrap();
        assert_eq!(array.dim(), (6, 1));
        assert_eq!(array[[4, 0]], 21.0);
        // get_dict never maps
        assert_eq!(grid.get_dict(4).unwrap()["y"], 20.0);
    }

    #[test]
    fn double_couple_regular_size() {
        let grid = double_couple_grid_regular(&[4.0, 4.5], 5).unwrap();
        assert_eq!(grid.len(), 2 * 125);
        let mt = grid.get(17).unwrap();
        assert_eq!(mt.len(), 6);
        assert!((mt[0] + mt[1] + mt[2]).abs() < 1e-6 * to_rho(4.5));
    }

    #[test]
    fn random_grids_tile_per_magnitude() {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = full_moment_tensor_grid_random(&[4.0, 5.0], 100, &mut rng).unwrap();
        assert_eq!(grid.len(), 200);
        let a = grid.get_dict(3).unwrap();
        let b = grid.get_dict(103).unwrap();
        assert_eq!(a["kappa"], b["kappa"]);
        assert!((a["rho"] - to_rho(4.0)).abs() < 1e-6 * a["rho"]);
        assert!((b["rho"] - to_rho(5.0)).abs() < 1e-6 * b["rho"]);
        for i in 0..grid.len() {
            let p = grid.get_dict(i).unwrap();
            assert!(p["v"].abs() <= V_MAX && p["w"].abs() <= W_MAX);
            assert!((0.0..360.0).contains(&p["kappa"]));
        }

        let dc = double_couple_grid_random(&[4.0], 50, &mut rng).unwrap();
        assert!(dc.iter().all(|mt| (mt[0] + mt[1] + mt[2]).abs() < 1e-6 * to_rho(4.0)));
    }

    #[test]
    fn force_grids() {
        let grid = force_grid_regular(&[1.0, 2.0], 4).unwrap();
        assert_eq!(grid.len(), 32);
        let f = grid.get(31).unwrap();
        let norm = (f[0] * f[0] + f[1] * f[1] + f[2] * f[2]).sqrt();
        assert!((norm - 2.0).abs() < 1e-12);

        let mut rng = StdRng::seed_from_u64(1);
        let grid = force_grid_random(&[3.0], 20, &mut rng).unwrap();
        assert_eq!(grid.as_array().unwrap().dim(), (20, 3));
    }
}
