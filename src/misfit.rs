// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Waveform misfit with a cross-correlation time-shift search.
//!
//! Synthetics are longer than the observed series by
//! `npts_padding = round(time_shift_max / dt) + round(-time_shift_min / dt)`
//! samples. For each group of components, the summed valid-mode
//! cross-correlation picks one alignment that applies to every component of
//! the group; the aligned residuals are then reduced with the chosen norm.

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;

use crate::dataset::StationData;
use crate::error::{Result, SearchError};
use crate::greens::Component;
use crate::signal::{argmax, correlate_valid_add};

/// Residual norm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Norm {
    /// `sum(|r|) * dt`
    L1,
    /// `sum(r^2) * dt`
    #[default]
    L2,
    /// `sqrt(sum(r^2)) * dt`
    Hybrid,
}

impl Norm {
    /// Reduce the residual between two equally long series.
    pub fn residual(&self, synthetic: &[f64], observed: &[f64], dt: f64) -> f64 {
        let r = synthetic.iter().zip(observed).map(|(s, o)| s - o);
        match self {
            Norm::L1 => r.map(f64::abs).sum::<f64>() * dt,
            Norm::L2 => r.map(|x| x * x).sum::<f64>() * dt,
            Norm::Hybrid => r.map(|x| x * x).sum::<f64>().sqrt() * dt,
        }
    }
}

impl fmt::Display for Norm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Norm::L1 => "L1",
            Norm::L2 => "L2",
            Norm::Hybrid => "hybrid",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Norm {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l1" => Ok(Norm::L1),
            "l2" => Ok(Norm::L2),
            "hybrid" => Ok(Norm::Hybrid),
            _ => Err(SearchError::Other(format!(
                "unknown norm '{}' (expected L1, L2 or hybrid)",
                s
            ))),
        }
    }
}

/// Alignment and misfit of one component at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentFit {
    /// Output component.
    pub component: Component,
    /// Weighted misfit contribution.
    pub misfit: f64,
    /// Time shift of the component's group in seconds.
    pub time_shift: f64,
    /// First synthetic sample compared against the observed series.
    pub start: usize,
    /// One past the last compared synthetic sample.
    pub stop: usize,
}

/// Misfit function configuration.
#[derive(Debug, Clone)]
pub struct Misfit {
    norm: Norm,
    time_shift_groups: Vec<Vec<Component>>,
    time_shift_min: f64,
    time_shift_max: f64,
}

impl Misfit {
    /// Create a misfit function.
    ///
    /// Each group is a string of component letters such as `"ZR"`.
    ///
    /// # Errors
    /// Returns an error on a malformed group or on bounds that are not
    /// finite or have `time_shift_min > time_shift_max`.
    pub fn new<S: AsRef<str>>(
        norm: Norm,
        time_shift_groups: &[S],
        time_shift_min: f64,
        time_shift_max: f64,
    ) -> Result<Self> {
        if !time_shift_min.is_finite()
            || !time_shift_max.is_finite()
            || time_shift_min > time_shift_max
        {
            return Err(SearchError::InvalidTimeShiftBounds {
                min: time_shift_min,
                max: time_shift_max,
            });
        }
        let time_shift_groups = time_shift_groups
            .iter()
            .map(|g| Component::parse_group(g.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Misfit {
            norm,
            time_shift_groups,
            time_shift_min,
            time_shift_max,
        })
    }

    /// Residual norm.
    pub fn norm(&self) -> Norm {
        self.norm
    }

    /// Component groups sharing one time shift.
    pub fn time_shift_groups(&self) -> &[Vec<Component>] {
        &self.time_shift_groups
    }

    /// Time-shift bounds in seconds.
    pub fn time_shift_bounds(&self) -> (f64, f64) {
        (self.time_shift_min, self.time_shift_max)
    }

    /// `(padding_left, padding_right)` in samples.
    ///
    /// Half-sample bounds round to the nearest even sample count.
    pub fn padding(&self, dt: f64) -> (i64, i64) {
        (
            (self.time_shift_max / dt).round_ties_even() as i64,
            (-self.time_shift_min / dt).round_ties_even() as i64,
        )
    }

    /// Extra synthetic samples required beyond the observed length.
    pub fn npts_padding(&self, dt: f64) -> usize {
        let (left, right) = self.padding(dt);
        (left + right).max(0) as usize
    }

    /// Whether any group has a component both observed and synthesized.
    pub fn has_usable_components(&self, data: &StationData, components: &[Component]) -> bool {
        self.time_shift_groups.iter().flatten().any(|c| {
            data.trace(*c).is_some() && components.contains(c)
        })
    }

    /// Misfit contribution of one station.
    ///
    /// Row `i` of `synthetics` holds component `components[i]`. Components
    /// missing from either side are left out; a station with no usable
    /// component contributes zero.
    ///
    /// # Errors
    /// Returns [`SearchError::DataShape`] if a synthetic row is not
    /// `npts + npts_padding` samples long.
    pub fn evaluate_station(
        &self,
        data: &StationData,
        synthetics: ArrayView2<'_, f64>,
        components: &[Component],
    ) -> Result<f64> {
        self.fit_station(data, synthetics, components, |_| {})
    }

    /// Per-component alignment and misfit of one station.
    ///
    /// # Errors
    /// Same as [`evaluate_station`](Self::evaluate_station).
    pub fn explain_station(
        &self,
        data: &StationData,
        synthetics: ArrayView2<'_, f64>,
        components: &[Component],
    ) -> Result<Vec<ComponentFit>> {
        let mut fits = Vec::new();
        self.fit_station(data, synthetics, components, |fit| fits.push(fit))?;
        Ok(fits)
    }

    fn fit_station(
        &self,
        data: &StationData,
        synthetics: ArrayView2<'_, f64>,
        components: &[Component],
        mut visit: impl FnMut(ComponentFit),
    ) -> Result<f64> {
        let dt = data.dt();
        let npts = data.npts();
        let (padding_left, _) = self.padding(dt);
        let npts_padding = self.npts_padding(dt);
        let expected = npts + npts_padding;
        if synthetics.ncols() != expected || synthetics.nrows() != components.len() {
            return Err(SearchError::DataShape {
                id: data.id(),
                expected: vec![components.len(), expected],
                got: synthetics.shape().to_vec(),
            });
        }

        let mut total = 0.0;
        let mut corr = vec![0.0; npts_padding + 1];
        let mut pairs = Vec::with_capacity(components.len());
        for group in &self.time_shift_groups {
            // observed order decides the pairing order
            pairs.clear();
            for trace in data.traces() {
                if !group.contains(&trace.component) {
                    continue;
                }
                if let Some(row) = components.iter().position(|c| *c == trace.component) {
                    let synthetic = synthetics.row(row).to_slice().ok_or_else(|| {
                        SearchError::Other(format!(
                            "synthetic row {} at '{}' is not contiguous",
                            row,
                            data.id()
                        ))
                    })?;
                    pairs.push((trace, synthetic));
                }
            }
            if pairs.is_empty() {
                continue;
            }

            corr.iter_mut().for_each(|c| *c = 0.0);
            for (trace, synthetic) in &pairs {
                correlate_valid_add(synthetic, &trace.samples, &mut corr);
            }

            let start = argmax(&corr);
            let npts_shift = padding_left - start as i64;
            let time_shift =
                npts_shift as f64 * dt - (self.time_shift_min + self.time_shift_max);
            let stop = start + npts;

            for (trace, synthetic) in &pairs {
                let misfit =
                    trace.weight() * self.norm.residual(&synthetic[start..stop], &trace.samples, dt);
                total += misfit;
                visit(ComponentFit {
                    component: trace.component,
                    misfit,
                    time_shift,
                    start,
                    stop,
                });
            }
        }
        Ok(total)
    }
}
