// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Observed waveforms.

use crate::error::{Result, SearchError};
use crate::greens::Component;
use crate::station::{Origin, Station};

/// One observed component.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Output component.
    pub component: Component,
    /// Samples.
    pub samples: Vec<f64>,
    /// Misfit weight; `None` means 1.
    pub weight: Option<f64>,
}

impl Trace {
    /// Unweighted trace.
    pub fn new(component: Component, samples: Vec<f64>) -> Self {
        Trace {
            component,
            samples,
            weight: None,
        }
    }

    /// Set the misfit weight (builder method).
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Effective misfit weight.
    pub fn weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

/// Observed components of one station, sharing sample interval and length.
#[derive(Debug, Clone)]
pub struct StationData {
    station: Station,
    dt: f64,
    traces: Vec<Trace>,
}

impl StationData {
    /// Create station data.
    ///
    /// # Errors
    /// Returns an error if `dt` is not positive, if trace lengths differ, or
    /// if a component appears twice.
    pub fn new(station: Station, dt: f64, traces: Vec<Trace>) -> Result<Self> {
        let id = station.id();
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SearchError::InconsistentSampling {
                id,
                reason: format!("sample interval {} (must be positive and finite)", dt),
            });
        }
        if let Some(first) = traces.first() {
            let npts = first.samples.len();
            for (i, trace) in traces.iter().enumerate() {
                if trace.samples.len() != npts {
                    return Err(SearchError::InconsistentSampling {
                        id,
                        reason: format!(
                            "{} has {} samples, expected {}",
                            trace.component,
                            trace.samples.len(),
                            npts
                        ),
                    });
                }
                if traces[..i].iter().any(|t| t.component == trace.component) {
                    return Err(SearchError::Other(format!(
                        "component {} appears twice at '{}'",
                        trace.component, id
                    )));
                }
            }
        }
        Ok(StationData {
            station,
            dt,
            traces,
        })
    }

    /// Receiver metadata.
    pub fn station(&self) -> &Station {
        &self.station
    }

    /// Station identifier.
    pub fn id(&self) -> String {
        self.station.id()
    }

    /// Sample interval in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Samples per trace (0 without traces).
    pub fn npts(&self) -> usize {
        self.traces.first().map_or(0, |t| t.samples.len())
    }

    /// Traces in stored order.
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    /// Trace for `component`, if observed.
    pub fn trace(&self, component: Component) -> Option<&Trace> {
        self.traces.iter().find(|t| t.component == component)
    }

    /// Observed components in stored order.
    pub fn components(&self) -> Vec<Component> {
        self.traces.iter().map(|t| t.component).collect()
    }
}

/// Observed data for every station.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    stations: Vec<StationData>,
}

impl Dataset {
    /// Empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a station.
    pub fn push(&mut self, data: StationData) {
        self.stations.push(data);
    }

    /// Number of stations.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether there are no stations.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations in order.
    pub fn as_slice(&self) -> &[StationData] {
        &self.stations
    }

    /// Iterate stations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StationData> {
        self.stations.iter()
    }

    /// Sort by distance from `origin`, nearest first.
    pub fn sort_by_distance(&mut self, origin: &Origin) {
        self.stations.sort_by(|a, b| {
            let da = origin.distance_azimuth(&a.station).0;
            let db = origin.distance_azimuth(&b.station).0;
            da.total_cmp(&db)
        });
    }

    /// Sort by source-to-station azimuth from `origin`, clockwise from north.
    pub fn sort_by_azimuth(&mut self, origin: &Origin) {
        self.stations.sort_by(|a, b| {
            let aa = origin.distance_azimuth(&a.station).1;
            let ab = origin.distance_azimuth(&b.station).1;
            aa.total_cmp(&ab)
        });
    }

    /// Largest absolute sample over traces with non-zero weight.
    pub fn max_abs(&self) -> f64 {
        self.stations
            .iter()
            .flat_map(|s| s.traces.iter())
            .filter(|t| t.weight() != 0.0)
            .flat_map(|t| t.samples.iter())
            .fold(0.0, |acc: f64, &x| acc.max(x.abs()))
    }
}

impl FromIterator<StationData> for Dataset {
    fn from_iter<I: IntoIterator<Item = StationData>>(iter: I) -> Self {
        Dataset {
            stations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a StationData;
    type IntoIter = std::slice::Iter<'a, StationData>;

    fn into_iter(self) -> Self::IntoIter {
        self.stations.iter()
    }
}
