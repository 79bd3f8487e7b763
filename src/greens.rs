// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Elemental responses and synthesis by linear combination.
//!
//! A [`GreensTensor`] holds, for one station, one elemental time series per
//! (output component, source basis element) pair. Selecting the output
//! components packs the matching series into a dense
//! `(component, element, sample)` store, after which any source vector of
//! the right length turns into synthetics with one weighted sum per
//! component.

use std::fmt;
use std::str::FromStr;

use ndarray::{s, Array2, Array3, ArrayView3};
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::signal::convolve_same;
use crate::station::{Origin, Station};

/// Output waveform component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// Vertical.
    Z,
    /// Radial.
    R,
    /// Transverse.
    T,
}

impl Component {
    /// All components in canonical order.
    pub const ALL: [Component; 3] = [Component::Z, Component::R, Component::T];

    /// Component for a channel letter (case-insensitive).
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'Z' => Some(Component::Z),
            'R' => Some(Component::R),
            'T' => Some(Component::T),
            _ => None,
        }
    }

    /// Parse a component group such as `"ZR"`.
    ///
    /// # Errors
    /// Returns an error on an unknown letter, a repeated letter or an empty group.
    pub fn parse_group(s: &str) -> Result<Vec<Component>> {
        let mut group = Vec::new();
        for c in s.trim().chars() {
            let component = Component::from_char(c)
                .ok_or_else(|| SearchError::Other(format!("unknown component '{}' in '{}'", c, s)))?;
            if group.contains(&component) {
                return Err(SearchError::Other(format!(
                    "component '{}' repeated in '{}'",
                    c, s
                )));
            }
            group.push(component);
        }
        if group.is_empty() {
            return Err(SearchError::Other("empty component group".to_string()));
        }
        Ok(group)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Component::Z => 'Z',
            Component::R => 'R',
            Component::T => 'T',
        };
        write!(f, "{}", c)
    }
}

impl FromStr for Component {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.trim().chars();
        match (chars.next().and_then(Component::from_char), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(SearchError::Other(format!("unknown component '{}'", s))),
        }
    }
}

/// Independent element of the source basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// Moment tensor `Mrr`.
    Mrr,
    /// Moment tensor `Mtt`.
    Mtt,
    /// Moment tensor `Mpp`.
    Mpp,
    /// Moment tensor `Mrt`.
    Mrt,
    /// Moment tensor `Mrp`.
    Mrp,
    /// Moment tensor `Mtp`.
    Mtp,
    /// Force, up.
    Fr,
    /// Force, south.
    Ft,
    /// Force, east.
    Fp,
}

impl Element {
    /// Moment tensor elements in source-vector order.
    pub const MOMENT_TENSOR: [Element; 6] = [
        Element::Mrr,
        Element::Mtt,
        Element::Mpp,
        Element::Mrt,
        Element::Mrp,
        Element::Mtp,
    ];

    /// Force elements in source-vector order.
    pub const FORCE: [Element; 3] = [Element::Fr, Element::Ft, Element::Fp];

    /// Moment tensor followed by force elements.
    pub const COMPOSITE: [Element; 9] = [
        Element::Mrr,
        Element::Mtt,
        Element::Mpp,
        Element::Mrt,
        Element::Mrp,
        Element::Mtp,
        Element::Fr,
        Element::Ft,
        Element::Fp,
    ];
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which source basis a set of elemental responses spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceBasis {
    /// Six moment tensor elements.
    MomentTensor,
    /// Three force elements.
    Force,
    /// Moment tensor then force, nine elements.
    Composite,
}

impl SourceBasis {
    /// Elements in source-vector order.
    pub fn elements(&self) -> &'static [Element] {
        match self {
            SourceBasis::MomentTensor => &Element::MOMENT_TENSOR,
            SourceBasis::Force => &Element::FORCE,
            SourceBasis::Composite => &Element::COMPOSITE,
        }
    }

    /// Required source-vector length.
    pub fn len(&self) -> usize {
        self.elements().len()
    }

    /// Basis with `n` elements, if any.
    pub fn from_len(n: usize) -> Option<Self> {
        match n {
            6 => Some(SourceBasis::MomentTensor),
            3 => Some(SourceBasis::Force),
            9 => Some(SourceBasis::Composite),
            _ => None,
        }
    }
}

/// Physical quantity the elemental responses represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    /// Ground displacement.
    #[default]
    Displacement,
    /// Ground velocity.
    Velocity,
}

impl ResponseKind {
    /// Kind for a numeric file marker: 0 displacement, 1 velocity.
    pub fn from_code(code: f64) -> Option<Self> {
        if code == 0.0 {
            Some(ResponseKind::Displacement)
        } else if code == 1.0 {
            Some(ResponseKind::Velocity)
        } else {
            None
        }
    }
}

/// One elemental time series.
#[derive(Debug, Clone)]
pub struct ElementalTrace {
    /// Output component.
    pub component: Component,
    /// Source basis element.
    pub element: Element,
    /// Sample interval in seconds.
    pub dt: f64,
    /// Samples.
    pub data: Vec<f64>,
}

/// Elemental responses of one station plus the packed store used for synthesis.
#[derive(Debug, Clone)]
pub struct GreensTensor {
    station: Station,
    origin: Origin,
    basis: SourceBasis,
    kind: ResponseKind,
    dt: f64,
    npts: usize,
    distance_in_m: f64,
    azimuth: f64,
    traces: Vec<ElementalTrace>,
    components: Vec<Component>,
    store: Array3<f64>,
}

impl GreensTensor {
    /// Create a Green's tensor from elemental traces.
    ///
    /// No components are selected yet; call [`set_components`](Self::set_components)
    /// before synthesizing.
    ///
    /// # Errors
    /// Returns an error if there are no traces or if sample counts or
    /// intervals differ between traces.
    pub fn new(
        station: Station,
        origin: Origin,
        basis: SourceBasis,
        traces: Vec<ElementalTrace>,
    ) -> Result<Self> {
        let id = station.id();
        let first = traces.first().ok_or_else(|| SearchError::InconsistentSampling {
            id: id.clone(),
            reason: "no elemental traces".to_string(),
        })?;
        let (dt, npts) = (first.dt, first.data.len());
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SearchError::InconsistentSampling {
                id,
                reason: format!("sample interval {} (must be positive and finite)", dt),
            });
        }
        for trace in &traces {
            if trace.data.len() != npts {
                return Err(SearchError::InconsistentSampling {
                    id,
                    reason: format!(
                        "{}.{} has {} samples, expected {}",
                        trace.component,
                        trace.element,
                        trace.data.len(),
                        npts
                    ),
                });
            }
            if trace.dt != dt {
                return Err(SearchError::InconsistentSampling {
                    id,
                    reason: format!(
                        "{}.{} has dt {}, expected {}",
                        trace.component, trace.element, trace.dt, dt
                    ),
                });
            }
        }

        let (distance_in_m, azimuth) = origin.distance_azimuth(&station);
        Ok(GreensTensor {
            station,
            origin,
            basis,
            kind: ResponseKind::default(),
            dt,
            npts,
            distance_in_m,
            azimuth,
            traces,
            components: Vec::new(),
            store: Array3::zeros((0, basis.len(), npts)),
        })
    }

    /// Tag the responses with the quantity they represent (builder method).
    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Station identifier.
    pub fn id(&self) -> String {
        self.station.id()
    }

    /// Receiver metadata.
    pub fn station(&self) -> &Station {
        &self.station
    }

    /// Source metadata.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Active source basis.
    pub fn basis(&self) -> SourceBasis {
        self.basis
    }

    /// Physical quantity of the responses.
    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// Sample interval in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Samples per elemental trace.
    pub fn npts(&self) -> usize {
        self.npts
    }

    /// Epicentral distance in meters.
    pub fn distance_in_m(&self) -> f64 {
        self.distance_in_m
    }

    /// Source-to-station azimuth in degrees.
    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    /// Raw elemental traces.
    pub fn traces(&self) -> &[ElementalTrace] {
        &self.traces
    }

    /// Currently selected output components, in store order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Packed `(component, element, sample)` store.
    pub fn store(&self) -> ArrayView3<'_, f64> {
        self.store.view()
    }

    /// Select output components and rebuild the store when the selection changes.
    ///
    /// # Errors
    /// Returns an error if a required elemental trace is missing.
    pub fn set_components(&mut self, components: &[Component]) -> Result<()> {
        if components == self.components.as_slice() {
            return Ok(());
        }
        let store = self.pack(components)?;
        self.components = components.to_vec();
        self.store = store;
        Ok(())
    }

    fn pack(&self, components: &[Component]) -> Result<Array3<f64>> {
        let elements = self.basis.elements();
        let mut store = Array3::zeros((components.len(), elements.len(), self.npts));
        for (i, &component) in components.iter().enumerate() {
            for (j, &element) in elements.iter().enumerate() {
                let trace = self
                    .traces
                    .iter()
                    .find(|t| t.component == component && t.element == element)
                    .ok_or_else(|| SearchError::MissingElementalTrace {
                        id: self.id(),
                        component: component.to_string(),
                        element: element.to_string(),
                    })?;
                store
                    .slice_mut(s![i, j, ..])
                    .iter_mut()
                    .zip(&trace.data)
                    .for_each(|(dst, &src)| *dst = src);
            }
        }
        debug!(
            station = %self.id(),
            components = components.len(),
            elements = elements.len(),
            npts = self.npts,
            "packed elemental store"
        );
        Ok(store)
    }

    /// Convolve every elemental trace with a source-time-function kernel.
    ///
    /// The kernel is applied in "same" mode so trace lengths are unchanged.
    /// A store that was already built is rebuilt from the convolved traces.
    ///
    /// # Errors
    /// Returns an error if rebuilding the store fails.
    pub fn convolve(&mut self, kernel: &[f64]) -> Result<()> {
        for trace in &mut self.traces {
            trace.data = convolve_same(&trace.data, kernel);
        }
        if !self.components.is_empty() {
            self.store = self.pack(&self.components)?;
        }
        Ok(())
    }

    /// Zeroed `(components, npts)` buffer shaped for [`synthesize_into`](Self::synthesize_into).
    pub fn allocate_synthetics(&self) -> Array2<f64> {
        Array2::zeros((self.components.len(), self.npts))
    }

    /// Synthetics for `source` in a freshly allocated buffer.
    ///
    /// Rows follow the components last passed to
    /// [`set_components`](Self::set_components); use
    /// [`synthesize_components`](Self::synthesize_components) to select them
    /// in the same call.
    ///
    /// # Errors
    /// Returns an error if the source length does not match the basis.
    pub fn synthesize(&self, source: &[f64]) -> Result<Array2<f64>> {
        let mut out = self.allocate_synthetics();
        self.synthesize_into(source, &mut out)?;
        Ok(out)
    }

    /// Select `components`, rebuilding the store if the selection changed,
    /// then synthesize `source`.
    ///
    /// # Errors
    /// Returns an error if a required elemental trace is missing or the
    /// source length does not match the basis.
    pub fn synthesize_components(
        &mut self,
        source: &[f64],
        components: &[Component],
    ) -> Result<Array2<f64>> {
        self.set_components(components)?;
        self.synthesize(source)
    }

    /// Overwrite `out` with the synthetics for `source`.
    ///
    /// `out[c, :] = sum_k source[k] * store[c, k, :]`. Previous contents of
    /// `out` are discarded. The buffer belongs to the caller, so concurrent
    /// workers sharing one tensor each pass their own.
    ///
    /// # Errors
    /// Returns an error if the source length does not match the basis or
    /// `out` is not shaped `(components, npts)`.
    pub fn synthesize_into(&self, source: &[f64], out: &mut Array2<f64>) -> Result<()> {
        if source.len() != self.basis.len() {
            return Err(SearchError::SourceLengthMismatch {
                expected: self.basis.len(),
                got: source.len(),
            });
        }
        let expected = (self.components.len(), self.npts);
        if out.dim() != expected {
            return Err(SearchError::DataShape {
                id: self.id(),
                expected: vec![expected.0, expected.1],
                got: out.shape().to_vec(),
            });
        }
        for (elements, mut row) in self.store.outer_iter().zip(out.outer_iter_mut()) {
            row.fill(0.0);
            for (&weight, series) in source.iter().zip(elements.outer_iter()) {
                row.scaled_add(weight, &series);
            }
        }
        Ok(())
    }
}

/// Ordered collection of Green's tensors, one per station.
#[derive(Debug, Clone, Default)]
pub struct GreensTensorList {
    tensors: Vec<GreensTensor>,
}

impl GreensTensorList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tensor.
    pub fn push(&mut self, tensor: GreensTensor) {
        self.tensors.push(tensor);
    }

    /// Number of tensors.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Tensors in list order.
    pub fn as_slice(&self) -> &[GreensTensor] {
        &self.tensors
    }

    /// Mutable access in list order.
    pub fn as_mut_slice(&mut self) -> &mut [GreensTensor] {
        &mut self.tensors
    }

    /// Iterate in list order.
    pub fn iter(&self) -> std::slice::Iter<'_, GreensTensor> {
        self.tensors.iter()
    }

    /// Tensors recorded at `station`.
    pub fn select_station(&self, station: &Station) -> Vec<&GreensTensor> {
        self.tensors
            .iter()
            .filter(|t| t.station() == station)
            .collect()
    }

    /// Sort in place by epicentral distance.
    pub fn sort_by_distance(&mut self) {
        self.tensors
            .sort_by(|a, b| a.distance_in_m.total_cmp(&b.distance_in_m));
    }

    /// Sort in place by azimuth.
    pub fn sort_by_azimuth(&mut self) {
        self.tensors.sort_by(|a, b| a.azimuth.total_cmp(&b.azimuth));
    }

    /// Convolve every tensor with the same kernel.
    ///
    /// # Errors
    /// Returns the first error from [`GreensTensor::convolve`].
    pub fn convolve(&mut self, kernel: &[f64]) -> Result<()> {
        self.tensors.iter_mut().try_for_each(|t| t.convolve(kernel))
    }

    /// Synthetics for `source` at every station, in list order.
    ///
    /// # Errors
    /// Returns the first synthesis error.
    pub fn synthesize(&self, source: &[f64]) -> Result<Vec<Array2<f64>>> {
        self.tensors.iter().map(|t| t.synthesize(source)).collect()
    }
}

impl FromIterator<GreensTensor> for GreensTensorList {
    fn from_iter<I: IntoIterator<Item = GreensTensor>>(iter: I) -> Self {
        GreensTensorList {
            tensors: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a GreensTensorList {
    type Item = &'a GreensTensor;
    type IntoIter = std::slice::Iter<'a, GreensTensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tensors.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn origin() -> Origin {
        Origin {
            latitude: 0.0,
            longitude: 0.0,
            depth_in_m: 10_000.0,
        }
    }

    /// Elemental trace whose samples encode (component, element, sample).
    pub(crate) fn coded_traces(npts: usize, basis: SourceBasis) -> Vec<ElementalTrace> {
        let mut traces = Vec::new();
        for (ci, &component) in Component::ALL.iter().enumerate() {
            for (ei, &element) in basis.elements().iter().enumerate() {
                traces.push(ElementalTrace {
                    component,
                    element,
                    dt: 0.5,
                    data: (0..npts)
                        .map(|t| (100 * ci + 10 * ei) as f64 + t as f64 * 0.01)
                        .collect(),
                });
            }
        }
        traces
    }

    fn tensor(npts: usize) -> GreensTensor {
        GreensTensor::new(
            Station::new("XX", "AAA", 1.0, 1.0),
            origin(),
            SourceBasis::MomentTensor,
            coded_traces(npts, SourceBasis::MomentTensor),
        )
        .unwrap()
    }

    #[test]
    fn component_parsing() {
        assert_eq!(
            Component::parse_group("zr").unwrap(),
            vec![Component::Z, Component::R]
        );
        assert!(Component::parse_group("ZZ").is_err());
        assert!(Component::parse_group("X").is_err());
        assert!(Component::parse_group("").is_err());
        assert_eq!("T".parse::<Component>().unwrap(), Component::T);
        assert!("ZR".parse::<Component>().is_err());
    }

    #[test]
    fn basis_lengths() {
        assert_eq!(SourceBasis::MomentTensor.len(), 6);
        assert_eq!(SourceBasis::Force.len(), 3);
        assert_eq!(SourceBasis::Composite.len(), 9);
        assert_eq!(SourceBasis::from_len(9), Some(SourceBasis::Composite));
        assert_eq!(SourceBasis::from_len(4), None);
    }

    #[test]
    fn inconsistent_sample_count_rejected() {
        let mut traces = coded_traces(8, SourceBasis::MomentTensor);
        traces[3].data.pop();
        let result = GreensTensor::new(
            Station::new("XX", "BAD", 0.0, 1.0),
            origin(),
            SourceBasis::MomentTensor,
            traces,
        );
        assert!(matches!(result, Err(SearchError::InconsistentSampling { .. })));
    }

    #[test]
    fn inconsistent_sample_interval_rejected() {
        let mut traces = coded_traces(8, SourceBasis::MomentTensor);
        traces[5].dt = 0.25;
        let result = GreensTensor::new(
            Station::new("XX", "BAD", 0.0, 1.0),
            origin(),
            SourceBasis::MomentTensor,
            traces,
        );
        assert!(matches!(result, Err(SearchError::InconsistentSampling { .. })));
    }

    #[test]
    fn response_kind_tag() {
        let g = tensor(2);
        assert_eq!(g.kind(), ResponseKind::Displacement);
        let g = g.with_kind(ResponseKind::Velocity);
        assert_eq!(g.kind(), ResponseKind::Velocity);

        assert_eq!(ResponseKind::from_code(0.0), Some(ResponseKind::Displacement));
        assert_eq!(ResponseKind::from_code(1.0), Some(ResponseKind::Velocity));
        assert_eq!(ResponseKind::from_code(2.0), None);
    }

    #[test]
    fn store_follows_component_selection() {
        let mut g = tensor(4);
        assert_eq!(g.store().dim(), (0, 6, 4));

        g.set_components(&[Component::T, Component::Z]).unwrap();
        let store = g.store();
        assert_eq!(store.dim(), (2, 6, 4));
        // T is component index 2, Mrp is element 4
        assert!((store[[0, 4, 1]] - 240.01).abs() < 1e-12);
        assert!((store[[1, 0, 3]] - 0.03).abs() < 1e-12);

        g.set_components(&[Component::R]).unwrap();
        assert_eq!(g.store().dim(), (1, 6, 4));
        assert!((g.store()[[0, 5, 0]] - 150.0).abs() < 1e-12);
    }

    #[test]
    fn missing_force_trace_rejected() {
        let mut g = GreensTensor::new(
            Station::new("XX", "MT", 0.0, 1.0),
            origin(),
            SourceBasis::Composite,
            coded_traces(4, SourceBasis::MomentTensor),
        )
        .unwrap();
        let result = g.set_components(&[Component::Z]);
        assert!(matches!(
            result,
            Err(SearchError::MissingElementalTrace { .. })
        ));
        assert!(g.components().is_empty());
    }

    #[test]
    fn synthesize_is_linear_combination() {
        let mut g = tensor(5);
        g.set_components(&[Component::Z, Component::R]).unwrap();
        let source = [1.0, 0.0, 0.0, 0.0, 0.0, 2.0];
        let s = g.synthesize(&source).unwrap();
        for t in 0..5 {
            let z = (0.0 + t as f64 * 0.01) + 2.0 * (50.0 + t as f64 * 0.01);
            let r = (100.0 + t as f64 * 0.01) + 2.0 * (150.0 + t as f64 * 0.01);
            assert!((s[[0, t]] - z).abs() < 1e-9);
            assert!((s[[1, t]] - r).abs() < 1e-9);
        }
    }

    #[test]
    fn synthesize_with_component_selection() {
        let mut g = tensor(3);
        let source = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let s = g.synthesize_components(&source, &[Component::T]).unwrap();
        assert_eq!(s.dim(), (1, 3));
        assert!((s[[0, 2]] - 210.02).abs() < 1e-12);
        assert_eq!(g.components(), &[Component::T]);

        let s = g
            .synthesize_components(&source, &[Component::Z, Component::R])
            .unwrap();
        assert_eq!(s.dim(), (2, 3));
        assert!((s[[1, 0]] - 110.0).abs() < 1e-12);
        assert_eq!(s, g.synthesize(&source).unwrap());
    }

    #[test]
    fn synthesize_into_overwrites() {
        let mut g = tensor(3);
        g.set_components(&[Component::Z]).unwrap();
        let mut buf = g.allocate_synthetics();
        buf.fill(99.0);
        g.synthesize_into(&[0.0; 6], &mut buf).unwrap();
        assert!(buf.iter().all(|&v| v == 0.0));

        let source = [0.5, 0.0, 0.0, 0.0, 0.0, 0.0];
        g.synthesize_into(&source, &mut buf).unwrap();
        let first = buf.clone();
        g.synthesize_into(&source, &mut buf).unwrap();
        assert_eq!(first, buf);
    }

    #[test]
    fn synthesize_checks_lengths() {
        let mut g = tensor(3);
        g.set_components(&[Component::Z]).unwrap();
        assert!(matches!(
            g.synthesize(&[1.0; 9]),
            Err(SearchError::SourceLengthMismatch {
                expected: 6,
                got: 9
            })
        ));
        let mut wrong = Array2::zeros((2, 3));
        assert!(matches!(
            g.synthesize_into(&[1.0; 6], &mut wrong),
            Err(SearchError::DataShape { .. })
        ));
    }

    #[test]
    fn convolve_rebuilds_store() {
        let mut g = tensor(4);
        g.set_components(&[Component::Z]).unwrap();
        g.convolve(&[2.0]).unwrap();
        assert!((g.store()[[0, 1, 2]] - 2.0 * 10.02).abs() < 1e-12);
        assert!((g.traces()[0].data[3] - 0.06).abs() < 1e-12);
    }

    #[test]
    fn list_sorting_and_selection() {
        let near = Station::new("XX", "NEAR", 0.0, 1.0);
        let far = Station::new("XX", "FAR", 0.0, 5.0);
        let mut list: GreensTensorList = [far.clone(), near.clone()]
            .into_iter()
            .map(|s| {
                GreensTensor::new(
                    s,
                    origin(),
                    SourceBasis::MomentTensor,
                    coded_traces(2, SourceBasis::MomentTensor),
                )
                .unwrap()
            })
            .collect();
        list.sort_by_distance();
        assert_eq!(list.as_slice()[0].station(), &near);
        assert_eq!(list.select_station(&far).len(), 1);

        list.convolve(&[1.0]).unwrap();
        for g in list.as_mut_slice() {
            g.set_components(&[Component::T]).unwrap();
        }
        let synthetics = list.synthesize(&[1.0; 6]).unwrap();
        assert_eq!(synthetics.len(), 2);
        assert_eq!(synthetics[0].dim(), (1, 2));
    }

    #[test]
    fn list_sort_by_azimuth() {
        let mut list: GreensTensorList = [
            ("WEST", 0.0, -1.0),
            ("SOUTH", -1.0, 0.0),
            ("NORTH", 1.0, 0.0),
            ("EAST", 0.0, 1.0),
        ]
        .into_iter()
        .map(|(code, lat, lon)| {
            GreensTensor::new(
                Station::new("XX", code, lat, lon),
                origin(),
                SourceBasis::Force,
                coded_traces(2, SourceBasis::Force),
            )
            .unwrap()
        })
        .collect();
        list.sort_by_azimuth();
        let order: Vec<&str> = list.iter().map(|g| g.station().station.as_str()).collect();
        assert_eq!(order, vec!["NORTH", "EAST", "SOUTH", "WEST"]);
        assert!((list.as_slice()[1].azimuth() - 90.0).abs() < 1e-9);
    }
}
