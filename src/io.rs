// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::path::Path;

use ndarray::{Array1, ArrayD, IxDyn, ShapeBuilder};
use ndarray_npy::{NpzReader, NpzWriter};
use tracing::{debug, info};

use crate::dataset::{StationData, Trace};
use crate::error::{Result, SearchError};
use crate::greens::{Component, ElementalTrace, GreensTensor, ResponseKind, SourceBasis};
use crate::station::{Origin, Station};

/// Supported file formats for result and input files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npz archive.
    Npz,
    /// MATLAB .mat format (Level 5).
    Mat,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npz") => Ok(FileFormat::Npz),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(SearchError::UnsupportedFileFormat(ext.to_string())),
        None => Err(SearchError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Save grid axes plus named arrays defined on the grid.
///
/// Every axis is stored under its dimension name, followed by each item
/// under its own name. The format is inferred from the extension.
///
/// # Errors
/// Returns an error on an unsupported extension, a name shared by two
/// arrays, or any write failure.
pub fn save(
    path: &Path,
    dims: &[String],
    coords: &[Vec<f64>],
    items: &[(&str, &[f64])],
) -> Result<()> {
    let format = infer_format(path)?;
    let mut arrays: Vec<(&str, &[f64])> = dims
        .iter()
        .map(String::as_str)
        .zip(coords.iter().map(Vec::as_slice))
        .collect();
    arrays.extend_from_slice(items);
    for (i, (name, _)) in arrays.iter().enumerate() {
        if arrays[..i].iter().any(|(other, _)| other == name) {
            return Err(SearchError::Other(format!(
                "array name '{}' used more than once",
                name
            )));
        }
    }

    match format {
        FileFormat::Npz => save_npz(path, &arrays)?,
        FileFormat::Mat => save_mat(path, &arrays)?,
    }
    info!(path = %path.display(), arrays = arrays.len(), "saved grid");
    Ok(())
}

fn save_npz(path: &Path, arrays: &[(&str, &[f64])]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut npz = NpzWriter::new(std::io::BufWriter::new(file));
    for &(name, values) in arrays {
        npz.add_array(name, &Array1::from(values.to_vec()))
            .map_err(|e| SearchError::Other(format!("npz write error: {}", e)))?;
    }
    let mut w = npz
        .finish()
        .map_err(|e| SearchError::Other(format!("npz write error: {}", e)))?;
    w.flush()?;
    Ok(())
}

/// Save one-dimensional arrays as MAT-file Level 5 column vectors.
///
/// The `matfile` crate only reads, so files are written by hand: a 128-byte
/// header followed by one uncompressed real double `miMATRIX` element per
/// variable.
fn save_mat(path: &Path, arrays: &[(&str, &[f64])]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);
    write_mat_header(&mut w)?;
    for &(name, values) in arrays {
        write_mat_matrix(&mut w, name, &[values.len(), 1], values)?;
    }
    w.flush()?;
    Ok(())
}

fn write_mat_header<W: Write>(w: &mut W) -> Result<()> {
    // 116 bytes of text, 8 bytes subsystem offset, version, endian indicator
    let desc = b"MATLAB 5.0 MAT-file, created by mtsearch";
    let mut header_text = [b' '; 116];
    header_text[..desc.len()].copy_from_slice(desc);
    w.write_all(&header_text)?;
    w.write_all(&[0u8; 8])?;
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?;
    Ok(())
}

fn padded(size: u32) -> u32 {
    size.div_ceil(8) * 8
}

fn write_padding<W: Write>(w: &mut W, size: u32) -> Result<()> {
    let pad = (padded(size) - size) as usize;
    if pad > 0 {
        w.write_all(&vec![0u8; pad])?;
    }
    Ok(())
}

/// One real double array: flags, dimensions, name and data sub-elements.
fn write_mat_matrix<W: Write>(
    w: &mut W,
    name: &str,
    dimensions: &[usize],
    data: &[f64],
) -> Result<()> {
    let too_large = || SearchError::Other(format!("array '{}' too large for a MAT file", name));
    let dims_size = u32::try_from(dimensions.len() * 4).map_err(|_| too_large())?;
    let name_size = u32::try_from(name.len()).map_err(|_| too_large())?;
    let real_size = u32::try_from(data.len() * 8).map_err(|_| too_large())?;

    let matrix_size = 16
        + (8 + padded(dims_size))
        + (8 + padded(name_size))
        + (8 + padded(real_size));

    // miMATRIX
    w.write_all(&14u32.to_le_bytes())?;
    w.write_all(&matrix_size.to_le_bytes())?;

    // array flags: miUINT32, mxDOUBLE_CLASS
    w.write_all(&6u32.to_le_bytes())?;
    w.write_all(&8u32.to_le_bytes())?;
    w.write_all(&6u32.to_le_bytes())?;
    w.write_all(&0u32.to_le_bytes())?;

    // dimensions: miINT32
    w.write_all(&5u32.to_le_bytes())?;
    w.write_all(&dims_size.to_le_bytes())?;
    for &d in dimensions {
        let d = i32::try_from(d).map_err(|_| too_large())?;
        w.write_all(&d.to_le_bytes())?;
    }
    write_padding(w, dims_size)?;

    // name: miINT8
    w.write_all(&1u32.to_le_bytes())?;
    w.write_all(&name_size.to_le_bytes())?;
    w.write_all(name.as_bytes())?;
    write_padding(w, name_size)?;

    // real part: miDOUBLE, column-major
    w.write_all(&9u32.to_le_bytes())?;
    w.write_all(&real_size.to_le_bytes())?;
    for &val in data {
        w.write_all(&val.to_le_bytes())?;
    }
    write_padding(w, real_size)?;
    Ok(())
}

/// Named arrays read from an input file, in row-major layout.
struct ArrayFile {
    arrays: Vec<(String, ArrayD<f64>)>,
}

impl ArrayFile {
    fn open(path: &Path) -> Result<Self> {
        let arrays = match infer_format(path)? {
            FileFormat::Npz => read_npz(path)?,
            FileFormat::Mat => read_mat(path)?,
        };
        Ok(ArrayFile { arrays })
    }

    fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.arrays.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    fn require(&self, name: &str) -> Result<&ArrayD<f64>> {
        self.get(name).ok_or_else(|| {
            let available: Vec<&str> = self.arrays.iter().map(|(n, _)| n.as_str()).collect();
            SearchError::Other(format!(
                "array '{}' not found (available: {:?})",
                name, available
            ))
        })
    }
}

fn read_npz(path: &Path) -> Result<Vec<(String, ArrayD<f64>)>> {
    let npz_err = |e: ndarray_npy::ReadNpzError| SearchError::Other(format!("npz read error: {}", e));
    let file = std::fs::File::open(path)?;
    let mut npz = NpzReader::new(std::io::BufReader::new(file)).map_err(npz_err)?;
    let names = npz.names().map_err(npz_err)?;
    let mut arrays = Vec::with_capacity(names.len());
    for entry in names {
        let array: ArrayD<f64> = npz.by_name(&entry).map_err(npz_err)?;
        let name = entry.strip_suffix(".npy").unwrap_or(&entry).to_string();
        arrays.push((name, array.as_standard_layout().to_owned()));
    }
    Ok(arrays)
}

fn read_mat(path: &Path) -> Result<Vec<(String, ArrayD<f64>)>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| SearchError::Other(format!("MAT parse error: {}", e)))?;

    let mut arrays = Vec::new();
    for array in mat.arrays() {
        let data: Vec<f64> = match array.data() {
            matfile::NumericData::Double { real, .. } => real.clone(),
            matfile::NumericData::Single { real, .. } => real.iter().map(|&v| v as f64).collect(),
            _ => {
                return Err(SearchError::Other(format!(
                    "MAT variable '{}' is not f64 or f32",
                    array.name()
                )))
            }
        };
        // column-major with the file's own dimensions
        let shape = array.size().to_vec();
        let arr = ArrayD::from_shape_vec(IxDyn(&shape).f(), data)
            .map_err(|e| SearchError::Other(format!("shape error: {}", e)))?;
        arrays.push((
            array.name().to_string(),
            arr.as_standard_layout().to_owned(),
        ));
    }
    Ok(arrays)
}

/// Flatten an array that must hold exactly `len` values.
fn flat(id: &str, name: &str, array: &ArrayD<f64>, len: usize) -> Result<Vec<f64>> {
    if array.len() != len {
        return Err(SearchError::DataShape {
            id: format!("{}:{}", id, name),
            expected: vec![len],
            got: array.shape().to_vec(),
        });
    }
    Ok(array.iter().copied().collect())
}

/// Load observed data and elemental responses of one station.
///
/// The file (`.npz` or `.mat`) holds:
/// - `greens`: `(3, nbasis, nt)` elemental traces for Z, R, T; `nbasis`
///   of 6, 3 or 9 selects the source basis
/// - `data`: `(3, npts)` observed Z, R, T
/// - `dt`: sample interval
/// - `weights` (optional): `(3,)` per-component weight; zero drops the component
/// - `location` (optional): station `[latitude, longitude]` in degrees
/// - `origin` (optional): `[latitude, longitude, depth_in_m]`
/// - `kind` (optional): `0` displacement (default) or `1` velocity responses
///
/// The station code is the file stem.
///
/// # Errors
/// Returns an error if a required array is missing or misshapen, or if the
/// traces fail validation.
pub fn load_station_bundle(path: &Path) -> Result<(StationData, GreensTensor)> {
    let file = ArrayFile::open(path)?;
    let code = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("station");

    let [latitude, longitude] = match file.get("location") {
        Some(a) => {
            let v = flat(code, "location", a, 2)?;
            [v[0], v[1]]
        }
        None => [0.0, 0.0],
    };
    let station = Station::new("", code, latitude, longitude);
    let id = station.id();

    let origin = match file.get("origin") {
        Some(a) => {
            let v = flat(&id, "origin", a, 3)?;
            Origin {
                latitude: v[0],
                longitude: v[1],
                depth_in_m: v[2],
            }
        }
        None => Origin {
            latitude: 0.0,
            longitude: 0.0,
            depth_in_m: 0.0,
        },
    };

    let dt = flat(&id, "dt", file.require("dt")?, 1)?[0];
    let weights = match file.get("weights") {
        Some(a) => Some(flat(&id, "weights", a, 3)?),
        None => None,
    };

    let greens = file.require("greens")?;
    let (nbasis, nt) = match greens.shape() {
        [3, nbasis, nt] => (*nbasis, *nt),
        other => {
            return Err(SearchError::DataShape {
                id: format!("{}:greens", id),
                expected: vec![3, 6, 0],
                got: other.to_vec(),
            })
        }
    };
    let basis = SourceBasis::from_len(nbasis).ok_or_else(|| SearchError::DataShape {
        id: format!("{}:greens", id),
        expected: vec![3, 6, nt],
        got: greens.shape().to_vec(),
    })?;

    let mut elemental = Vec::with_capacity(3 * nbasis);
    for (c, &component) in Component::ALL.iter().enumerate() {
        for (k, &element) in basis.elements().iter().enumerate() {
            elemental.push(ElementalTrace {
                component,
                element,
                dt,
                data: (0..nt).map(|t| greens[[c, k, t]]).collect(),
            });
        }
    }
    let kind = match file.get("kind") {
        Some(a) => {
            let code = flat(&id, "kind", a, 1)?[0];
            ResponseKind::from_code(code).ok_or_else(|| {
                SearchError::Other(format!("{}: unknown response kind {}", id, code))
            })?
        }
        None => ResponseKind::default(),
    };
    let tensor = GreensTensor::new(station.clone(), origin, basis, elemental)?.with_kind(kind);

    let data = file.require("data")?;
    let npts = match data.shape() {
        [3, npts] => *npts,
        _ => {
            return Err(SearchError::DataShape {
                id: format!("{}:data", id),
                expected: vec![3, 0],
                got: data.shape().to_vec(),
            })
        }
    };
    let mut traces = Vec::with_capacity(3);
    for (c, &component) in Component::ALL.iter().enumerate() {
        let samples: Vec<f64> = (0..npts).map(|t| data[[c, t]]).collect();
        let trace = match &weights {
            Some(w) if w[c] == 0.0 => continue,
            Some(w) => Trace::new(component, samples).with_weight(w[c]),
            None => Trace::new(component, samples),
        };
        traces.push(trace);
    }
    let observed = StationData::new(station, dt, traces)?;

    debug!(
        station = %id,
        basis = ?basis,
        kind = ?kind,
        npts,
        nt,
        components = observed.traces().len(),
        "loaded station bundle"
    );
    Ok((observed, tensor))
}
