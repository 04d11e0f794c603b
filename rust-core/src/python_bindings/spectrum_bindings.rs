//! Python bindings for spectrum preprocessing

use pyo3::prelude::*;
use numpy::{PyArray1, PyReadonlyArray1};

use crate::spectrum::{self, Roi, Spectrum};

/// Copy a numpy array (contiguous or not) into a Vec
pub(super) fn to_vec(array: &PyReadonlyArray1<f64>) -> Vec<f64> {
    array.as_array().to_vec()
}

/// Divide a spectrum by a light-source spectrum on the same wavelength grid
///
/// Args:
///     wavelength: Sample wavelengths (ascending)
///     intensity: Sample intensities
///     reference_wavelength: Light-source wavelengths (same grid as sample)
///     reference_intensity: Light-source intensities
///
/// Returns:
///     Normalized intensity as numpy array
#[pyfunction]
pub fn normalize<'py>(
    py: Python<'py>,
    wavelength: PyReadonlyArray1<f64>,
    intensity: PyReadonlyArray1<f64>,
    reference_wavelength: PyReadonlyArray1<f64>,
    reference_intensity: PyReadonlyArray1<f64>,
) -> PyResult<&'py PyArray1<f64>> {
    let sample = Spectrum::new("sample", to_vec(&wavelength), to_vec(&intensity))?;
    let reference = Spectrum::new(
        "reference",
        to_vec(&reference_wavelength),
        to_vec(&reference_intensity),
    )?;

    let normalized = spectrum::normalize(&sample, &reference)?;
    let (_, _, values) = normalized.into_parts();
    Ok(PyArray1::from_vec(py, values))
}

/// Resample onto a uniform grid inside a region of interest
///
/// Args:
///     wavelength: Wavelengths (ascending)
///     intensity: Intensities
///     x_min: ROI start
///     x_max: ROI end (inclusive when on the grid)
///     step: Grid step (default: 1.0)
///
/// Returns:
///     (wavelength, intensity) numpy arrays
#[pyfunction]
#[pyo3(signature = (wavelength, intensity, x_min, x_max, step=1.0))]
pub fn resample<'py>(
    py: Python<'py>,
    wavelength: PyReadonlyArray1<f64>,
    intensity: PyReadonlyArray1<f64>,
    x_min: f64,
    x_max: f64,
    step: f64,
) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
    let input = Spectrum::new("spectrum", to_vec(&wavelength), to_vec(&intensity))?;
    let roi = Roi::new(x_min, x_max)?;

    let (_, grid, values) = spectrum::resample(&input, &roi, step)?.into_parts();
    Ok((PyArray1::from_vec(py, grid), PyArray1::from_vec(py, values)))
}
