//! Python bindings for Fano fitting

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use numpy::{PyArray1, PyReadonlyArray1};

use super::spectrum_bindings::to_vec;
use crate::fano::{self, FanoParams, FitConfig, LineshapeModel, PARAM_COUNT};
use crate::shift;

fn params_from_array(params: &PyReadonlyArray1<f64>) -> PyResult<FanoParams> {
    let values = to_vec(params);
    let array: [f64; PARAM_COUNT] = values.as_slice().try_into().map_err(|_| {
        PyValueError::new_err(format!(
            "expected {} Fano parameters (Ef, r, q, amplitude, offset), got {}",
            PARAM_COUNT,
            values.len()
        ))
    })?;
    Ok(FanoParams::from_array(array))
}

fn params_to_array<'py>(py: Python<'py>, params: &FanoParams) -> &'py PyArray1<f64> {
    PyArray1::from_vec(py, params.to_array().to_vec())
}

/// Multi-start Fano fitter exposed to Python
#[pyclass(name = "FanoFitter")]
pub struct PyFanoFitter {
    config: FitConfig,
}

#[pymethods]
impl PyFanoFitter {
    /// Create a new fitter
    ///
    /// Args:
    ///     restarts: Number of random starting points (default: 300)
    ///     seed: RNG seed; None draws a fresh seed from the OS on every search
    ///     model: "transmission" or "absorption"
    ///     max_iterations: Iteration cap for each local fit
    #[new]
    #[pyo3(signature = (restarts=300, seed=None, model="transmission", max_iterations=200))]
    fn new(
        restarts: usize,
        seed: Option<u64>,
        model: &str,
        max_iterations: usize,
    ) -> PyResult<Self> {
        let model: LineshapeModel = model.parse()?;
        let config = FitConfig {
            restarts,
            seed,
            model,
            max_iterations,
            ..FitConfig::default()
        };

        Ok(Self { config })
    }

    /// Best parameters over all random starts
    ///
    /// Returns:
    ///     numpy array [Ef, r, q, amplitude, offset]
    fn best_initial_guess<'py>(
        &self,
        py: Python<'py>,
        x: PyReadonlyArray1<f64>,
        y: PyReadonlyArray1<f64>,
    ) -> PyResult<&'py PyArray1<f64>> {
        let (x, y) = (to_vec(&x), to_vec(&y));
        let params = py.allow_threads(|| fano::best_initial_guess(&x, &y, &self.config))?;
        Ok(params_to_array(py, &params))
    }

    /// Single fit seeded with params0
    ///
    /// Returns:
    ///     (params, peak_wavelength); peak_wavelength is the fitted Ef
    fn fit_peak<'py>(
        &self,
        py: Python<'py>,
        x: PyReadonlyArray1<f64>,
        y: PyReadonlyArray1<f64>,
        params0: PyReadonlyArray1<f64>,
    ) -> PyResult<(&'py PyArray1<f64>, f64)> {
        let params0 = params_from_array(&params0)?;
        let (x, y) = (to_vec(&x), to_vec(&y));
        let fit = py.allow_threads(|| fano::fit_peak(&x, &y, &params0, &self.config))?;
        Ok((params_to_array(py, &fit.params), fit.resonant_wavelength))
    }

    /// Multi-start search followed by the final fit
    ///
    /// Returns:
    ///     (params, peak_wavelength, cost)
    fn fit<'py>(
        &self,
        py: Python<'py>,
        x: PyReadonlyArray1<f64>,
        y: PyReadonlyArray1<f64>,
    ) -> PyResult<(&'py PyArray1<f64>, f64, f64)> {
        let (x, y) = (to_vec(&x), to_vec(&y));
        let fit = py.allow_threads(|| {
            let params0 = fano::best_initial_guess(&x, &y, &self.config)?;
            fano::fit_peak(&x, &y, &params0, &self.config)
        })?;
        Ok((params_to_array(py, &fit.params), fit.resonant_wavelength, fit.cost))
    }

    /// Get number of random starts
    fn get_restarts(&self) -> usize {
        self.config.restarts
    }

    /// Get RNG seed (None when seeded from the OS)
    fn get_seed(&self) -> Option<u64> {
        self.config.seed
    }
}

/// Evaluate the Fano lineshape
///
/// Args:
///     x: Wavelengths
///     center, width, q, amplitude, offset: Fano parameters
///     model: "transmission" or "absorption"
#[pyfunction]
#[pyo3(name = "fano", signature = (x, center, width, q, amplitude, offset, model="transmission"))]
pub fn fano_lineshape<'py>(
    py: Python<'py>,
    x: PyReadonlyArray1<f64>,
    center: f64,
    width: f64,
    q: f64,
    amplitude: f64,
    offset: f64,
    model: &str,
) -> PyResult<&'py PyArray1<f64>> {
    let model: LineshapeModel = model.parse()?;
    let params = FanoParams::new(center, width, q, amplitude, offset);
    Ok(PyArray1::from_vec(py, model.evaluate_all(&to_vec(&x), &params)))
}

/// Wavelength of maximum interpolated intensity (no fitting)
#[pyfunction]
#[pyo3(signature = (x, y, step=0.001))]
pub fn argmax_interpolated_peak(
    x: PyReadonlyArray1<f64>,
    y: PyReadonlyArray1<f64>,
    step: f64,
) -> PyResult<f64> {
    Ok(fano::argmax_interpolated_peak(&to_vec(&x), &to_vec(&y), step)?)
}

/// sample - reference, or None when either is None
#[pyfunction]
pub fn peak_shift(sample: Option<f64>, reference: Option<f64>) -> Option<f64> {
    shift::peak_shift(sample, reference)
}
