//! PyO3 bindings for Python integration

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::PeakFitError;

mod fit_bindings;
mod spectrum_bindings;

impl From<PeakFitError> for PyErr {
    fn from(err: PeakFitError) -> Self {
        match err {
            PeakFitError::FitConvergence(_) | PeakFitError::NoPeakFound(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Python module definition
#[pymodule]
fn gmr_peakfit(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<fit_bindings::PyFanoFitter>()?;

    m.add_function(wrap_pyfunction!(spectrum_bindings::normalize, m)?)?;
    m.add_function(wrap_pyfunction!(spectrum_bindings::resample, m)?)?;
    m.add_function(wrap_pyfunction!(fit_bindings::fano_lineshape, m)?)?;
    m.add_function(wrap_pyfunction!(fit_bindings::argmax_interpolated_peak, m)?)?;
    m.add_function(wrap_pyfunction!(fit_bindings::peak_shift, m)?)?;

    Ok(())
}
