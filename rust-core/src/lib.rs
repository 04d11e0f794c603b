//! GMR Peak Fit - resonance tracking core
//!
//! Normalizes and resamples grating-coupled resonance spectra, fits a Fano
//! lineshape with a multi-start least-squares search and reports resonance
//! shifts against a reference spectrum. Python bindings behind the `python`
//! feature.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![cfg_attr(feature = "python", allow(non_local_definitions))]

pub mod error;
pub mod spectrum;
pub mod fano;
pub mod shift;
pub mod timestamp;
pub mod sensitivity;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use error::{PeakFitError, Result};
pub use spectrum::{normalize, preprocess, resample, PreprocessConfig, Roi, Spectrum};
pub use fano::{
    argmax_interpolated_peak, best_initial_guess, fit_peak, fit_spectrum, FanoParams, FitConfig,
    FitResult, LineshapeModel,
};
pub use shift::{peak_shift, PeakRecord, PeakTracker};
