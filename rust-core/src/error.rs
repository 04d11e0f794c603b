//! Error types shared by preprocessing, fitting and series tracking

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeakFitError {
    #[error("Sample and reference spectra are not on the same wavelength grid: {0}")]
    MisalignedSpectra(String),

    #[error("Region of interest is empty: x_max ({x_max}) must be greater than x_min ({x_min})")]
    EmptyRegion { x_min: f64, x_max: f64 },

    #[error("Fano fit did not converge: {0}")]
    FitConvergence(String),

    #[error("No peak found: {0}")]
    NoPeakFound(String),

    #[error("Wavelength and intensity lengths differ ({wavelength} vs {intensity})")]
    LengthMismatch { wavelength: usize, intensity: usize },

    #[error("Spectrum '{0}' contains no samples")]
    EmptySpectrum(String),

    #[error("Wavelength axis of '{label}' is not strictly ascending at index {index}")]
    NonMonotonic { label: String, index: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Cannot parse capture time from '{0}'")]
    InvalidTimestamp(String),

    #[error("Not enough data points: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, PeakFitError>;
