//! Spectrum container and preprocessing
//!
//! Raw spectra are normalized against the light-source spectrum and then
//! resampled onto a uniform wavelength grid inside a region of interest
//! before any peak fitting happens.

pub mod interpolate;
pub mod preprocess;

pub use interpolate::{interpolate_linear, interpolate_onto, uniform_grid};
pub use preprocess::{normalize, preprocess, resample, PreprocessConfig, Roi, DEFAULT_STEP};

use crate::error::{PeakFitError, Result};

/// A measured spectrum: wavelength axis, intensity values and a label
/// (normally the source file stem).
///
/// The wavelength axis is always non-empty, strictly ascending and the same
/// length as the intensity values. Intensities are not checked; NaN or
/// infinite values coming out of normalization are kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    label: String,
    wavelength: Vec<f64>,
    intensity: Vec<f64>,
}

impl Spectrum {
    /// Build a spectrum, validating the shape of the input
    ///
    /// # Errors
    /// * `LengthMismatch` when the two sequences differ in length
    /// * `EmptySpectrum` when there are no samples
    /// * `NonMonotonic` when the wavelength axis is not strictly ascending
    pub fn new(
        label: impl Into<String>,
        wavelength: Vec<f64>,
        intensity: Vec<f64>,
    ) -> Result<Self> {
        let label = label.into();

        if wavelength.len() != intensity.len() {
            return Err(PeakFitError::LengthMismatch {
                wavelength: wavelength.len(),
                intensity: intensity.len(),
            });
        }
        if wavelength.is_empty() {
            return Err(PeakFitError::EmptySpectrum(label));
        }
        if let Some(index) = wavelength
            .windows(2)
            .position(|pair| !(pair[1] > pair[0]))
        {
            return Err(PeakFitError::NonMonotonic {
                label,
                index: index + 1,
            });
        }

        Ok(Self {
            label,
            wavelength,
            intensity,
        })
    }

    /// Rebuild with new intensities on an axis that is already known to be valid
    pub(crate) fn with_axis(label: String, wavelength: Vec<f64>, intensity: Vec<f64>) -> Self {
        debug_assert_eq!(wavelength.len(), intensity.len());
        Self {
            label,
            wavelength,
            intensity,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    /// Number of samples (always at least one)
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    /// Always false, kept for API symmetry with slices
    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// First and last wavelength
    pub fn wavelength_range(&self) -> (f64, f64) {
        (self.wavelength[0], self.wavelength[self.wavelength.len() - 1])
    }

    /// Consume the spectrum, returning `(label, wavelength, intensity)`
    pub fn into_parts(self) -> (String, Vec<f64>, Vec<f64>) {
        (self.label, self.wavelength, self.intensity)
    }

    /// Resample this spectrum onto another wavelength axis
    ///
    /// Used to bring a light-source reference onto the sample's grid before
    /// [`normalize`]. Linear interpolation, clamped to the end values outside
    /// this spectrum's range. Never applied implicitly.
    pub fn align_to(&self, wavelength: &[f64]) -> Result<Self> {
        let intensity = interpolate_onto(&self.wavelength, &self.intensity, wavelength);
        Self::new(self.label.clone(), wavelength.to_vec(), intensity)
    }
}
