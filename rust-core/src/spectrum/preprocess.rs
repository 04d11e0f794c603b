//! Normalization against a light-source spectrum and ROI resampling

use log::debug;

use super::interpolate::{interpolate_onto, uniform_grid};
use super::Spectrum;
use crate::error::{PeakFitError, Result};

/// Default resampling step in wavelength units
pub const DEFAULT_STEP: f64 = 1.0;

/// Relative tolerance used when deciding two wavelength axes are identical
const AXIS_TOLERANCE: f64 = 1e-9;

/// Closed wavelength interval `[x_min, x_max]` selected for analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    x_min: f64,
    x_max: f64,
}

impl Roi {
    /// # Errors
    /// `EmptyRegion` when `x_max <= x_min` (or either bound is NaN)
    pub fn new(x_min: f64, x_max: f64) -> Result<Self> {
        if !(x_max > x_min) {
            return Err(PeakFitError::EmptyRegion { x_min, x_max });
        }
        Ok(Self { x_min, x_max })
    }

    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn contains(&self, wavelength: f64) -> bool {
        (self.x_min..=self.x_max).contains(&wavelength)
    }
}

/// Preprocessing configuration: ROI and resampling step
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Resampling domain
    pub roi: Roi,

    /// Grid step in wavelength units
    pub step: f64,
}

impl PreprocessConfig {
    /// ROI with the default step of 1 wavelength unit
    pub fn new(roi: Roi) -> Self {
        Self {
            roi,
            step: DEFAULT_STEP,
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }
}

fn same_axis(a: &[f64], b: &[f64]) -> Option<usize> {
    a.iter().zip(b.iter()).position(|(&x, &y)| {
        let scale = x.abs().max(y.abs()).max(1.0);
        (x - y).abs() > AXIS_TOLERANCE * scale
    })
}

/// Divide the sample intensity by the reference intensity, sample by sample
///
/// Both spectra must share the same wavelength sampling (same length, same
/// wavelengths). A reference captured on another grid has to be brought over
/// with [`Spectrum::align_to`] first; no resampling happens here.
///
/// Zero reference intensity yields inf/NaN in the output. Those values are
/// kept so the problem shows up at fit time.
///
/// # Errors
/// `MisalignedSpectra` when the two wavelength axes differ
pub fn normalize(sample: &Spectrum, reference: &Spectrum) -> Result<Spectrum> {
    if sample.len() != reference.len() {
        return Err(PeakFitError::MisalignedSpectra(format!(
            "'{}' has {} samples, reference '{}' has {}",
            sample.label(),
            sample.len(),
            reference.label(),
            reference.len()
        )));
    }
    if let Some(index) = same_axis(sample.wavelength(), reference.wavelength()) {
        return Err(PeakFitError::MisalignedSpectra(format!(
            "wavelength {} of '{}' differs from {} of reference '{}' at index {}",
            sample.wavelength()[index],
            sample.label(),
            reference.wavelength()[index],
            reference.label(),
            index
        )));
    }

    let intensity = sample
        .intensity()
        .iter()
        .zip(reference.intensity())
        .map(|(&s, &r)| s / r)
        .collect();

    Ok(Spectrum::with_axis(
        sample.label().to_string(),
        sample.wavelength().to_vec(),
        intensity,
    ))
}

/// Resample onto the uniform grid `roi.x_min, roi.x_min + step, ..., <= roi.x_max`
///
/// Intensities come from linear interpolation of the input spectrum. Grid
/// points outside the input's wavelength range take the nearest end value.
///
/// # Errors
/// `InvalidParameter` when `step` is not positive and finite
pub fn resample(spectrum: &Spectrum, roi: &Roi, step: f64) -> Result<Spectrum> {
    let grid = uniform_grid(roi.x_min(), roi.x_max(), step)?;

    let (first, last) = spectrum.wavelength_range();
    if roi.x_min() < first || roi.x_max() > last {
        debug!(
            "ROI [{}, {}] extends past '{}' range [{}, {}]; clamping to end values",
            roi.x_min(),
            roi.x_max(),
            spectrum.label(),
            first,
            last
        );
    }

    let intensity = interpolate_onto(spectrum.wavelength(), spectrum.intensity(), &grid);
    Ok(Spectrum::with_axis(
        spectrum.label().to_string(),
        grid,
        intensity,
    ))
}

/// Normalize against the light source, then resample onto the ROI grid
pub fn preprocess(
    sample: &Spectrum,
    reference: &Spectrum,
    config: &PreprocessConfig,
) -> Result<Spectrum> {
    let normalized = normalize(sample, reference)?;
    resample(&normalized, &config.roi, config.step)
}
