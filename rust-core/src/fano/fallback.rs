//! Non-fitting peak estimate
//!
//! Interpolates the spectrum onto a fine grid and takes the wavelength of
//! the largest intensity. Disagrees with the fitted `Ef` for asymmetric
//! lineshapes; callers pick which one they trust.

use crate::error::{PeakFitError, Result};
use crate::spectrum::{interpolate_onto, uniform_grid, Spectrum};

/// Default fine-grid step in wavelength units
pub const FALLBACK_STEP: f64 = 0.001;

/// Wavelength of maximum linearly-interpolated intensity
///
/// The grid runs from `min(x)` to `max(x)` inclusive in steps of `step`.
/// NaN intensities are skipped; ties go to the shortest wavelength.
///
/// # Errors
/// * `NoPeakFound` for an empty or all-NaN intensity array
/// * `LengthMismatch` / `NonMonotonic` for malformed input
pub fn argmax_interpolated_peak(x: &[f64], y: &[f64], step: f64) -> Result<f64> {
    if y.is_empty() {
        return Err(PeakFitError::NoPeakFound("empty intensity array".to_string()));
    }
    let spectrum = Spectrum::new("argmax", x.to_vec(), y.to_vec())?;
    argmax_peak_of(&spectrum, step)
}

/// [`argmax_interpolated_peak`] over a [`Spectrum`]
pub fn argmax_peak_of(spectrum: &Spectrum, step: f64) -> Result<f64> {
    let (first, last) = spectrum.wavelength_range();
    let grid = uniform_grid(first, last, step)?;
    let values = interpolate_onto(spectrum.wavelength(), spectrum.intensity(), &grid);

    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if v <= top => {}
            _ => best = Some((i, v)),
        }
    }

    best.map(|(i, _)| grid[i]).ok_or_else(|| {
        PeakFitError::NoPeakFound(format!(
            "'{}' has no finite intensity to maximize",
            spectrum.label()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fano::model::{FanoParams, LineshapeModel};

    #[test]
    fn test_triangle_peak() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 1.0, 3.0, 0.0];
        let peak = argmax_interpolated_peak(&x, &y, FALLBACK_STEP).unwrap();
        assert!((peak - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_and_nan_inputs() {
        assert!(matches!(
            argmax_interpolated_peak(&[], &[], FALLBACK_STEP),
            Err(PeakFitError::NoPeakFound(_))
        ));
        assert!(matches!(
            argmax_interpolated_peak(&[1.0, 2.0], &[f64::NAN, f64::NAN], FALLBACK_STEP),
            Err(PeakFitError::NoPeakFound(_))
        ));
        assert!(matches!(
            argmax_interpolated_peak(&[1.0, 2.0], &[1.0], FALLBACK_STEP),
            Err(PeakFitError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_single_sample() {
        assert_eq!(argmax_interpolated_peak(&[731.0], &[2.0], 0.01).unwrap(), 731.0);
    }

    #[test]
    fn test_differs_from_fano_center_when_asymmetric() {
        // Maximum of f sits at eps = 1/q, i.e. Ef + r / (2q)
        let truth = FanoParams::new(750.0, 5.0, 2.0, 1.0, 0.1);
        let x: Vec<f64> = (0..=200).map(|i| 700.0 + i as f64 * 0.5).collect();
        let y = LineshapeModel::Transmission.evaluate_all(&x, &truth);

        let peak = argmax_interpolated_peak(&x, &y, FALLBACK_STEP).unwrap();
        assert!((peak - 751.25).abs() < 0.5, "peak {}", peak);
        assert!((peak - truth.center).abs() > 0.5);
    }
}
