//! Bulk refractive-index sensitivity
//!
//! Straight-line fit of background peak shift against the refractive index
//! of the calibration solutions. The slope is the sensor's sensitivity in
//! wavelength units per RIU.

use ndarray::ArrayView1;

use crate::error::{PeakFitError, Result};

/// Least-squares line `shift = slope * index + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensitivityFit {
    /// Wavelength shift per refractive index unit
    pub slope: f64,
    pub intercept: f64,
}

/// Fit peak shift against refractive index
///
/// `slope = (mean(x) mean(y) - mean(xy)) / (mean(x)^2 - mean(x^2))`
///
/// # Errors
/// * `LengthMismatch` when the inputs differ in length
/// * `InsufficientData` for fewer than two points
/// * `InvalidParameter` when every refractive index is the same
pub fn bulk_sensitivity(refractive_index: &[f64], peak_shift: &[f64]) -> Result<SensitivityFit> {
    if refractive_index.len() != peak_shift.len() {
        return Err(PeakFitError::LengthMismatch {
            wavelength: refractive_index.len(),
            intensity: peak_shift.len(),
        });
    }
    if refractive_index.len() < 2 {
        return Err(PeakFitError::InsufficientData {
            needed: 2,
            got: refractive_index.len(),
        });
    }

    let x = ArrayView1::from(refractive_index);
    let y = ArrayView1::from(peak_shift);
    let xy = &x * &y;
    let x2 = x.mapv(|v| v * v);

    // Non-empty, so the means exist
    let mean = |a: ArrayView1<f64>| a.sum() / a.len() as f64;
    let (mx, my) = (mean(x), mean(y));
    let (mxy, mx2) = (mean(xy.view()), mean(x2.view()));

    let denominator = mx * mx - mx2;
    if denominator.abs() <= 1e-12 * mx2.abs().max(1.0) {
        return Err(PeakFitError::InvalidParameter(
            "refractive index values have no spread".to_string(),
        ));
    }

    let slope = (mx * my - mxy) / denominator;
    Ok(SensitivityFit {
        slope,
        intercept: my - slope * mx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let riu = [1.333, 1.338, 1.343, 1.352];
        let shift: Vec<f64> = riu.iter().map(|n| 120.0 * n - 159.96).collect();

        let fit = bulk_sensitivity(&riu, &shift).unwrap();
        assert!((fit.slope - 120.0).abs() < 1e-6, "slope {}", fit.slope);
        assert!((fit.intercept + 159.96).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(matches!(
            bulk_sensitivity(&[1.33], &[0.0]),
            Err(PeakFitError::InsufficientData { needed: 2, got: 1 })
        ));
        assert!(matches!(
            bulk_sensitivity(&[1.33, 1.33, 1.33], &[0.0, 1.0, 2.0]),
            Err(PeakFitError::InvalidParameter(_))
        ));
        assert!(matches!(
            bulk_sensitivity(&[1.33, 1.34], &[0.0]),
            Err(PeakFitError::LengthMismatch { .. })
        ));
    }
}
