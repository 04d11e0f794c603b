//! Fano resonance lineshape
//!
//! ```text
//! eps(E) = 2 (E - Ef) / r
//! f(E)   = (eps + q)^2 / (eps^2 + 1)
//! T(E)   = T * f(E) + offset          transmission form
//! A(E)   = A * (1 - f(E)) + offset    absorption form
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::PeakFitError;

/// Number of free lineshape parameters
pub const PARAM_COUNT: usize = 5;

/// Fano lineshape parameters
///
/// Array order everywhere in the crate is `[center, width, q, amplitude, offset]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanoParams {
    /// Resonant center wavelength (Ef)
    pub center: f64,

    /// Linewidth (r)
    pub width: f64,

    /// Asymmetry / shape factor (q)
    pub q: f64,

    /// Transmission or absorption amplitude
    pub amplitude: f64,

    /// DC baseline
    pub offset: f64,
}

impl FanoParams {
    pub fn new(center: f64, width: f64, q: f64, amplitude: f64, offset: f64) -> Self {
        Self {
            center,
            width,
            q,
            amplitude,
            offset,
        }
    }

    pub fn from_array(p: [f64; PARAM_COUNT]) -> Self {
        Self::new(p[0], p[1], p[2], p[3], p[4])
    }

    pub fn to_array(&self) -> [f64; PARAM_COUNT] {
        [self.center, self.width, self.q, self.amplitude, self.offset]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Which Fano form the residuals are computed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineshapeModel {
    /// `T * f(E) + offset`
    #[default]
    Transmission,

    /// `A * (1 - f(E)) + offset`
    Absorption,
}

/// Dimensionless Fano factor `f(E)`
#[inline]
pub fn fano_factor(e: f64, center: f64, width: f64, q: f64) -> f64 {
    let eps = 2.0 * (e - center) / width;
    (eps + q) * (eps + q) / (eps * eps + 1.0)
}

impl LineshapeModel {
    /// Evaluate the lineshape at a single wavelength
    #[inline]
    pub fn evaluate(&self, e: f64, params: &FanoParams) -> f64 {
        let f = fano_factor(e, params.center, params.width, params.q);
        match self {
            LineshapeModel::Transmission => params.amplitude * f + params.offset,
            LineshapeModel::Absorption => params.amplitude * (1.0 - f) + params.offset,
        }
    }

    /// Evaluate the lineshape over a wavelength axis
    pub fn evaluate_all(&self, wavelength: &[f64], params: &FanoParams) -> Vec<f64> {
        wavelength.iter().map(|&e| self.evaluate(e, params)).collect()
    }

    /// Model value and its partial derivatives with respect to
    /// `[center, width, q, amplitude, offset]`
    #[inline]
    pub(crate) fn value_and_gradient(
        &self,
        e: f64,
        p: &[f64; PARAM_COUNT],
    ) -> (f64, [f64; PARAM_COUNT]) {
        let [center, width, q, amplitude, offset] = *p;

        let eps = 2.0 * (e - center) / width;
        let u = eps + q;
        let d = eps * eps + 1.0;
        let f = u * u / d;

        // df/deps = 2u (1 - q eps) / d^2
        let df_deps = 2.0 * u * (1.0 - q * eps) / (d * d);
        let df_dcenter = df_deps * (-2.0 / width);
        let df_dwidth = df_deps * (-eps / width);
        let df_dq = 2.0 * u / d;

        match self {
            LineshapeModel::Transmission => (
                amplitude * f + offset,
                [
                    amplitude * df_dcenter,
                    amplitude * df_dwidth,
                    amplitude * df_dq,
                    f,
                    1.0,
                ],
            ),
            LineshapeModel::Absorption => (
                amplitude * (1.0 - f) + offset,
                [
                    -amplitude * df_dcenter,
                    -amplitude * df_dwidth,
                    -amplitude * df_dq,
                    1.0 - f,
                    1.0,
                ],
            ),
        }
    }
}

impl fmt::Display for LineshapeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineshapeModel::Transmission => write!(f, "transmission"),
            LineshapeModel::Absorption => write!(f, "absorption"),
        }
    }
}

impl FromStr for LineshapeModel {
    type Err = PeakFitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transmission" | "t" => Ok(LineshapeModel::Transmission),
            "absorption" | "a" => Ok(LineshapeModel::Absorption),
            other => Err(PeakFitError::InvalidParameter(format!(
                "unknown lineshape model '{other}' (expected 'transmission' or 'absorption')"
            ))),
        }
    }
}
