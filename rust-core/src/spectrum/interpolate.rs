//! Linear interpolation and uniform grids
//!
//! Values outside the sampled range are clamped to the nearest end sample,
//! never extrapolated along the end segments.

use crate::error::{PeakFitError, Result};

/// Slack applied when counting grid points so that e.g. (800 - 700) / 0.1
/// still yields the end point despite rounding
const GRID_EPSILON: f64 = 1e-9;

/// Largest grid `uniform_grid` will build
pub const MAX_GRID_POINTS: usize = 10_000_000;

/// Interpolate `fp(xp)` at `x`
///
/// `xp` must be non-empty and strictly ascending (guaranteed for any
/// [`Spectrum`](super::Spectrum) axis).
///
/// # Returns
/// * `fp[0]` for `x <= xp[0]`
/// * `fp[last]` for `x >= xp[last]`
/// * NaN for NaN `x`
pub fn interpolate_linear(xp: &[f64], fp: &[f64], x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }

    let upper = xp.partition_point(|&v| v <= x);
    if upper == 0 {
        return fp[0];
    }
    if upper == xp.len() {
        return fp[xp.len() - 1];
    }

    let lower = upper - 1;
    let t = (x - xp[lower]) / (xp[upper] - xp[lower]);
    fp[lower] + t * (fp[upper] - fp[lower])
}

/// Interpolate `fp(xp)` at every point of `grid`
pub fn interpolate_onto(xp: &[f64], fp: &[f64], grid: &[f64]) -> Vec<f64> {
    grid.iter()
        .map(|&x| interpolate_linear(xp, fp, x))
        .collect()
}

/// Build `start, start + step, ...` up to and including `end`
///
/// Holds `floor((end - start) / step) + 1` points. Each point is computed as
/// `start + i * step` so rounding does not accumulate along the grid.
pub fn uniform_grid(start: f64, end: f64, step: f64) -> Result<Vec<f64>> {
    if !(step > 0.0) || !step.is_finite() {
        return Err(PeakFitError::InvalidParameter(format!(
            "grid step must be positive and finite, got {step}"
        )));
    }
    if !start.is_finite() || !end.is_finite() {
        return Err(PeakFitError::InvalidParameter(format!(
            "grid bounds must be finite, got [{start}, {end}]"
        )));
    }
    if end < start {
        return Err(PeakFitError::EmptyRegion {
            x_min: start,
            x_max: end,
        });
    }

    let intervals = ((end - start) / step + GRID_EPSILON).floor();
    let count = if intervals.is_finite() && intervals < MAX_GRID_POINTS as f64 {
        (intervals as usize).checked_add(1)
    } else {
        None
    };
    let count = count.filter(|&n| n <= MAX_GRID_POINTS).ok_or_else(|| {
        PeakFitError::InvalidParameter(format!(
            "grid [{start}, {end}] with step {step} exceeds {MAX_GRID_POINTS} points"
        ))
    })?;

    Ok((0..count).map(|i| start + i as f64 * step).collect())
}
