//! Multi-start Fano fitting
//!
//! `best_initial_guess` draws random parameter vectors, polishes each with a
//! local least-squares run and keeps the lowest-cost result. `fit_peak` then
//! runs one more fit from that guess and reports the converged center
//! wavelength as the resonance.
//!
//! Candidates are drawn uniformly from `[-span/2, span/2]` for every
//! parameter, center wavelength included. Most draws land far from the
//! data's wavelength range and are wasted work; the restart count is what
//! compensates for that.

use log::{debug, warn};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::model::{FanoParams, LineshapeModel, PARAM_COUNT};
use super::solver::{least_squares, LocalFit, SolverOptions};
use crate::error::{PeakFitError, Result};
use crate::spectrum::Spectrum;

/// Number of random starting points
pub const DEFAULT_RESTARTS: usize = 300;

/// Width of the uniform draw for each parameter (values in [-1000, 1000])
pub const DEFAULT_GUESS_SPAN: f64 = 2000.0;

/// Seed used by `FitConfig::default()`
pub const DEFAULT_SEED: u64 = 0x6d72_5f66_616e_6f00;

/// Multi-start fit configuration
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Number of random starting points for `best_initial_guess`
    pub restarts: usize,

    /// Width of the uniform interval every start parameter is drawn from
    pub guess_span: f64,

    /// RNG seed; `None` seeds from OS entropy and makes results vary per run
    pub seed: Option<u64>,

    /// Residual model
    pub model: LineshapeModel,

    /// Iteration cap for each local fit
    pub max_iterations: usize,

    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        let solver = SolverOptions::default();
        Self {
            restarts: DEFAULT_RESTARTS,
            guess_span: DEFAULT_GUESS_SPAN,
            seed: Some(DEFAULT_SEED),
            model: LineshapeModel::Transmission,
            max_iterations: solver.max_iterations,
            ftol: solver.ftol,
            xtol: solver.xtol,
            gtol: solver.gtol,
        }
    }
}

impl FitConfig {
    /// Default configuration with a specific seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Default configuration drawing its seed from the OS
    pub fn unseeded() -> Self {
        Self {
            seed: None,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: LineshapeModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            max_iterations: self.max_iterations,
            ftol: self.ftol,
            xtol: self.xtol,
            gtol: self.gtol,
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Converged Fano fit of one spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub params: FanoParams,

    /// Sum of squared residuals
    pub cost: f64,

    /// Converged center `Ef`. This is not the wavelength of maximum fitted
    /// intensity; the two only coincide for large `q`.
    pub resonant_wavelength: f64,
}

impl FitResult {
    fn from_local(local: &LocalFit) -> Self {
        let params = FanoParams::from_array(local.params);
        Self {
            params,
            cost: local.cost,
            resonant_wavelength: params.center,
        }
    }
}

fn validate_xy(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(PeakFitError::LengthMismatch {
            wavelength: x.len(),
            intensity: y.len(),
        });
    }
    if x.len() < PARAM_COUNT {
        return Err(PeakFitError::InsufficientData {
            needed: PARAM_COUNT,
            got: x.len(),
        });
    }
    Ok(())
}

/// Draw `restarts` candidate vectors, one row each, in parameter order
fn draw_candidates(config: &FitConfig) -> Array2<f64> {
    let mut rng = config.rng();
    let span = config.guess_span;
    Array2::from_shape_simple_fn((config.restarts, PARAM_COUNT), || {
        span * (rng.random::<f64>() - 0.5)
    })
}

/// Index of the first minimum cost among successful candidates
fn first_min_cost(outcomes: &[Option<LocalFit>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, outcome) in outcomes.iter().enumerate() {
        let Some(fit) = outcome else { continue };
        if !fit.cost.is_finite() || !fit.params.iter().all(|p| p.is_finite()) {
            continue;
        }
        match best {
            Some((_, cost)) if fit.cost >= cost => {}
            _ => best = Some((i, fit.cost)),
        }
    }
    best.map(|(i, _)| i)
}

/// Lowest-cost local fit over all random starts
///
/// Candidate fits that hit the iteration cap still compete on cost; only
/// candidates whose residuals are not finite are dropped.
///
/// # Errors
/// * `LengthMismatch` / `InsufficientData` for malformed input
/// * `InvalidParameter` when `restarts` is zero
/// * `FitConvergence` when every candidate failed
pub fn best_candidate(x: &[f64], y: &[f64], config: &FitConfig) -> Result<FitResult> {
    validate_xy(x, y)?;
    if config.restarts == 0 {
        return Err(PeakFitError::InvalidParameter(
            "restarts must be at least 1".to_string(),
        ));
    }

    let starts: Vec<[f64; PARAM_COUNT]> = draw_candidates(config)
        .outer_iter()
        .map(|row| {
            let mut p = [0.0; PARAM_COUNT];
            for (dst, &src) in p.iter_mut().zip(row.iter()) {
                *dst = src;
            }
            p
        })
        .collect();

    let options = config.solver_options();
    let outcomes: Vec<Option<LocalFit>> = starts
        .par_iter()
        .map(|&p0| least_squares(config.model, x, y, p0, &options).ok())
        .collect();

    let failed = outcomes.iter().filter(|o| o.is_none()).count();
    let Some(best) = first_min_cost(&outcomes) else {
        return Err(PeakFitError::FitConvergence(format!(
            "all {} random starts failed",
            config.restarts
        )));
    };

    let winner = outcomes[best]
        .as_ref()
        .map(FitResult::from_local)
        .ok_or_else(|| PeakFitError::FitConvergence("best candidate vanished".to_string()))?;

    debug!(
        "multi-start: best of {} starts is #{} (cost {:.3e}, Ef {:.4}), {} failed",
        config.restarts, best, winner.cost, winner.resonant_wavelength, failed
    );

    Ok(winner)
}

/// Parameter vector to seed [`fit_peak`] with
pub fn best_initial_guess(x: &[f64], y: &[f64], config: &FitConfig) -> Result<FanoParams> {
    best_candidate(x, y, config).map(|fit| fit.params)
}

/// Single local Fano fit seeded with `params0`
///
/// # Errors
/// `FitConvergence` when the solver hits its iteration cap, cannot solve the
/// damped normal equations, or sees non-finite residuals
pub fn fit_peak(
    x: &[f64],
    y: &[f64],
    params0: &FanoParams,
    config: &FitConfig,
) -> Result<FitResult> {
    validate_xy(x, y)?;

    let local = least_squares(
        config.model,
        x,
        y,
        params0.to_array(),
        &config.solver_options(),
    )?;

    if !local.termination.is_converged() {
        return Err(PeakFitError::FitConvergence(format!(
            "solver stopped with {:?} after {} iterations",
            local.termination, local.iterations
        )));
    }
    if !local.params.iter().all(|p| p.is_finite()) {
        return Err(PeakFitError::FitConvergence(
            "solver returned non-finite parameters".to_string(),
        ));
    }

    let result = FitResult::from_local(&local);
    debug!(
        "fit_peak: Ef = {:.4} after {} iterations ({:?}), cost {:.3e}",
        result.resonant_wavelength, local.iterations, local.termination, result.cost
    );
    Ok(result)
}

/// Multi-start guess followed by the final fit
pub fn fit_spectrum(spectrum: &Spectrum, config: &FitConfig) -> Result<FitResult> {
    let x = spectrum.wavelength();
    let y = spectrum.intensity();

    best_initial_guess(x, y, config)
        .and_then(|params0| fit_peak(x, y, &params0, config))
        .map_err(|e| {
            warn!("Fano fit of '{}' failed: {}", spectrum.label(), e);
            e
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(truth: FanoParams) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..=100).map(|i| 700.0 + i as f64).collect();
        let y = LineshapeModel::Transmission.evaluate_all(&x, &truth);
        (x, y)
    }

    #[test]
    fn test_same_seed_same_result() {
        let (x, y) = synthetic(FanoParams::new(750.0, 5.0, 2.0, 1.0, 0.1));
        let config = FitConfig::seeded(7).with_restarts(40);

        let a = best_candidate(&x, &y, &config).unwrap();
        let b = best_candidate(&x, &y, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_candidates_follow_span() {
        let config = FitConfig::seeded(1).with_restarts(500);
        let c = draw_candidates(&config);

        assert_eq!(c.dim(), (500, PARAM_COUNT));
        assert!(c.iter().all(|&v| (-1000.0..1000.0).contains(&v)));
        // Spread covers most of the interval
        assert!(c.iter().any(|&v| v > 900.0));
        assert!(c.iter().any(|&v| v < -900.0));
    }

    #[test]
    fn test_first_minimum_wins_ties() {
        let fit = |cost| {
            Some(LocalFit {
                params: [0.0; PARAM_COUNT],
                cost,
                iterations: 1,
                termination: super::super::solver::Termination::Gradient,
            })
        };
        let outcomes = vec![fit(3.0), None, fit(1.0), fit(f64::NAN), fit(1.0)];
        assert_eq!(first_min_cost(&outcomes), Some(2));
        assert_eq!(first_min_cost(&[None, None]), None);
    }

    #[test]
    fn test_recovers_center() {
        let (x, y) = synthetic(FanoParams::new(750.0, 5.0, 2.0, 1.0, 0.1));
        let config = FitConfig::default();

        let params0 = best_initial_guess(&x, &y, &config).unwrap();
        let fit = fit_peak(&x, &y, &params0, &config).unwrap();

        assert!((fit.resonant_wavelength - 750.0).abs() < 0.5);
        assert_eq!(fit.resonant_wavelength, fit.params.center);
        assert!(fit.cost < 1e-6);
    }

    #[test]
    fn test_recovers_center_across_seeds() {
        let (x, y) = synthetic(FanoParams::new(750.0, 5.0, 2.0, 1.0, 0.1));

        let hits = (0..20u64)
            .filter(|&seed| {
                let config = FitConfig::seeded(seed);
                best_initial_guess(&x, &y, &config)
                    .and_then(|p0| fit_peak(&x, &y, &p0, &config))
                    .map(|fit| (fit.resonant_wavelength - 750.0).abs() < 0.5)
                    .unwrap_or(false)
            })
            .count();

        assert!(hits >= 19, "only {} of 20 seeded runs recovered Ef", hits);
    }

    #[test]
    fn test_absorption_model_fit() {
        let truth = FanoParams::new(765.0, 6.0, 1.5, 0.8, 0.3);
        let x: Vec<f64> = (0..=100).map(|i| 700.0 + i as f64).collect();
        let y = LineshapeModel::Absorption.evaluate_all(&x, &truth);

        let config = FitConfig::seeded(3).with_model(LineshapeModel::Absorption);
        let params0 = best_initial_guess(&x, &y, &config).unwrap();
        let fit = fit_peak(&x, &y, &params0, &config).unwrap();

        assert!((fit.resonant_wavelength - 765.0).abs() < 0.5);
    }

    #[test]
    fn test_malformed_input() {
        let config = FitConfig::default();
        assert!(matches!(
            best_initial_guess(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0; 4], &config),
            Err(PeakFitError::LengthMismatch { .. })
        ));
        assert!(matches!(
            best_initial_guess(&[], &[], &config),
            Err(PeakFitError::InsufficientData { got: 0, .. })
        ));

        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0; 5];
        assert!(matches!(
            best_initial_guess(&x, &y, &config.clone().with_restarts(0)),
            Err(PeakFitError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_nan_spectrum_fails_to_fit() {
        let (x, mut y) = synthetic(FanoParams::new(750.0, 5.0, 2.0, 1.0, 0.1));
        y[0] = f64::NAN;

        let config = FitConfig::seeded(11).with_restarts(10);
        assert!(matches!(
            best_initial_guess(&x, &y, &config),
            Err(PeakFitError::FitConvergence(_))
        ));
        assert!(matches!(
            fit_peak(&x, &y, &FanoParams::new(750.0, 5.0, 2.0, 1.0, 0.1), &config),
            Err(PeakFitError::FitConvergence(_))
        ));
    }

    #[test]
    fn test_fit_spectrum() {
        let (x, y) = synthetic(FanoParams::new(742.0, 4.0, 3.0, 0.5, 0.2));
        let spectrum = Spectrum::new("sample", x, y).unwrap();

        let fit = fit_spectrum(&spectrum, &FitConfig::seeded(5)).unwrap();
        assert!((fit.resonant_wavelength - 742.0).abs() < 0.5);
    }

    #[test]
    fn test_fit_spectrum_reports_guess_failures() {
        let _ = env_logger::builder().is_test(true).try_init();

        let x: Vec<f64> = (0..4).map(|i| 700.0 + i as f64).collect();
        let short = Spectrum::new("short", x, vec![1.0; 4]).unwrap();
        assert!(matches!(
            fit_spectrum(&short, &FitConfig::seeded(5)),
            Err(PeakFitError::InsufficientData { needed: 5, got: 4 })
        ));

        let (x, y) = synthetic(FanoParams::new(742.0, 4.0, 3.0, 0.5, 0.2));
        let spectrum = Spectrum::new("sample", x, y).unwrap();
        assert!(matches!(
            fit_spectrum(&spectrum, &FitConfig::seeded(5).with_restarts(0)),
            Err(PeakFitError::InvalidParameter(_))
        ));
    }
}
