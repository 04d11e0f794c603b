//! Levenberg-Marquardt least squares for the 5-parameter Fano model
//!
//! Minimizes `sum((model(x; p) - y)^2)` with an analytic Jacobian,
//! Marquardt diagonal scaling and Nielsen's damping update.

use super::model::{LineshapeModel, PARAM_COUNT};
use crate::error::{PeakFitError, Result};

const N: usize = PARAM_COUNT;

/// Starting damping factor (dimensionless, scales diag(JᵀJ))
const INITIAL_DAMPING: f64 = 1e-3;

/// Damping beyond which no useful step can be found any more
const MAX_DAMPING: f64 = 1e16;

/// Floor for diag(JᵀJ) entries so a dead parameter still gets damped
const MIN_DIAGONAL: f64 = 1e-12;

/// Stopping criteria for the local solver
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions {
    /// Iteration cap (accepted plus rejected steps)
    pub max_iterations: usize,

    /// Relative cost reduction (achieved and predicted) below which an
    /// accepted step ends the search
    pub ftol: f64,

    /// Relative step size below which the search ends
    pub xtol: f64,

    /// Infinity norm of the gradient below which the search ends
    pub gtol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
        }
    }
}

/// Why the solver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Gradient vanished
    Gradient,
    /// Step became negligible relative to the parameters
    Step,
    /// Cost reduction became negligible
    Cost,
    /// No step reduces the cost any further at any damping
    Stalled,
    /// Damped normal equations could not be solved at any damping
    Singular,
    /// Iteration cap reached before any criterion was met
    MaxIterations,
}

impl Termination {
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            Termination::Gradient | Termination::Step | Termination::Cost | Termination::Stalled
        )
    }
}

/// Outcome of one local minimization
#[derive(Debug, Clone, Copy)]
pub struct LocalFit {
    pub params: [f64; N],

    /// Sum of squared residuals at `params`
    pub cost: f64,

    pub iterations: usize,

    pub termination: Termination,
}

struct Linearization {
    cost: f64,
    /// JᵀJ
    normal: [[f64; N]; N],
    /// Jᵀr
    gradient: [f64; N],
}

fn linearize(model: LineshapeModel, x: &[f64], y: &[f64], p: &[f64; N]) -> Linearization {
    let mut cost = 0.0;
    let mut normal = [[0.0; N]; N];
    let mut gradient = [0.0; N];

    for (&xi, &yi) in x.iter().zip(y) {
        let (value, row) = model.value_and_gradient(xi, p);
        let r = value - yi;
        cost += r * r;
        for a in 0..N {
            gradient[a] += row[a] * r;
            for b in 0..=a {
                normal[a][b] += row[a] * row[b];
            }
        }
    }
    for a in 0..N {
        for b in 0..a {
            normal[b][a] = normal[a][b];
        }
    }

    Linearization {
        cost,
        normal,
        gradient,
    }
}

fn sum_of_squares(model: LineshapeModel, x: &[f64], y: &[f64], p: &[f64; N]) -> f64 {
    let mut cost = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let (value, _) = model.value_and_gradient(xi, p);
        let r = value - yi;
        cost += r * r;
    }
    cost
}

/// Solve `a · x = b` for symmetric positive definite `a` (Cholesky)
///
/// Returns `None` when `a` is not numerically positive definite.
fn cholesky_solve(a: &[[f64; N]; N], b: &[f64; N]) -> Option<[f64; N]> {
    let mut l = [[0.0; N]; N];

    for i in 0..N {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if !(sum > 0.0) || !sum.is_finite() {
                    return None;
                }
                l[i][i] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L z = b
    let mut z = [0.0; N];
    for i in 0..N {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i][k] * z[k];
        }
        z[i] = sum / l[i][i];
    }

    // Back substitution: Lᵀ x = z
    let mut x = [0.0; N];
    for i in (0..N).rev() {
        let mut sum = z[i];
        for k in (i + 1)..N {
            sum -= l[k][i] * x[k];
        }
        x[i] = sum / l[i][i];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

fn norm(v: &[f64; N]) -> f64 {
    v.iter().map(|a| a * a).sum::<f64>().sqrt()
}

fn dot(a: &[f64; N], b: &[f64; N]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn quadratic_form(m: &[[f64; N]; N], v: &[f64; N]) -> f64 {
    let mut total = 0.0;
    for a in 0..N {
        for b in 0..N {
            total += v[a] * m[a][b] * v[b];
        }
    }
    total
}

/// Run Levenberg-Marquardt from `p0`
///
/// `x` and `y` must have the same length; the caller validates shapes.
///
/// # Errors
/// `FitConvergence` when the residuals are not finite at `p0`
pub fn least_squares(
    model: LineshapeModel,
    x: &[f64],
    y: &[f64],
    p0: [f64; N],
    options: &SolverOptions,
) -> Result<LocalFit> {
    let mut p = p0;
    let mut lin = linearize(model, x, y, &p);

    if !lin.cost.is_finite() {
        return Err(PeakFitError::FitConvergence(format!(
            "residuals are not finite at the initial guess {:?}",
            p0
        )));
    }

    let mut damping = INITIAL_DAMPING;
    let mut nu = 2.0;

    let finish = |p: [f64; N], cost: f64, iterations: usize, termination: Termination| LocalFit {
        params: p,
        cost,
        iterations,
        termination,
    };

    for iteration in 1..=options.max_iterations {
        if lin.gradient.iter().all(|g| g.abs() <= options.gtol) {
            return Ok(finish(p, lin.cost, iteration - 1, Termination::Gradient));
        }

        let mut damped = lin.normal;
        for i in 0..N {
            damped[i][i] += damping * lin.normal[i][i].max(MIN_DIAGONAL);
        }
        let rhs = lin.gradient.map(|g| -g);

        let Some(delta) = cholesky_solve(&damped, &rhs) else {
            damping *= nu;
            nu *= 2.0;
            if damping > MAX_DAMPING {
                return Ok(finish(p, lin.cost, iteration, Termination::Singular));
            }
            continue;
        };

        let mut trial = p;
        for i in 0..N {
            trial[i] += delta[i];
        }
        let trial_cost = sum_of_squares(model, x, y, &trial);

        // Reduction predicted by the linear model: -(2 gᵀδ + δᵀ JᵀJ δ)
        let predicted = -(2.0 * dot(&lin.gradient, &delta) + quadratic_form(&lin.normal, &delta));
        let actual = lin.cost - trial_cost;

        let negligible_step = norm(&delta) <= options.xtol * (norm(&p) + options.xtol);

        if trial_cost.is_finite() && actual > 0.0 {
            let rho = if predicted > 0.0 { actual / predicted } else { 1.0 };
            // Both the achieved and the predicted reduction must be negligible,
            // and the linear model must still describe the step
            let small_reduction = actual <= options.ftol * lin.cost
                && predicted <= options.ftol * lin.cost
                && rho <= 2.0;

            p = trial;
            lin = linearize(model, x, y, &p);

            damping *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
            nu = 2.0;

            if negligible_step {
                return Ok(finish(p, lin.cost, iteration, Termination::Step));
            }
            if small_reduction {
                return Ok(finish(p, lin.cost, iteration, Termination::Cost));
            }
        } else {
            if negligible_step {
                return Ok(finish(p, lin.cost, iteration, Termination::Step));
            }
            damping *= nu;
            nu *= 2.0;
            if damping > MAX_DAMPING {
                return Ok(finish(p, lin.cost, iteration, Termination::Stalled));
            }
        }
    }

    Ok(finish(
        p,
        lin.cost,
        options.max_iterations,
        Termination::MaxIterations,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fano::model::FanoParams;

    fn synthetic(model: LineshapeModel, truth: [f64; N]) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..=100).map(|i| 700.0 + i as f64).collect();
        let y = model.evaluate_all(&x, &FanoParams::from_array(truth));
        (x, y)
    }

    #[test]
    fn test_cholesky_solve() {
        let mut a = [[0.0; N]; N];
        for i in 0..N {
            a[i][i] = 4.0;
            if i + 1 < N {
                a[i][i + 1] = 1.0;
                a[i + 1][i] = 1.0;
            }
        }
        let expected = [1.0, -2.0, 0.5, 3.0, -1.0];
        let mut b = [0.0; N];
        for i in 0..N {
            b[i] = (0..N).map(|j| a[i][j] * expected[j]).sum();
        }

        let x = cholesky_solve(&a, &b).unwrap();
        for i in 0..N {
            assert!((x[i] - expected[i]).abs() < 1e-12);
        }

        assert!(cholesky_solve(&[[0.0; N]; N], &b).is_none());
    }

    #[test]
    fn test_converges_from_nearby_guess() {
        let truth = [750.0, 5.0, 2.0, 1.0, 0.1];
        let (x, y) = synthetic(LineshapeModel::Transmission, truth);

        let fit = least_squares(
            LineshapeModel::Transmission,
            &x,
            &y,
            [748.0, 7.0, 1.5, 0.8, 0.0],
            &SolverOptions::default(),
        )
        .unwrap();

        assert!(fit.termination.is_converged(), "{:?}", fit.termination);
        assert!(fit.cost < 1e-10, "cost {}", fit.cost);
        assert!((fit.params[0] - 750.0).abs() < 1e-4);
    }

    #[test]
    fn test_loose_ftol_does_not_stop_converging_fit() {
        // With exact data the linear model keeps predicting a large relative
        // gain, so a single slow step must not end the search
        let truth = [750.0, 5.0, 2.0, 1.0, 0.1];
        let (x, y) = synthetic(LineshapeModel::Transmission, truth);
        let options = SolverOptions {
            ftol: 1e-2,
            ..SolverOptions::default()
        };

        let fit = least_squares(
            LineshapeModel::Transmission,
            &x,
            &y,
            [748.0, 7.0, 1.5, 0.8, 0.0],
            &options,
        )
        .unwrap();

        assert!(fit.termination.is_converged(), "{:?}", fit.termination);
        assert!(fit.cost < 1e-10, "cost {}", fit.cost);
        for (p, t) in fit.params.iter().zip(truth) {
            assert!((p - t).abs() < 1e-4, "{} vs {}", p, t);
        }
    }

    #[test]
    fn test_absorption_model_converges() {
        let truth = [760.0, 8.0, -1.0, 0.6, 0.2];
        let (x, y) = synthetic(LineshapeModel::Absorption, truth);

        let fit = least_squares(
            LineshapeModel::Absorption,
            &x,
            &y,
            [758.0, 10.0, -0.7, 0.5, 0.3],
            &SolverOptions::default(),
        )
        .unwrap();

        assert!(fit.termination.is_converged());
        assert!((fit.params[0] - 760.0).abs() < 1e-4);
    }

    #[test]
    fn test_cost_never_increases() {
        let truth = [750.0, 5.0, 2.0, 1.0, 0.1];
        let (x, y) = synthetic(LineshapeModel::Transmission, truth);
        let p0 = [730.0, 40.0, -3.0, 5.0, 2.0];

        let start = sum_of_squares(LineshapeModel::Transmission, &x, &y, &p0);
        let fit = least_squares(LineshapeModel::Transmission, &x, &y, p0, &SolverOptions::default())
            .unwrap();
        assert!(fit.cost <= start);
    }

    #[test]
    fn test_non_finite_data_is_rejected() {
        let (x, mut y) = synthetic(LineshapeModel::Transmission, [750.0, 5.0, 2.0, 1.0, 0.1]);
        y[10] = f64::NAN;

        let err = least_squares(
            LineshapeModel::Transmission,
            &x,
            &y,
            [750.0, 5.0, 2.0, 1.0, 0.1],
            &SolverOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PeakFitError::FitConvergence(_)));
    }

    #[test]
    fn test_iteration_cap_is_reported() {
        let (x, y) = synthetic(LineshapeModel::Transmission, [750.0, 5.0, 2.0, 1.0, 0.1]);
        let options = SolverOptions {
            max_iterations: 1,
            ..SolverOptions::default()
        };

        let fit = least_squares(
            LineshapeModel::Transmission,
            &x,
            &y,
            [700.0, 300.0, 10.0, -40.0, 3.0],
            &options,
        )
        .unwrap();
        assert_eq!(fit.termination, Termination::MaxIterations);
        assert!(!fit.termination.is_converged());
    }
}
