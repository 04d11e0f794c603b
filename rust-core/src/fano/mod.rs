//! Fano resonance fitting
//!
//! Lineshape model, Levenberg-Marquardt local solver, multi-start initial
//! guess and the argmax fallback estimator.

pub mod model;
pub mod solver;
pub mod fitter;
pub mod fallback;

pub use model::{fano_factor, FanoParams, LineshapeModel, PARAM_COUNT};
pub use solver::{least_squares, LocalFit, SolverOptions, Termination};
pub use fitter::{
    best_candidate, best_initial_guess, fit_peak, fit_spectrum, FitConfig, FitResult,
    DEFAULT_GUESS_SPAN, DEFAULT_RESTARTS, DEFAULT_SEED,
};
pub use fallback::{argmax_interpolated_peak, argmax_peak_of, FALLBACK_STEP};
