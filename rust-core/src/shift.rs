//! Peak shift against a reference resonance
//!
//! The reference (sensor background) spectrum is fitted once with the full
//! multi-start search. Its converged parameters then seed the fit of every
//! sample spectrum, and each sample's shift is `peak - reference_peak`.
//! Missing peaks stay missing: a failed fit on either side yields `None`,
//! never a number.

use std::cmp::Ordering;

use log::{info, warn};
use rayon::prelude::*;

use crate::error::Result;
use crate::fano::{best_initial_guess, fit_peak, FanoParams, FitConfig, FitResult};
use crate::spectrum::Spectrum;

/// `sample - reference`, or `None` when either peak is missing
pub fn peak_shift(sample: Option<f64>, reference: Option<f64>) -> Option<f64> {
    Some(sample? - reference?)
}

/// One row of a peak-tracking report
#[derive(Debug, Clone, PartialEq)]
pub struct PeakRecord {
    /// Spectrum label (file stem)
    pub label: String,

    /// Relative capture time in seconds, when known
    pub time: Option<f64>,

    /// Fitted resonant wavelength
    pub peak: Option<f64>,

    /// Peak minus reference peak
    pub shift: Option<f64>,
}

/// Reference-calibrated peak tracker
pub struct PeakTracker {
    config: FitConfig,
    reference_label: String,
    initial_guess: Option<FanoParams>,
    reference_peak: Option<f64>,
}

impl PeakTracker {
    /// Fit the reference spectrum and keep its parameters for later fits
    ///
    /// Never fails: a reference that cannot be fitted leaves both the seed
    /// parameters and the reference peak missing, so every later shift is
    /// reported missing.
    pub fn calibrate(reference: &Spectrum, config: FitConfig) -> Self {
        let x = reference.wavelength();
        let y = reference.intensity();

        let (initial_guess, reference_peak) = match best_initial_guess(x, y, &config) {
            Ok(params0) => match fit_peak(x, y, &params0, &config) {
                Ok(fit) => (Some(params0), Some(fit.resonant_wavelength)),
                Err(e) => {
                    warn!("Reference '{}' fit failed: {}", reference.label(), e);
                    (Some(params0), None)
                }
            },
            Err(e) => {
                warn!(
                    "Multi-start search on reference '{}' failed: {}",
                    reference.label(),
                    e
                );
                (None, None)
            }
        };

        if let Some(peak) = reference_peak {
            info!("Reference '{}' resonance at {:.4}", reference.label(), peak);
        }

        Self {
            config,
            reference_label: reference.label().to_string(),
            initial_guess,
            reference_peak,
        }
    }

    pub fn reference_label(&self) -> &str {
        &self.reference_label
    }

    pub fn reference_peak(&self) -> Option<f64> {
        self.reference_peak
    }

    /// Parameters every sample fit starts from
    pub fn initial_guess(&self) -> Option<&FanoParams> {
        self.initial_guess.as_ref()
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Fit a sample spectrum
    ///
    /// Seeds from the reference parameters; without them a fresh multi-start
    /// search is run for this spectrum alone.
    pub fn fit(&self, spectrum: &Spectrum) -> Result<FitResult> {
        let x = spectrum.wavelength();
        let y = spectrum.intensity();

        match &self.initial_guess {
            Some(params0) => fit_peak(x, y, params0, &self.config),
            None => {
                let params0 = best_initial_guess(x, y, &self.config)?;
                fit_peak(x, y, &params0, &self.config)
            }
        }
    }

    /// Fit one spectrum and build its report row
    pub fn track(&self, spectrum: &Spectrum, time: Option<f64>) -> PeakRecord {
        let peak = match self.fit(spectrum) {
            Ok(fit) => Some(fit.resonant_wavelength),
            Err(e) => {
                warn!(
                    "No peak for '{}'; recording it as missing: {}",
                    spectrum.label(),
                    e
                );
                None
            }
        };

        PeakRecord {
            label: spectrum.label().to_string(),
            time,
            peak,
            shift: peak_shift(peak, self.reference_peak),
        }
    }

    /// Track a series of spectra
    ///
    /// Spectra are fitted independently (in parallel). The records come back
    /// ordered by time ascending; records without a time follow the timed
    /// ones in input order.
    pub fn track_series<'a, I>(&self, spectra: I) -> Vec<PeakRecord>
    where
        I: IntoIterator<Item = (&'a Spectrum, Option<f64>)>,
    {
        let inputs: Vec<(&Spectrum, Option<f64>)> = spectra.into_iter().collect();

        let mut records: Vec<PeakRecord> = inputs
            .par_iter()
            .map(|&(spectrum, time)| self.track(spectrum, time))
            .collect();

        records.sort_by(|a, b| match (a.time, b.time) {
            (Some(ta), Some(tb)) => ta.total_cmp(&tb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let missing = records.iter().filter(|r| r.peak.is_none()).count();
        info!(
            "Tracked {} spectra against '{}' ({} without a peak)",
            records.len(),
            self.reference_label,
            missing
        );

        records
    }
}
