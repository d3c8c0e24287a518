use log::warn;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::density::DensityHistogram;
use crate::least_squares::{self, CurveModel, SolverError, SolverParams};
use crate::util::powerlaw;

/// Fitted `amplitude * x^slope` together with the residuals of the fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerLawParams {
    pub amplitude: f64,
    pub slope: f64,
    /// Euclidean norm of the residuals.
    pub error_sq: f64,
    /// Signed sum of the residuals.
    pub error_diff: f64,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitFailure {
    #[error("no data points")]
    EmptyInput,
    #[error("{num_points} data points are too few to determine two parameters")]
    TooFewPoints { num_points: usize },
    #[error("{x_len} abscissae but {y_len} ordinates")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("data contains non-finite values")]
    NonFiniteInput,
    #[error("all ordinates are zero")]
    DegenerateData,
    #[error("model evaluation is not finite at iteration {iteration}")]
    NonFiniteModel { iteration: usize },
    #[error("no convergence within {iterations} iterations")]
    NotConverged { iterations: usize },
}

impl From<SolverError> for FitFailure {
    fn from(solver_error: SolverError) -> Self {
        match solver_error {
            SolverError::NonFiniteModel { iteration } => FitFailure::NonFiniteModel { iteration },
            SolverError::NotConverged { iterations } => FitFailure::NotConverged { iterations },
        }
    }
}

/// Outcome of a power-law fit. A failed fit reads as all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PowerLawFit {
    Converged(PowerLawParams),
    Failed(FitFailure),
}

impl PowerLawFit {
    pub fn is_converged(&self) -> bool {
        matches!(self, PowerLawFit::Converged(_))
    }

    pub fn failure(&self) -> Option<FitFailure> {
        match self {
            PowerLawFit::Converged(_) => None,
            PowerLawFit::Failed(failure) => Some(*failure),
        }
    }

    pub fn params(&self) -> PowerLawParams {
        match self {
            PowerLawFit::Converged(params) => *params,
            PowerLawFit::Failed(_) => PowerLawParams::default(),
        }
    }

    pub fn amplitude(&self) -> f64 {
        self.params().amplitude
    }

    pub fn slope(&self) -> f64 {
        self.params().slope
    }

    pub fn error_sq(&self) -> f64 {
        self.params().error_sq
    }

    pub fn error_diff(&self) -> f64 {
        self.params().error_diff
    }
}

struct PowerLaw;

impl CurveModel for PowerLaw {
    fn value(&self, x: f64, params: &Vector2<f64>) -> f64 {
        powerlaw(x, params[0], params[1])
    }

    fn gradient(&self, x: f64, params: &Vector2<f64>) -> Vector2<f64> {
        let x_pow_slope = x.powf(params[1]);
        Vector2::new(x_pow_slope, params[0] * x_pow_slope * x.ln())
    }
}

/// Fits `density = amplitude * bin_center^slope`, warning once on failure.
pub fn fit_power_law_distribution(histogram: &DensityHistogram, quantity: &str) -> PowerLawFit {
    fit_or_warn(&histogram.bin_centers, &histogram.density, quantity)
}

/// Fits `size = amplitude * duration^beta` to the raw avalanche pairs, warning once on failure.
pub fn fit_size_duration_scaling(durations: &[f64], sizes: &[f64]) -> PowerLawFit {
    fit_or_warn(durations, sizes, "size vs. duration")
}

fn fit_or_warn(x: &[f64], y: &[f64], quantity: &str) -> PowerLawFit {
    match fit_power_law(x, y, &SolverParams::default()) {
        Ok(params) => PowerLawFit::Converged(params),
        Err(failure) => {
            warn!(
                "While fitting the {} power law, the following failure occurred: {}",
                quantity, failure
            );
            PowerLawFit::Failed(failure)
        }
    }
}

pub fn fit_power_law(
    x: &[f64],
    y: &[f64],
    solver_params: &SolverParams,
) -> Result<PowerLawParams, FitFailure> {
    validate_fit_input(x, y)?;

    let solution = least_squares::solve(&PowerLaw, x, y, Vector2::zeros(), solver_params)?;

    let amplitude = solution.params[0];
    let slope = solution.params[1];

    let residuals: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(x, y)| y - powerlaw(*x, amplitude, slope))
        .collect();

    let error_sq = residuals.iter().map(|r| r * r).sum::<f64>().sqrt();
    let error_diff = residuals.iter().sum();

    Ok(PowerLawParams {
        amplitude,
        slope,
        error_sq,
        error_diff,
    })
}

fn validate_fit_input(x: &[f64], y: &[f64]) -> Result<(), FitFailure> {
    if x.len() != y.len() {
        return Err(FitFailure::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }

    if x.is_empty() {
        return Err(FitFailure::EmptyInput);
    }

    if x.len() < 2 {
        return Err(FitFailure::TooFewPoints {
            num_points: x.len(),
        });
    }

    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(FitFailure::NonFiniteInput);
    }

    if y.iter().all(|v| *v == 0.0) {
        return Err(FitFailure::DegenerateData);
    }

    Ok(())
}
