//! Levenberg-Marquardt solver for curve fits with two parameters.

use log::debug;
use nalgebra::{Matrix2, Vector2};
use thiserror::Error;

pub trait CurveModel {
    fn value(&self, x: f64, params: &Vector2<f64>) -> f64;

    /// Partial derivatives of the model value with respect to both parameters.
    fn gradient(&self, x: f64, params: &Vector2<f64>) -> Vector2<f64>;
}

#[derive(Debug, Clone)]
pub struct SolverParams {
    pub max_iterations: usize,
    /// Relative reduction of the cost below which the fit is considered converged.
    pub ftol: f64,
    /// Relative step size below which the fit is considered converged.
    pub xtol: f64,
    /// Largest gradient component below which the fit is considered converged.
    pub gtol: f64,
    pub initial_damping_factor: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 1e-14,
            initial_damping_factor: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub params: Vector2<f64>,
    pub iterations: usize,
    /// Half the sum of squared residuals at `params`.
    pub cost: f64,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverError {
    #[error("model evaluation is not finite at iteration {iteration}")]
    NonFiniteModel { iteration: usize },
    #[error("no convergence within {iterations} iterations")]
    NotConverged { iterations: usize },
}

pub fn solve<M: CurveModel>(
    model: &M,
    x: &[f64],
    y: &[f64],
    initial_params: Vector2<f64>,
    solver_params: &SolverParams,
) -> Result<Solution, SolverError> {
    let mut params = initial_params;
    let mut cost = compute_cost(model, x, y, &params);
    let (mut normal_matrix, mut gradient) = build_normal_equations(model, x, y, &params);

    if !cost.is_finite() || !is_finite(&normal_matrix, &gradient) {
        return Err(SolverError::NonFiniteModel { iteration: 0 });
    }

    let mut damping =
        solver_params.initial_damping_factor * normal_matrix[(0, 0)].max(normal_matrix[(1, 1)]);
    if !(damping > 0.0) {
        damping = solver_params.initial_damping_factor;
    }
    let mut damping_growth = 2.0;

    for iteration in 0..solver_params.max_iterations {
        let solution = Solution {
            params,
            iterations: iteration,
            cost,
        };

        if gradient.amax() <= solver_params.gtol {
            debug!("gradient vanished after {} iterations", iteration);
            return Ok(solution);
        }

        let damped_matrix = normal_matrix + Matrix2::identity() * damping;

        let step = match damped_matrix.cholesky() {
            Some(cholesky) => cholesky.solve(&gradient),
            None => {
                damping *= damping_growth;
                damping_growth *= 2.0;
                continue;
            }
        };

        if step.norm() <= solver_params.xtol * (params.norm() + solver_params.xtol) {
            debug!("step size vanished after {} iterations", iteration);
            return Ok(solution);
        }

        let candidate_params = params + step;
        let candidate_cost = compute_cost(model, x, y, &candidate_params);

        let actual_reduction = cost - candidate_cost;
        let predicted_reduction = 0.5 * step.dot(&(step * damping + gradient));

        if candidate_cost.is_finite() && actual_reduction > 0.0 && predicted_reduction > 0.0 {
            let gain_ratio = actual_reduction / predicted_reduction;
            let previous_cost = cost;

            params = candidate_params;
            cost = candidate_cost;
            (normal_matrix, gradient) = build_normal_equations(model, x, y, &params);

            if !is_finite(&normal_matrix, &gradient) {
                return Err(SolverError::NonFiniteModel {
                    iteration: iteration + 1,
                });
            }

            if actual_reduction <= solver_params.ftol * previous_cost
                && predicted_reduction <= solver_params.ftol * previous_cost
            {
                debug!("cost reduction vanished after {} iterations", iteration + 1);
                return Ok(Solution {
                    params,
                    iterations: iteration + 1,
                    cost,
                });
            }

            damping *= (1.0 / 3.0f64).max(1.0 - (2.0 * gain_ratio - 1.0).powi(3));
            damping_growth = 2.0;
        } else {
            damping *= damping_growth;
            damping_growth *= 2.0;
        }
    }

    Err(SolverError::NotConverged {
        iterations: solver_params.max_iterations,
    })
}

fn compute_cost<M: CurveModel>(model: &M, x: &[f64], y: &[f64], params: &Vector2<f64>) -> f64 {
    0.5 * x
        .iter()
        .zip(y)
        .map(|(x, y)| {
            let residual = y - model.value(*x, params);
            residual * residual
        })
        .sum::<f64>()
}

/// Gauss-Newton approximation `J^T J` of the Hessian and the descent direction `J^T r`.
fn build_normal_equations<M: CurveModel>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &Vector2<f64>,
) -> (Matrix2<f64>, Vector2<f64>) {
    let mut normal_matrix = Matrix2::zeros();
    let mut gradient = Vector2::zeros();

    for (x, y) in x.iter().zip(y) {
        let jacobian_row = model.gradient(*x, params);
        let residual = y - model.value(*x, params);

        normal_matrix += jacobian_row * jacobian_row.transpose();
        gradient += jacobian_row * residual;
    }

    (normal_matrix, gradient)
}

fn is_finite(normal_matrix: &Matrix2<f64>, gradient: &Vector2<f64>) -> bool {
    normal_matrix.iter().chain(gradient.iter()).all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    struct Line;

    impl CurveModel for Line {
        fn value(&self, x: f64, params: &Vector2<f64>) -> f64 {
            params[0] + params[1] * x
        }

        fn gradient(&self, x: f64, _params: &Vector2<f64>) -> Vector2<f64> {
            Vector2::new(1.0, x)
        }
    }

    struct Exponential;

    impl CurveModel for Exponential {
        fn value(&self, x: f64, params: &Vector2<f64>) -> f64 {
            params[0] * (params[1] * x).exp()
        }

        fn gradient(&self, x: f64, params: &Vector2<f64>) -> Vector2<f64> {
            let e = (params[1] * x).exp();
            Vector2::new(e, params[0] * x * e)
        }
    }

    #[test]
    fn line_fit() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|x| 1.5 - 0.5 * x).collect();

        let solution = solve(&Line, &x, &y, Vector2::zeros(), &SolverParams::default()).unwrap();

        assert_approx_eq!(f64, solution.params[0], 1.5, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.params[1], -0.5, epsilon = 1e-6);
        assert!(solution.cost < 1e-12);
    }

    #[test]
    fn least_squares_line_through_noisy_points() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 2.0, 1.0];

        let solution = solve(&Line, &x, &y, Vector2::zeros(), &SolverParams::default()).unwrap();

        // closed form regression: slope 0.5, intercept 0.5
        assert_approx_eq!(f64, solution.params[0], 0.5, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.params[1], 0.5, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.cost, 0.5 * 1.5, epsilon = 1e-9);
    }

    #[test]
    fn exponential_fit() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let y: Vec<f64> = x.iter().map(|x| 0.7 * (-1.2 * x).exp()).collect();

        let solution = solve(
            &Exponential,
            &x,
            &y,
            Vector2::new(1.0, 0.0),
            &SolverParams::default(),
        )
        .unwrap();

        assert_approx_eq!(f64, solution.params[0], 0.7, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.params[1], -1.2, epsilon = 1e-6);
    }

    #[test]
    fn zero_gradient_at_start() {
        let x = [1.0, 2.0];
        let y = [0.0, 0.0];

        let solution = solve(&Line, &x, &y, Vector2::zeros(), &SolverParams::default()).unwrap();

        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.params, Vector2::zeros());
    }

    #[test]
    fn non_finite_model() {
        let x = [1.0, f64::NAN];
        let y = [1.0, 2.0];

        let result = solve(&Line, &x, &y, Vector2::zeros(), &SolverParams::default());

        assert_eq!(result, Err(SolverError::NonFiniteModel { iteration: 0 }));
    }

    #[test]
    fn iteration_limit() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let y: Vec<f64> = x.iter().map(|x| 0.7 * (-1.2 * x).exp()).collect();

        let solver_params = SolverParams {
            max_iterations: 1,
            ..SolverParams::default()
        };

        let result = solve(&Exponential, &x, &y, Vector2::new(1.0, 0.0), &solver_params);

        assert_eq!(result, Err(SolverError::NotConverged { iterations: 1 }));
    }
}
