//! Damped Gauss-Newton (Levenberg-Marquardt) least squares

use log::{debug, warn};

use crate::error::{Error, Result};

/// A nonlinear least-squares objective `0.5 * |r(p)|^2`
pub trait LeastSquares {
    /// Residual vector at `params`
    fn residuals(&self, params: &[f64]) -> Vec<f64>;

    /// Jacobian of the residuals, one row per residual
    fn jacobian(&self, params: &[f64]) -> Vec<Vec<f64>>;
}

/// Stopping rules for [`levenberg_marquardt`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Relative decrease of the cost below which the fit has converged
    pub cost_tolerance: f64,
    /// Relative step size below which the fit has converged
    pub step_tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            max_iterations: 200,
            cost_tolerance: 1e-10,
            step_tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub params: Vec<f64>,
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn cost_of(residuals: &[f64]) -> f64 {
    0.5 * residuals.iter().map(|r| r * r).sum::<f64>()
}

/// Minimize `problem` starting from `initial`
///
/// Fails when the objective is not finite at the starting point or the damped
/// normal equations cannot be solved.
pub fn levenberg_marquardt<P: LeastSquares>(
    problem: &P,
    initial: Vec<f64>,
    options: &SolverOptions,
) -> Result<Solution> {
    let mut params = initial;
    let mut residuals = problem.residuals(&params);
    let mut cost = cost_of(&residuals);
    if !cost.is_finite() {
        return Err(Error::ModelFit(
            "objective is not finite at the initial parameters".to_string(),
        ));
    }

    let n = params.len();
    let mut lambda = 1e-3;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < options.max_iterations {
        iterations += 1;
        let jac = problem.jacobian(&params);

        // Normal equations J^T J and J^T r
        let mut jtj = vec![vec![0.0; n]; n];
        let mut jtr = vec![0.0; n];
        for (row, r) in jac.iter().zip(residuals.iter()) {
            for i in 0..n {
                if row[i] == 0.0 {
                    continue;
                }
                jtr[i] += row[i] * r;
                for j in i..n {
                    jtj[i][j] += row[i] * row[j];
                }
            }
        }
        for i in 0..n {
            for j in 0..i {
                jtj[i][j] = jtj[j][i];
            }
        }

        let gradient_norm = jtr.iter().map(|g| g.abs()).fold(0.0, f64::max);
        if gradient_norm < 1e-12 {
            converged = true;
            break;
        }

        let mut accepted = false;
        while lambda <= 1e12 {
            let mut damped = jtj.clone();
            for (i, row) in damped.iter_mut().enumerate() {
                row[i] += lambda * jtj[i][i].max(1e-9);
            }
            let rhs: Vec<f64> = jtr.iter().map(|g| -g).collect();
            let step = solve(damped, rhs)?;

            let candidate: Vec<f64> = params.iter().zip(step.iter()).map(|(p, s)| p + s).collect();
            let candidate_residuals = problem.residuals(&candidate);
            let candidate_cost = cost_of(&candidate_residuals);

            if candidate_cost.is_finite() && candidate_cost < cost {
                let step_norm = norm(&step);
                let param_norm = norm(&params);
                let decrease = (cost - candidate_cost) / cost.max(1e-300);

                params = candidate;
                residuals = candidate_residuals;
                cost = candidate_cost;
                lambda = (lambda / 10.0).max(1e-12);
                accepted = true;

                if decrease < options.cost_tolerance
                    || step_norm < options.step_tolerance * (param_norm + options.step_tolerance)
                {
                    converged = true;
                }
                break;
            }
            lambda *= 10.0;
        }

        if !accepted {
            // No downhill step at any damping: a local minimum to working precision
            converged = true;
            break;
        }
        debug!("iteration {}: cost {:.6e}, lambda {:.1e}", iterations, cost, lambda);
        if converged {
            break;
        }
    }

    if !converged {
        warn!(
            "Optimizer stopped after {} iterations without converging (cost {:.6e})",
            iterations, cost
        );
    }
    Ok(Solution {
        params,
        cost,
        iterations,
        converged,
    })
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if !(a[pivot][col].abs() > 1e-300) {
            return Err(Error::ModelFit(format!(
                "singular system at column {} of {}",
                col, n
            )));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::ModelFit("linear solve produced non-finite values".to_string()));
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
        assert!(solve(vec![vec![1.0, 2.0], vec![2.0, 4.0]], vec![1.0, 2.0]).is_err());
    }

    /// y = a * exp(b * x)
    struct Exponential {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquares for Exponential {
        fn residuals(&self, p: &[f64]) -> Vec<f64> {
            self.x
                .iter()
                .zip(self.y.iter())
                .map(|(x, y)| p[0] * (p[1] * x).exp() - y)
                .collect()
        }

        fn jacobian(&self, p: &[f64]) -> Vec<Vec<f64>> {
            self.x
                .iter()
                .map(|x| {
                    let e = (p[1] * x).exp();
                    vec![e, p[0] * x * e]
                })
                .collect()
        }
    }

    #[test]
    fn recovers_exponential_parameters() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> = x.iter().map(|x| 1.5 * (0.7 * x).exp()).collect();
        let problem = Exponential { x, y };
        let sol = levenberg_marquardt(&problem, vec![1.0, 0.1], &SolverOptions::default()).unwrap();
        assert!(sol.converged);
        assert!((sol.params[0] - 1.5).abs() < 1e-6);
        assert!((sol.params[1] - 0.7).abs() < 1e-6);
    }
}
