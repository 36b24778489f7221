//! Power-law (Zipf) fitting
//!
//! Fits `y = scale * x^exponent` to a rank-frequency distribution, where `y`
//! is the reference count of the block at rank `x` (1 = most referenced).
//! A Zipf-like long tail shows up as a negative exponent; the steeper it is,
//! the more concentrated the accesses.
//!
//! # Method
//!
//! Nonlinear least squares on the untransformed counts using
//! Levenberg-Marquardt over `(exponent, ln scale)`:
//!
//! 1. Start from the ordinary least-squares line through `(ln x, ln y)`
//! 2. Iterate damped Gauss-Newton steps on `sum (y - scale * x^exponent)^2`
//! 3. Accept a point only if it is stationary: the cosine between the
//!    residual vector and every Jacobian column is below tolerance, or the
//!    residuals vanish relative to the data
//!
//! A step that shrinks only because damping grew says nothing about
//! stationarity, so a stalled solver away from a minimum is a
//! [`FitError::DidNotConverge`], as is running out of evaluation budget.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default evaluation budget
pub const DEFAULT_MAX_EVALUATIONS: usize = 2000;

/// Default relative tolerance on cost reduction, step size and gradient
pub const DEFAULT_TOLERANCE: f64 = 1.49012e-8;

/// Fitted power-law parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawFit {
    pub exponent: f64,
    pub scale: f64,
    /// Sum of squared residuals at the solution
    pub residual_ss: f64,
    /// Model evaluations used
    pub evaluations: usize,
}

impl PowerLawFit {
    /// Model value at `rank`
    pub fn predict(&self, rank: f64) -> f64 {
        self.scale * rank.powf(self.exponent)
    }
}

/// Why a fit produced no parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("need at least 2 non-zero frequencies, got {points}")]
    InsufficientData { points: usize },

    #[error("no convergence within {evaluations} evaluations")]
    DidNotConverge { evaluations: usize },

    #[error("model evaluated to a non-finite value")]
    NonFinite,
}

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub max_evaluations: usize,
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Drop zero frequencies and sort the rest from most to least frequent
pub fn rank_frequency(freqs: &[f64]) -> Vec<f64> {
    let mut y: Vec<f64> = freqs.iter().copied().filter(|&f| f != 0.0).collect();
    y.sort_by(|a, b| b.total_cmp(a));
    y
}

/// Fit a power law to a frequency sequence (any order, zeros allowed)
pub fn fit_power_law(freqs: &[f64], options: &FitOptions) -> Result<PowerLawFit, FitError> {
    let y = rank_frequency(freqs);
    let x: Vec<f64> = (1..=y.len()).map(|r| r as f64).collect();
    fit_points(&x, &y, options)
}

/// Gradient cosine below which a point that stopped improving still counts
/// as a minimum
const STATIONARY_COSINE: f64 = 1e-4;

/// Damping beyond which steps are considered zero
const MAX_LAMBDA: f64 = 1e16;

/// Fit `y = scale * x^exponent` to explicit points (all `x > 0`)
pub fn fit_points(x: &[f64], y: &[f64], options: &FitOptions) -> Result<PowerLawFit, FitError> {
    debug_assert_eq!(x.len(), y.len());
    if x.len() < 2 {
        return Err(FitError::InsufficientData { points: x.len() });
    }

    let tol = options.tolerance;
    let mut solver = Solver { x, y, evaluations: 0 };
    let mut p = initial_guess(x, y);
    let mut cost = solver.cost(p)?;
    let exact = tol * tol * y.iter().map(|v| v * v).sum::<f64>();
    let mut lambda = 1e-3;

    while solver.evaluations < options.max_evaluations {
        let normal = solver.normal_equations(p);
        let cosine = normal.gradient_cosine();
        if cosine <= tol || cost <= exact {
            return Ok(solver.finish(p, cost));
        }

        // Damped step; grow damping until the cost goes down
        loop {
            let jtj = normal.jtj;
            let a = [
                [jtj[0][0] * (1.0 + lambda), jtj[0][1]],
                [jtj[1][0], jtj[1][1] * (1.0 + lambda)],
            ];

            if let Some(step) = solve_2x2(a, normal.jtr) {
                let candidate = [p[0] + step[0], p[1] + step[1]];
                let candidate_cost = match solver.cost(candidate) {
                    Ok(c) => c,
                    Err(FitError::NonFinite) => f64::INFINITY,
                    Err(e) => return Err(e),
                };

                if candidate_cost < cost {
                    let reduction = cost - candidate_cost;
                    let small_step = step_norm(step) <= tol * (step_norm(p) + tol);
                    p = candidate;
                    cost = candidate_cost;
                    lambda = (lambda / 10.0).max(1e-12);

                    // Progress stalled with little damping: confirm a minimum
                    if (reduction <= tol * cost || small_step) && lambda <= 1.0 {
                        let normal = solver.normal_equations(p);
                        if normal.gradient_cosine() <= STATIONARY_COSINE {
                            return Ok(solver.finish(p, cost));
                        }
                    }
                    break;
                }
            }

            lambda *= 10.0;
            if lambda > MAX_LAMBDA || solver.evaluations >= options.max_evaluations {
                // No descent left; only a stationary point is a fit
                if cosine <= STATIONARY_COSINE {
                    return Ok(solver.finish(p, cost));
                }
                return Err(FitError::DidNotConverge {
                    evaluations: solver.evaluations,
                });
            }
        }
    }

    Err(FitError::DidNotConverge {
        evaluations: solver.evaluations,
    })
}

/// Parameters are `[exponent, ln scale]`
type Params = [f64; 2];

struct Solver<'a> {
    x: &'a [f64],
    y: &'a [f64],
    evaluations: usize,
}

/// Gauss-Newton system at one point
struct NormalEquations {
    jtj: [[f64; 2]; 2],
    /// `J^T r` with residuals `r = y - f(x)`
    jtr: [f64; 2],
    residual_ss: f64,
}

impl NormalEquations {
    /// Largest `|J_j . r| / (|J_j| |r|)`; zero at a stationary point
    fn gradient_cosine(&self) -> f64 {
        if self.residual_ss == 0.0 {
            return 0.0;
        }
        let r_norm = self.residual_ss.sqrt();
        (0..2)
            .filter(|&j| self.jtj[j][j] > 0.0)
            .map(|j| self.jtr[j].abs() / (self.jtj[j][j].sqrt() * r_norm))
            .fold(0.0, f64::max)
    }
}

fn model(p: Params, x: f64) -> f64 {
    (p[1] + p[0] * x.ln()).exp()
}

impl Solver<'_> {
    fn cost(&mut self, p: Params) -> Result<f64, FitError> {
        self.evaluations += 1;
        let cost: f64 = self
            .x
            .iter()
            .zip(self.y)
            .map(|(&x, &y)| {
                let r = y - model(p, x);
                r * r
            })
            .sum();
        if cost.is_finite() {
            Ok(cost)
        } else {
            Err(FitError::NonFinite)
        }
    }

    fn normal_equations(&mut self, p: Params) -> NormalEquations {
        self.evaluations += 1;
        let mut jtj = [[0.0; 2]; 2];
        let mut jtr = [0.0; 2];
        let mut residual_ss = 0.0;
        for (&x, &y) in self.x.iter().zip(self.y) {
            let f = model(p, x);
            // df/dexponent, df/dln(scale)
            let j = [f * x.ln(), f];
            let r = y - f;
            residual_ss += r * r;
            for a in 0..2 {
                jtr[a] += j[a] * r;
                for b in 0..2 {
                    jtj[a][b] += j[a] * j[b];
                }
            }
        }
        NormalEquations { jtj, jtr, residual_ss }
    }

    fn finish(&self, p: Params, cost: f64) -> PowerLawFit {
        PowerLawFit {
            exponent: p[0],
            scale: p[1].exp(),
            residual_ss: cost,
            evaluations: self.evaluations,
        }
    }
}

/// Straight line through `(ln x, ln y)`
fn initial_guess(x: &[f64], y: &[f64]) -> Params {
    let n = x.len() as f64;
    let lx: Vec<f64> = x.iter().map(|v| v.ln()).collect();
    let ly: Vec<f64> = y.iter().map(|v| v.abs().max(f64::MIN_POSITIVE).ln()).collect();
    let mx = lx.iter().sum::<f64>() / n;
    let my = ly.iter().sum::<f64>() / n;

    let sxx: f64 = lx.iter().map(|v| (v - mx) * (v - mx)).sum();
    let sxy: f64 = lx.iter().zip(&ly).map(|(a, b)| (a - mx) * (b - my)).sum();

    if sxx == 0.0 {
        return [0.0, my];
    }
    let slope = sxy / sxx;
    [slope, my - slope * mx]
}

fn solve_2x2(a: [[f64; 2]; 2], b: [f64; 2]) -> Option<[f64; 2]> {
    let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    Some([
        (b[0] * a[1][1] - a[0][1] * b[1]) / det,
        (a[0][0] * b[1] - a[1][0] * b[0]) / det,
    ])
}

fn step_norm(v: [f64; 2]) -> f64 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zipf_counts(n: usize, scale: f64, exponent: f64) -> Vec<f64> {
        (1..=n).map(|r| scale * (r as f64).powf(exponent)).collect()
    }

    #[test]
    fn test_recovers_exact_power_law() {
        let y = zipf_counts(200, 5000.0, -1.2);
        let fit = fit_power_law(&y, &FitOptions::default()).unwrap();
        assert!((fit.exponent + 1.2).abs() < 1e-6, "exponent {}", fit.exponent);
        assert!((fit.scale - 5000.0).abs() / 5000.0 < 1e-6, "scale {}", fit.scale);
    }

    #[test]
    fn test_recovers_noisy_power_law() {
        // Deterministic +/-5% wobble
        let y: Vec<f64> = zipf_counts(300, 1000.0, -0.8)
            .into_iter()
            .enumerate()
            .map(|(i, v)| v * if i % 2 == 0 { 1.05 } else { 0.95 })
            .collect();
        let fit = fit_power_law(&y, &FitOptions::default()).unwrap();
        assert!((fit.exponent + 0.8).abs() < 0.05, "exponent {}", fit.exponent);
        assert!(fit.residual_ss.is_finite());
        assert!(fit.evaluations <= DEFAULT_MAX_EVALUATIONS);
    }

    #[test]
    fn test_input_order_and_zeros_ignored() {
        let mut y = zipf_counts(50, 300.0, -1.0);
        y.reverse();
        y.extend([0.0, 0.0, 0.0]);
        let fit = fit_power_law(&y, &FitOptions::default()).unwrap();
        assert!((fit.exponent + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_distribution_has_zero_exponent() {
        let fit = fit_power_law(&[4.0; 20], &FitOptions::default()).unwrap();
        assert!(fit.exponent.abs() < 1e-9);
        assert!((fit.scale - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_data() {
        assert_eq!(
            fit_power_law(&[0.0, 7.0, 0.0], &FitOptions::default()),
            Err(FitError::InsufficientData { points: 1 })
        );
        assert_eq!(
            fit_power_law(&[], &FitOptions::default()),
            Err(FitError::InsufficientData { points: 0 })
        );
    }

    #[test]
    fn test_budget_exhaustion_reports_failure() {
        let y: Vec<f64> = zipf_counts(100, 1000.0, -1.1)
            .into_iter()
            .enumerate()
            .map(|(i, v)| v + (i % 7) as f64)
            .collect();
        let options = FitOptions {
            max_evaluations: 1,
            ..FitOptions::default()
        };
        assert_eq!(
            fit_power_law(&y, &options),
            Err(FitError::DidNotConverge { evaluations: 1 })
        );
    }

    fn head_heavy(head: &[f64], ones: usize) -> Vec<f64> {
        head.iter().copied().chain(std::iter::repeat(1.0).take(ones)).collect()
    }

    /// Least residual over a fine exponent grid, scale solved exactly
    fn grid_minimum(freqs: &[f64]) -> (f64, f64) {
        let y = rank_frequency(freqs);
        let yy: f64 = y.iter().map(|v| v * v).sum();
        (0..10_000)
            .map(|i| -10.0 + i as f64 * 0.001)
            .map(|m| {
                let (sxy, sxx) = y.iter().enumerate().fold((0.0, 0.0), |(sxy, sxx), (i, v)| {
                    let xm = ((i + 1) as f64).powf(m);
                    (sxy + v * xm, sxx + xm * xm)
                });
                (yy - sxy * sxy / sxx, m)
            })
            .fold((f64::INFINITY, 0.0), |best, c| if c.0 < best.0 { c } else { best })
    }

    #[test]
    fn test_single_hot_block_over_flat_tail() {
        let y = head_heavy(&[100_000.0], 10_000);
        let fit = fit_power_law(&y, &FitOptions::default()).unwrap();

        // scale = y[0], exponent -20 already leaves only the tail residual
        assert!(fit.residual_ss < 9999.8, "rss {}", fit.residual_ss);
        assert!(fit.exponent > -25.0 && fit.exponent < -10.0, "exponent {}", fit.exponent);
        assert!((fit.scale - 100_000.0).abs() / 100_000.0 < 1e-3, "scale {}", fit.scale);
    }

    #[test]
    fn test_head_heavy_fits_reach_the_minimum() {
        for y in [
            head_heavy(&[5000.0, 300.0, 50.0, 10.0, 5.0, 3.0, 2.0], 1000),
            head_heavy(&[50_000.0, 40_000.0], 5000),
        ] {
            let fit = fit_power_law(&y, &FitOptions::default()).unwrap();
            let (best_rss, best_exponent) = grid_minimum(&y);
            assert!(
                fit.residual_ss <= best_rss * (1.0 + 1e-6),
                "rss {} above grid minimum {}",
                fit.residual_ss,
                best_rss
            );
            assert!((fit.exponent - best_exponent).abs() < 0.01, "exponent {} vs {}", fit.exponent, best_exponent);
        }
    }

    #[test]
    fn test_slow_fit_runs_out_of_budget() {
        let y = head_heavy(&[100_000.0], 10_000);
        let options = FitOptions {
            max_evaluations: 10,
            ..FitOptions::default()
        };
        assert!(matches!(
            fit_power_law(&y, &options),
            Err(FitError::DidNotConverge { .. })
        ));
    }

    #[test]
    fn test_gradient_cosine_vanishes_at_minimum() {
        let x: Vec<f64> = (1..=50).map(|r| r as f64).collect();
        let y: Vec<f64> = x.iter().map(|r| 200.0 * r.powf(-0.9) + if *r as u64 % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let fit = fit_points(&x, &y, &FitOptions::default()).unwrap();

        let mut solver = Solver { x: &x, y: &y, evaluations: 0 };
        let at_fit = solver.normal_equations([fit.exponent, fit.scale.ln()]);
        let away = solver.normal_equations([fit.exponent - 0.5, fit.scale.ln()]);
        assert!(at_fit.gradient_cosine() <= STATIONARY_COSINE);
        assert!(away.gradient_cosine() > STATIONARY_COSINE);
    }

    #[test]
    fn test_rank_frequency() {
        assert_eq!(rank_frequency(&[1.0, 0.0, 5.0, 3.0]), vec![5.0, 3.0, 1.0]);
    }

    #[test]
    fn test_predict() {
        let fit = PowerLawFit {
            exponent: -1.0,
            scale: 10.0,
            residual_ss: 0.0,
            evaluations: 0,
        };
        assert_eq!(fit.predict(2.0), 5.0);
    }
}
