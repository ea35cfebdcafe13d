//! Bounded fixed-point iterations.
//!
//! Both the Kepler solve and the geodetic latitude refinement are capped
//! loops. Instead of silently handing back whatever the last iterate was,
//! they report whether the tolerance was actually met and let the caller
//! decide (see [`ConvergencePolicy`]).

use serde::{Deserialize, Serialize};

/// Outcome of a bounded iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Convergence<T> {
    /// Tolerance met after `iterations` steps.
    Converged { value: T, iterations: usize },
    /// Cap reached; `value` is the last iterate.
    IterationLimit { value: T, iterations: usize },
}

impl<T> Convergence<T> {
    /// The final iterate, whether or not the tolerance was met.
    pub fn value(&self) -> &T {
        match self {
            Convergence::Converged { value, .. }
            | Convergence::IterationLimit { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Convergence::Converged { value, .. }
            | Convergence::IterationLimit { value, .. } => value,
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            Convergence::Converged { iterations, .. }
            | Convergence::IterationLimit { iterations, .. } => *iterations,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Convergence<U> {
        match self {
            Convergence::Converged { value, iterations } => Convergence::Converged {
                value: f(value),
                iterations,
            },
            Convergence::IterationLimit { value, iterations } => Convergence::IterationLimit {
                value: f(value),
                iterations,
            },
        }
    }
}

/// What to do when a bounded iteration hits its cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConvergencePolicy {
    /// Use the last iterate and log a warning.
    #[default]
    Lenient,
    /// Fail the call with `PropagationError::ConvergenceLimitReached`.
    Strict,
}

// ── Kepler's equation ──

/// Eccentric-longitude solution of the SGP4 form of Kepler's equation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerSolution {
    /// sin(E + ω) at the last evaluated iterate
    pub sin_epw: f64,
    /// cos(E + ω) at the last evaluated iterate
    pub cos_epw: f64,
    /// e cos E
    pub ecose: f64,
    /// e sin E
    pub esine: f64,
}

/// Solve `U = (E + ω) - axn·sin(E + ω) + ayn·cos(E + ω)` for `E + ω` by
/// Newton iteration, starting from `U`.
///
/// `axn = e cos ω` and `ayn = e sin ω + aynl` carry the long-period
/// periodics. Stops when successive iterates differ by at most `tolerance`
/// or after `max_iter` evaluations.
pub fn solve_kepler(
    capu: f64,
    axn: f64,
    ayn: f64,
    tolerance: f64,
    max_iter: usize,
) -> Convergence<KeplerSolution> {
    let mut epw = capu;
    let mut solution = KeplerSolution {
        sin_epw: 0.0,
        cos_epw: 1.0,
        ecose: 0.0,
        esine: 0.0,
    };

    for i in 1..=max_iter {
        let (sin_epw, cos_epw) = epw.sin_cos();
        let temp3 = axn * sin_epw;
        let temp4 = ayn * cos_epw;
        let temp5 = axn * cos_epw;
        let temp6 = ayn * sin_epw;
        solution = KeplerSolution {
            sin_epw,
            cos_epw,
            ecose: temp5 + temp6,
            esine: temp3 - temp4,
        };

        let next = (capu - temp4 + temp3 - epw) / (1.0 - temp5 - temp6) + epw;
        if (next - epw).abs() <= tolerance {
            return Convergence::Converged {
                value: solution,
                iterations: i,
            };
        }
        epw = next;
    }

    Convergence::IterationLimit {
        value: solution,
        iterations: max_iter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{KEPLER_MAX_ITER, KEPLER_TOLERANCE};
    use approx::assert_relative_eq;

    #[test]
    fn test_circular_orbit_is_immediate() {
        let sol = solve_kepler(1.3, 0.0, 0.0, KEPLER_TOLERANCE, KEPLER_MAX_ITER);
        assert!(sol.is_converged());
        assert_eq!(sol.iterations(), 1);
        assert_relative_eq!(sol.value().sin_epw, 1.3_f64.sin(), epsilon = 1e-15);
        assert_eq!(sol.value().esine, 0.0);
    }

    #[test]
    fn test_solution_satisfies_equation() {
        // e = 0.3, ω = 0.4
        let (e, w) = (0.3_f64, 0.4_f64);
        let (axn, ayn) = (e * w.cos(), e * w.sin());
        let capu = 2.0;
        let sol = solve_kepler(capu, axn, ayn, 1e-12, 50);
        assert!(sol.is_converged());

        let s = sol.into_value();
        let epw = s.sin_epw.atan2(s.cos_epw);
        let residual = epw - axn * s.sin_epw + ayn * s.cos_epw - capu;
        assert!(residual.abs() < 1e-9, "residual = {residual}");
        assert_relative_eq!(s.ecose.hypot(s.esine), e, epsilon = 1e-12);
    }

    #[test]
    fn test_iteration_cap_reported() {
        let sol = solve_kepler(2.0, 0.9, 0.1, 1e-30, 2);
        assert!(!sol.is_converged());
        assert_eq!(sol.iterations(), 2);
        assert!(matches!(sol, Convergence::IterationLimit { .. }));
    }

    #[test]
    fn test_map_keeps_iteration_count() {
        let c = Convergence::Converged { value: 2.0_f64, iterations: 4 };
        let mapped = c.map(|v| v * 3.0);
        assert_eq!(mapped.iterations(), 4);
        assert_eq!(*mapped.value(), 6.0);
    }

    #[test]
    fn test_default_policy_is_lenient() {
        assert_eq!(ConvergencePolicy::default(), ConvergencePolicy::Lenient);
    }
}
