//! Derivative-free minimization for likelihood-based parameter estimation.

use std::cmp::Ordering;
use std::time::Instant;

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The optimal point found.
    pub optimal_point: Vec<f64>,
    /// The objective function value at the optimal point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the simplex met a convergence criterion.
    pub converged: bool,
    /// Whether the run stopped because its deadline passed.
    pub timed_out: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the spread of objective values, relative to
    /// the magnitude of the best value.
    pub tolerance: f64,
    /// Convergence tolerance on the simplex diameter.
    pub x_tolerance: f64,
    /// Reflection coefficient (default: 1.0).
    pub alpha: f64,
    /// Expansion coefficient (default: 2.0).
    pub gamma: f64,
    /// Contraction coefficient (default: 0.5).
    pub rho: f64,
    /// Shrinkage coefficient (default: 0.5).
    pub sigma: f64,
    /// Initial simplex step size (default: 0.1).
    pub initial_step: f64,
    /// Wall-clock point after which the search gives up.
    pub deadline: Option<Instant>,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tolerance: 1e-10,
            x_tolerance: 1e-9,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.1,
            deadline: None,
        }
    }
}

impl NelderMeadConfig {
    /// Set the iteration budget.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the relative function tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Stop at `deadline` even if not converged.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Simplex vertices with their objective values, kept sorted best-first.
struct Simplex {
    vertices: Vec<Vec<f64>>,
    values: Vec<f64>,
}

impl Simplex {
    fn sort(&mut self) {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| cmp_values(self.values[a], self.values[b]));
        self.vertices = order.iter().map(|&i| self.vertices[i].clone()).collect();
        self.values = order.iter().map(|&i| self.values[i]).collect();
    }

    fn best(&self) -> f64 {
        self.values[0]
    }

    fn worst(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    fn second_worst(&self) -> f64 {
        self.values[self.values.len() - 2]
    }

    /// Centroid of every vertex except the worst.
    fn centroid(&self) -> Vec<f64> {
        let dim = self.vertices[0].len();
        let count = self.vertices.len() - 1;
        let mut centroid = vec![0.0; dim];
        for vertex in &self.vertices[..count] {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v;
            }
        }
        centroid.iter_mut().for_each(|c| *c /= count as f64);
        centroid
    }

    fn diameter(&self) -> f64 {
        let best = &self.vertices[0];
        self.vertices[1..]
            .iter()
            .map(|v| {
                v.iter()
                    .zip(best)
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0, f64::max)
            })
            .fold(0.0, f64::max)
    }

    fn replace_worst(&mut self, vertex: Vec<f64>, value: f64) {
        let last = self.vertices.len() - 1;
        self.vertices[last] = vertex;
        self.values[last] = value;
    }
}

/// Total order on objective values with NaN treated as worst.
fn cmp_values(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Perform Nelder-Mead simplex minimization.
///
/// # Arguments
/// * `objective` - The objective function to minimize
/// * `initial` - Initial guess for the optimal point
/// * `bounds` - Optional bounds for each dimension as (min, max) pairs
/// * `config` - Configuration parameters
///
/// # Example
/// ```
/// use arimax_select::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     &NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 1e-3);
/// assert!((result.optimal_point[1] + 1.0).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
            timed_out: false,
        };
    }

    let clamp = |point: Vec<f64>| apply_bounds(point, bounds);
    let start = clamp(initial.to_vec());

    let mut vertices = Vec::with_capacity(n + 1);
    vertices.push(start.clone());
    for i in 0..n {
        let mut vertex = start.clone();
        let step = if start[i].abs() > 1e-8 {
            config.initial_step * start[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        // Step inward when the bound clips the perturbation away.
        let mut vertex = clamp(vertex);
        if vertex[i] == start[i] {
            vertex[i] -= step;
            vertex = clamp(vertex);
        }
        vertices.push(vertex);
    }
    let values = vertices.iter().map(|v| objective(v)).collect();
    let mut simplex = Simplex { vertices, values };

    let mut iterations = 0;
    let mut converged = false;
    let mut timed_out = false;

    while iterations < config.max_iter {
        if config.deadline.is_some_and(|d| Instant::now() >= d) {
            timed_out = true;
            break;
        }
        iterations += 1;
        simplex.sort();

        let spread = simplex.worst() - simplex.best();
        let scale = simplex.best().abs().max(1.0);
        if spread.is_finite() && spread <= config.tolerance * scale {
            converged = true;
            break;
        }
        if simplex.diameter() < config.x_tolerance {
            converged = true;
            break;
        }

        let centroid = simplex.centroid();
        let worst = simplex.vertices[n].clone();
        let along = |t: f64, from: &[f64]| -> Vec<f64> {
            clamp(
                centroid
                    .iter()
                    .zip(from)
                    .map(|(c, p)| c + t * (p - c))
                    .collect(),
            )
        };

        let reflected = along(-config.alpha, &worst);
        let reflected_value = objective(&reflected);

        if cmp_values(reflected_value, simplex.best()) == Ordering::Less {
            let expanded = along(config.gamma, &reflected);
            let expanded_value = objective(&expanded);
            if cmp_values(expanded_value, reflected_value) == Ordering::Less {
                simplex.replace_worst(expanded, expanded_value);
            } else {
                simplex.replace_worst(reflected, reflected_value);
            }
            continue;
        }

        if cmp_values(reflected_value, simplex.second_worst()) == Ordering::Less {
            simplex.replace_worst(reflected, reflected_value);
            continue;
        }

        let (contracted, contracted_value, accept) =
            if cmp_values(reflected_value, simplex.worst()) == Ordering::Less {
                let c = along(config.rho, &reflected);
                let v = objective(&c);
                let ok = cmp_values(v, reflected_value) != Ordering::Greater;
                (c, v, ok)
            } else {
                let c = along(config.rho, &worst);
                let v = objective(&c);
                let ok = cmp_values(v, simplex.worst()) == Ordering::Less;
                (c, v, ok)
            };
        if accept {
            simplex.replace_worst(contracted, contracted_value);
            continue;
        }

        let best = simplex.vertices[0].clone();
        for i in 1..=n {
            let shrunk: Vec<f64> = simplex.vertices[i]
                .iter()
                .zip(&best)
                .map(|(v, b)| b + config.sigma * (v - b))
                .collect();
            let shrunk = clamp(shrunk);
            simplex.values[i] = objective(&shrunk);
            simplex.vertices[i] = shrunk;
        }
    }

    simplex.sort();
    NelderMeadResult {
        optimal_point: simplex.vertices[0].clone(),
        optimal_value: simplex.values[0],
        iterations,
        converged,
        timed_out,
    }
}

fn apply_bounds(mut point: Vec<f64>, bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    if let Some(bounds) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    #[test]
    fn nelder_mead_quadratic_2d() {
        let result = nelder_mead(
            |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
            &[0.0, 0.0],
            None,
            &NelderMeadConfig::default(),
        );

        assert!(result.converged);
        assert!(!result.timed_out);
        assert_relative_eq!(result.optimal_point[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(result.optimal_point[1], 3.0, epsilon = 1e-3);
    }

    #[test]
    fn nelder_mead_rosenbrock() {
        let config = NelderMeadConfig::default()
            .with_max_iter(10_000)
            .with_tolerance(1e-14);

        let result = nelder_mead(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2),
            &[-1.0, 1.0],
            None,
            &config,
        );

        assert_relative_eq!(result.optimal_point[0], 1.0, epsilon = 1e-2);
        assert_relative_eq!(result.optimal_point[1], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn nelder_mead_respects_bounds() {
        // Unconstrained minimum at 5, bound at 3.
        let result = nelder_mead(
            |x| (x[0] - 5.0).powi(2),
            &[1.0],
            Some(&[(0.0, 3.0)]),
            &NelderMeadConfig::default(),
        );
        assert_relative_eq!(result.optimal_point[0], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn nelder_mead_starts_at_upper_bound() {
        let result = nelder_mead(
            |x| (x[0] - 0.5).powi(2),
            &[0.99],
            Some(&[(-0.99, 0.99)]),
            &NelderMeadConfig::default(),
        );
        assert_relative_eq!(result.optimal_point[0], 0.5, epsilon = 1e-3);
    }

    #[test]
    fn nelder_mead_empty_initial() {
        let result = nelder_mead(|_| 0.0, &[], None, &NelderMeadConfig::default());
        assert!(!result.converged);
        assert!(result.optimal_value.is_nan());
    }

    #[test]
    fn nelder_mead_reports_exhausted_budget() {
        let config = NelderMeadConfig::default().with_max_iter(3);
        let result = nelder_mead(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2),
            &[-1.2, 1.0],
            None,
            &config,
        );
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn nelder_mead_honours_past_deadline() {
        let deadline = Instant::now() - Duration::from_millis(1);
        let config = NelderMeadConfig::default().with_deadline(Some(deadline));
        let result = nelder_mead(|x| x[0] * x[0], &[1.0], None, &config);
        assert!(result.timed_out);
        assert!(!result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn nelder_mead_nan_objective_is_avoided() {
        // NaN to the left of zero; minimum of x^2 on the right side is at 0.
        let result = nelder_mead(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 0.25).powi(2) },
            &[1.0],
            None,
            &NelderMeadConfig::default(),
        );
        assert!(result.optimal_value.is_finite());
        assert_relative_eq!(result.optimal_point[0], 0.25, epsilon = 1e-3);
    }
}
