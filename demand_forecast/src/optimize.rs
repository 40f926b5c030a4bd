//! Nelder-Mead simplex minimization for model parameter estimation

use std::cmp::Ordering;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Configuration for the simplex search
#[derive(Debug, Clone)]
pub struct SimplexConfig {
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Convergence tolerance on the objective spread and simplex size
    pub tolerance: f64,
    /// Relative step used to build the initial simplex
    pub initial_step: f64,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            initial_step: 0.05,
        }
    }
}

/// Outcome of a simplex search
#[derive(Debug, Clone)]
pub struct SimplexResult {
    /// Best point found
    pub point: Vec<f64>,
    /// Objective value at the best point
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether a convergence criterion was met before `max_iter`
    pub converged: bool,
}

/// Minimize `objective` starting from `initial`, optionally clamping each
/// dimension to `bounds`.
///
/// The search is fully deterministic: the same inputs always produce the same
/// result.
pub fn minimize<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &SimplexConfig,
) -> SimplexResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return SimplexResult {
            point: vec![],
            value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    // Initial simplex: the starting point plus one perturbed vertex per dimension
    let mut simplex = vec![apply_bounds(initial.to_vec(), bounds)];
    for i in 0..n {
        let mut vertex = initial.to_vec();
        let step = if initial[i].abs() > 1e-10 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        simplex.push(apply_bounds(vertex, bounds));
    }

    let mut values: Vec<f64> = simplex.iter().map(|vertex| objective(vertex)).collect();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        if values[worst] - values[best] < config.tolerance {
            converged = true;
            break;
        }

        // Centroid of every vertex except the worst
        let mut centroid = vec![0.0; n];
        for (index, vertex) in simplex.iter().enumerate() {
            if index == worst {
                continue;
            }
            for (c, x) in centroid.iter_mut().zip(vertex) {
                *c += x;
            }
        }
        for c in centroid.iter_mut() {
            *c /= n as f64;
        }

        let spread = simplex
            .iter()
            .map(|vertex| distance(vertex, &centroid))
            .fold(0.0, f64::max);
        if spread < config.tolerance {
            converged = true;
            break;
        }

        let reflected = apply_bounds(step_from(&centroid, &simplex[worst], REFLECTION), bounds);
        let reflected_value = objective(&reflected);

        if reflected_value < values[best] {
            let expanded = apply_bounds(step_from(&centroid, &simplex[worst], EXPANSION), bounds);
            let expanded_value = objective(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
        } else if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
        } else {
            let contracted =
                apply_bounds(step_from(&centroid, &simplex[worst], -CONTRACTION), bounds);
            let contracted_value = objective(&contracted);
            if contracted_value < values[worst] {
                simplex[worst] = contracted;
                values[worst] = contracted_value;
            } else {
                // Shrink every other vertex toward the best one
                let anchor = simplex[best].clone();
                for index in 0..=n {
                    if index == best {
                        continue;
                    }
                    let moved: Vec<f64> = anchor
                        .iter()
                        .zip(&simplex[index])
                        .map(|(a, x)| a + SHRINK * (x - a))
                        .collect();
                    simplex[index] = apply_bounds(moved, bounds);
                    values[index] = objective(&simplex[index]);
                }
            }
        }
    }

    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value < values[best] {
            best = index;
        }
    }

    SimplexResult {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}

fn apply_bounds(point: Vec<f64>, bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        Some(bounds) => point
            .iter()
            .zip(bounds)
            .map(|(x, (lo, hi))| x.clamp(*lo, *hi))
            .collect(),
        None => point,
    }
}

fn step_from(centroid: &[f64], worst: &[f64], coefficient: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst)
        .map(|(c, w)| c + coefficient * (c - w))
        .collect()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
