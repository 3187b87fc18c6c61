//! A small noisy phase-tuning problem
//!
//! Each position component is a phase in `[0, 2π)` that should line up with
//! a fixed target phase. The score is the mean alignment
//! `cos(x_i - θ_i)`, so the optimum is `1.0`. Gaussian noise with a
//! configurable deviation is added to every sample, which makes the
//! averaged final selection meaningful. Used by the demo binary and the
//! integration tests.

use std::f64::consts::{PI, TAU};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use ringswarm_core::problem::{Problem, StructuralParams};

/// Noisy phase alignment objective
///
/// Fitness vector: `[mean alignment, worst alignment]`.
#[derive(Debug, Clone)]
pub struct PhaseWells {
    targets: Vec<f64>,
    noise: Option<Normal<f64>>,
    rng: StdRng,
}

impl PhaseWells {
    /// `noise` is the standard deviation of the per-sample noise; values
    /// that are not positive and finite disable it.
    pub fn new(dimension: usize, noise: f64, seed: u64) -> Self {
        let targets = (0..dimension)
            .map(|i| PI * (i + 1) as f64 / (dimension + 1) as f64)
            .collect();
        let noise = (noise.is_finite() && noise > 0.0)
            .then(|| Normal::new(0.0, noise).ok())
            .flatten();
        Self {
            targets,
            noise,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    fn alignment(&self, position: &[f64]) -> (f64, f64) {
        let mut total = 0.0;
        let mut worst = f64::INFINITY;
        for (x, theta) in position.iter().zip(&self.targets) {
            let a = (x - theta).cos();
            total += a;
            worst = worst.min(a);
        }
        (total / self.targets.len().max(1) as f64, worst)
    }
}

impl Problem<f64> for PhaseWells {
    fn dimension(&self) -> usize {
        self.targets.len()
    }

    fn fitness_len(&self) -> usize {
        2
    }

    fn bounds(&self, _dimension: usize) -> (f64, f64) {
        (0.0, TAU)
    }

    fn wrap(&self, position: &mut [f64]) {
        for x in position.iter_mut() {
            *x = x.rem_euclid(TAU);
        }
    }

    fn evaluate(&mut self, position: &[f64], repeat: usize) -> Vec<f64> {
        let (mean, worst) = self.alignment(position);
        let repeat = repeat.max(1);
        let score = match self.noise {
            Some(noise) => {
                let total: f64 = (0..repeat).map(|_| mean + noise.sample(&mut self.rng)).sum();
                total / repeat as f64
            }
            None => mean,
        };
        vec![score, worst]
    }

    /// Every phase within `cutoff` percent of a half turn of its target.
    fn structural_terminate(&self, fitness: &[f64], params: &StructuralParams) -> bool {
        let tolerance = PI * params.cutoff as f64 / 100.0;
        fitness.get(1).is_some_and(|&worst| worst >= tolerance.cos())
    }

    fn error_terminate(&self, current: &[f64], remembered: &[f64], size: usize, goal: f64) -> bool {
        current
            .iter()
            .zip(remembered)
            .take(size)
            .all(|(c, r)| (c - r).abs() <= goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_score_one_without_noise() {
        let mut problem = PhaseWells::new(3, 0.0, 1);
        let targets = problem.targets().to_vec();
        let fitness = problem.evaluate(&targets, 1);
        assert!((fitness[0] - 1.0).abs() < 1e-12);
        assert!((fitness[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrap_keeps_phases_in_one_turn() {
        let problem = PhaseWells::new(3, 0.0, 1);
        let mut position = vec![-0.5, TAU + 0.25, 3.0];
        problem.wrap(&mut position);
        assert!((position[0] - (TAU - 0.5)).abs() < 1e-12);
        assert!((position[1] - 0.25).abs() < 1e-12);
        assert_eq!(position[2], 3.0);
    }

    #[test]
    fn noise_averages_out() {
        let mut problem = PhaseWells::new(2, 0.5, 7);
        let targets = problem.targets().to_vec();
        let fitness = problem.evaluate(&targets, 4000);
        assert!((fitness[0] - 1.0).abs() < 0.05);
    }

    #[test]
    fn structural_check_uses_the_worst_phase() {
        let problem = PhaseWells::new(2, 0.0, 1);
        let params = StructuralParams {
            cutoff: 10,
            ..StructuralParams::default()
        };
        assert!(problem.structural_terminate(&[0.99, 0.99], &params));
        assert!(!problem.structural_terminate(&[0.99, 0.5], &params));
    }

    #[test]
    fn error_goal_compares_generations() {
        let problem = PhaseWells::new(2, 0.0, 1);
        assert!(problem.error_terminate(&[0.5, 0.4], &[0.51, 0.41], 2, 0.02));
        assert!(!problem.error_terminate(&[0.5, 0.4], &[0.6, 0.41], 2, 0.02));
    }
}
