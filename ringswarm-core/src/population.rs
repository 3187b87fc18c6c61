//! Process-local candidate store
//!
//! A `Population` holds the `pop_size` candidates owned by one process,
//! indexed by local slot. Which logical index a slot corresponds to is a
//! property of the [`GroupLayout`](crate::addressing::GroupLayout), not of
//! the store.

use rand::Rng;

use crate::candidate::Candidate;
use crate::problem::Problem;
use crate::scalar::Scalar;
use crate::{checked_population_size, Error, Result};

/// Candidates owned by one process.
#[derive(Debug, Clone)]
pub struct Population<T> {
    candidates: Vec<Candidate<T>>,
    dimension: usize,
    fitness_len: usize,
}

/// Standard deviation per dimension for Gaussian re-initialization.
///
/// Dimensions below `cut_off` get `prev_dev`, the rest get `new_dev`.
pub fn deviation_profile(dimension: usize, prev_dev: f64, new_dev: f64, cut_off: usize) -> Vec<f64> {
    (0..dimension)
        .map(|i| if i < cut_off { prev_dev } else { new_dev })
        .collect()
}

impl<T: Scalar> Population<T> {
    /// Build a store from already prepared candidates.
    pub fn from_candidates(candidates: Vec<Candidate<T>>) -> Result<Self> {
        let first = candidates
            .first()
            .ok_or(Error::InvalidPopulationSize { size: 0 })?;
        let (dimension, fitness_len) = (first.dimension(), first.fitness_len());
        if fitness_len == 0 {
            return Err(Error::InvalidParameter("fitness vector must not be empty".into()));
        }
        for c in &candidates {
            if c.dimension() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    got: c.dimension(),
                });
            }
            if c.fitness_len() != fitness_len {
                return Err(Error::FitnessLengthMismatch {
                    expected: fitness_len,
                    got: c.fitness_len(),
                });
            }
        }
        Ok(Self {
            candidates,
            dimension,
            fitness_len,
        })
    }

    /// Sample `size` candidates uniformly within the problem bounds.
    pub fn uniform<P, R>(size: i64, problem: &mut P, rng: &mut R) -> Result<Self>
    where
        P: Problem<T>,
        R: Rng + ?Sized,
    {
        let size = checked_population_size(size)?;
        let dimension = problem.dimension();
        let mut population = Self::blank(size, dimension, problem.fitness_len())?;
        let mut input = vec![T::default(); dimension];

        for slot in 0..size {
            for (i, x) in input.iter_mut().enumerate() {
                let (lower, upper) = problem.bounds(i);
                *x = T::sample_uniform(lower, upper, rng);
            }
            population.candidates[slot].set_position(&input)?;
            population.evaluate_contender(slot, problem)?;
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(size, dimension, "uniform population initialized");

        Ok(population)
    }

    /// Sample `size` candidates around a previously found solution.
    ///
    /// The last component of `previous` is replaced by its second-to-last one
    /// before sampling. Leading dimensions use `prev_dev`, the last one uses
    /// `new_dev`.
    pub fn around_previous<P, R>(
        size: i64,
        previous: &[T],
        prev_dev: f64,
        new_dev: f64,
        problem: &mut P,
        rng: &mut R,
    ) -> Result<Self>
    where
        P: Problem<T>,
        R: Rng + ?Sized,
    {
        let size = checked_population_size(size)?;
        let dimension = problem.dimension();
        if previous.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                got: previous.len(),
            });
        }

        let mut centre = previous.to_vec();
        if dimension >= 2 {
            centre[dimension - 1] = centre[dimension - 2];
        }
        let dev = deviation_profile(dimension, prev_dev, new_dev, dimension.saturating_sub(1));
        if let Some((index, &dev)) = dev
            .iter()
            .enumerate()
            .find(|(_, d)| !d.is_finite() || **d < 0.0)
        {
            return Err(Error::InvalidDeviation { index, dev });
        }

        let mut population = Self::blank(size, dimension, problem.fitness_len())?;
        let mut input = vec![T::default(); dimension];
        for slot in 0..size {
            for i in 0..dimension {
                input[i] = T::sample_folded_normal(centre[i], dev[i], rng)?;
            }
            problem.boundary(&mut input);
            population.candidates[slot].set_position(&input)?;
            population.evaluate_contender(slot, problem)?;
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(size, dimension, prev_dev, new_dev, "population seeded from previous solution");

        Ok(population)
    }

    fn blank(size: usize, dimension: usize, fitness_len: usize) -> Result<Self> {
        if fitness_len == 0 {
            return Err(Error::InvalidParameter("fitness vector must not be empty".into()));
        }
        Ok(Self {
            candidates: (0..size).map(|_| Candidate::new(dimension, fitness_len)).collect(),
            dimension,
            fitness_len,
        })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn fitness_len(&self) -> usize {
        self.fitness_len
    }

    pub fn candidate(&self, slot: usize) -> Result<&Candidate<T>> {
        let len = self.candidates.len();
        self.candidates
            .get(slot)
            .ok_or(Error::SlotOutOfRange { slot, len })
    }

    pub fn candidate_mut(&mut self, slot: usize) -> Result<&mut Candidate<T>> {
        let len = self.candidates.len();
        self.candidates
            .get_mut(slot)
            .ok_or(Error::SlotOutOfRange { slot, len })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate<T>> {
        self.candidates.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Candidate<T>> {
        self.candidates.iter_mut()
    }

    /// Evaluate the current position of `slot`.
    ///
    /// The stored fitness is the mean of two independent averaged
    /// evaluations.
    pub fn evaluate_contender<P: Problem<T>>(&mut self, slot: usize, problem: &mut P) -> Result<()> {
        let fitness_len = self.fitness_len;
        let candidate = self.candidate_mut(slot)?;
        let repeat = problem.num_repeat();
        let first = checked_fitness(problem.evaluate(candidate.position(), repeat), fitness_len)?;
        let second = checked_fitness(problem.evaluate(candidate.position(), repeat), fitness_len)?;
        let mean: Vec<f64> = first
            .iter()
            .zip(&second)
            .map(|(a, b)| (a + b) / 2.0)
            .collect();
        candidate.set_fitness(&mean)
    }

    /// Re-evaluate the personal best of `slot` once.
    pub fn reevaluate_best<P: Problem<T>>(&mut self, slot: usize, problem: &mut P) -> Result<()> {
        let fitness_len = self.fitness_len;
        let repeat = problem.num_repeat();
        let candidate = self.candidate_mut(slot)?;
        let fit = checked_fitness(problem.evaluate(candidate.best_position(), repeat), fitness_len)?;
        let position = candidate.best_position().to_vec();
        candidate.set_personal_best(&position, &fit)
    }

    /// Re-evaluate every personal best.
    pub fn refresh_best_fitness<P: Problem<T>>(&mut self, problem: &mut P) -> Result<()> {
        for slot in 0..self.len() {
            self.reevaluate_best(slot, problem)?;
        }
        Ok(())
    }

    /// Copy every personal best into the global-best slot.
    ///
    /// Active half of the local-to-global hook, for algorithms that keep a
    /// single global reference only after the fact.
    pub fn promote_personal_to_global(&mut self) {
        for candidate in &mut self.candidates {
            candidate.promote_best_to_global();
        }
    }
}

fn checked_fitness(fitness: Vec<f64>, expected: usize) -> Result<Vec<f64>> {
    if fitness.len() != expected {
        return Err(Error::FitnessLengthMismatch {
            expected,
            got: fitness.len(),
        });
    }
    Ok(fitness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::StructuralParams;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Deterministic problem counting evaluations
    struct Counting {
        calls: usize,
        dim: usize,
    }

    impl Problem<f64> for Counting {
        fn dimension(&self) -> usize {
            self.dim
        }

        fn fitness_len(&self) -> usize {
            2
        }

        fn bounds(&self, dimension: usize) -> (f64, f64) {
            (dimension as f64, dimension as f64 + 1.0)
        }

        fn wrap(&self, position: &mut [f64]) {
            for x in position {
                *x = x.min(10.0);
            }
        }

        fn evaluate(&mut self, position: &[f64], _repeat: usize) -> Vec<f64> {
            self.calls += 1;
            vec![position.iter().sum(), self.calls as f64]
        }

        fn structural_terminate(&self, _fitness: &[f64], _params: &StructuralParams) -> bool {
            false
        }

        fn error_terminate(&self, _c: &[f64], _r: &[f64], _size: usize, _goal: f64) -> bool {
            false
        }
    }

    #[test]
    fn uniform_rejects_non_positive_sizes() {
        let mut problem = Counting { calls: 0, dim: 2 };
        let mut rng = StdRng::seed_from_u64(1);
        for size in [0, -1] {
            let err = Population::<f64>::uniform(size, &mut problem, &mut rng).unwrap_err();
            assert_eq!(err, Error::InvalidPopulationSize { size });
        }
        assert_eq!(problem.calls, 0);
    }

    #[test]
    fn uniform_respects_bounds_and_evaluates_twice() {
        let mut problem = Counting { calls: 0, dim: 3 };
        let mut rng = StdRng::seed_from_u64(2);
        let pop = Population::<f64>::uniform(5, &mut problem, &mut rng).unwrap();
        assert_eq!(pop.len(), 5);
        assert_eq!(problem.calls, 10);
        for c in pop.iter() {
            for (i, &x) in c.position().iter().enumerate() {
                assert!(x >= i as f64 && x < i as f64 + 1.0);
            }
            assert!((c.fitness()[0] - c.position().iter().sum::<f64>()).abs() < 1e-12);
        }
    }

    #[test]
    fn around_previous_reuses_second_to_last_component() {
        let mut problem = Counting { calls: 0, dim: 3 };
        let mut rng = StdRng::seed_from_u64(3);
        let pop =
            Population::<f64>::around_previous(4, &[1.0, 2.0, 9.0], 0.0, 0.0, &mut problem, &mut rng)
                .unwrap();
        for c in pop.iter() {
            assert_eq!(c.position(), &[1.0, 2.0, 2.0]);
        }
    }

    #[test]
    fn around_previous_rejects_bad_inputs() {
        let mut problem = Counting { calls: 0, dim: 2 };
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            Population::<f64>::around_previous(2, &[1.0], 0.1, 0.1, &mut problem, &mut rng),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            Population::<f64>::around_previous(2, &[1.0, 1.0], 0.1, -1.0, &mut problem, &mut rng),
            Err(Error::InvalidDeviation { index: 1, .. })
        ));
        assert!(matches!(
            Population::<f64>::around_previous(-1, &[1.0, 1.0], 0.1, 0.1, &mut problem, &mut rng),
            Err(Error::InvalidPopulationSize { size: -1 })
        ));
    }

    #[test]
    fn deviation_profile_splits_at_cut_off() {
        assert_eq!(deviation_profile(4, 0.1, 0.5, 3), vec![0.1, 0.1, 0.1, 0.5]);
    }

    #[test]
    fn promote_copies_every_personal_best() {
        let mut problem = Counting { calls: 0, dim: 2 };
        let mut rng = StdRng::seed_from_u64(5);
        let mut pop = Population::<f64>::uniform(3, &mut problem, &mut rng).unwrap();
        for c in pop.iter_mut() {
            c.update_best();
        }
        pop.promote_personal_to_global();
        for c in pop.iter() {
            assert_eq!(c.global_position(), c.best_position());
            assert_eq!(c.global_fitness(), c.best_fitness());
        }
    }

    #[test]
    fn refresh_replaces_best_fitness_with_one_fresh_evaluation() {
        let mut problem = Counting { calls: 0, dim: 2 };
        let mut rng = StdRng::seed_from_u64(7);
        let mut pop = Population::<f64>::uniform(3, &mut problem, &mut rng).unwrap();
        for c in pop.iter_mut() {
            c.update_best();
        }
        let positions: Vec<Vec<f64>> = pop.iter().map(|c| c.best_position().to_vec()).collect();
        let before = problem.calls;

        pop.refresh_best_fitness(&mut problem).unwrap();

        assert_eq!(problem.calls, before + 3);
        for (slot, (c, position)) in pop.iter().zip(&positions).enumerate() {
            assert_eq!(c.best_position(), position.as_slice());
            let expected = [position.iter().sum::<f64>(), (before + slot + 1) as f64];
            assert_eq!(c.best_fitness(), &expected);
        }
        assert_eq!(
            pop.reevaluate_best(3, &mut problem).unwrap_err(),
            Error::SlotOutOfRange { slot: 3, len: 3 }
        );
    }

    #[test]
    fn slot_access_is_checked() {
        let mut problem = Counting { calls: 0, dim: 1 };
        let mut rng = StdRng::seed_from_u64(6);
        let pop = Population::<f64>::uniform(2, &mut problem, &mut rng).unwrap();
        assert_eq!(
            pop.candidate(2).unwrap_err(),
            Error::SlotOutOfRange { slot: 2, len: 2 }
        );
    }
}
