//! Per-candidate state
//!
//! Fitness vectors have a fixed length; index 0 is the maximized criterion
//! and the remaining entries are diagnostics read by termination predicates.

use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;
use crate::{Error, Result};

/// One member of the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Scalar")]
pub struct Candidate<T> {
    position: Vec<T>,
    velocity: Vec<T>,
    fitness: Vec<f64>,
    best_position: Vec<T>,
    best_fitness: Vec<f64>,
    global_position: Vec<T>,
    global_fitness: Vec<f64>,
}

impl<T: Scalar> Candidate<T> {
    /// Create a zeroed candidate with unset bests.
    pub fn new(dimension: usize, fitness_len: usize) -> Self {
        Self {
            position: vec![T::default(); dimension],
            velocity: vec![T::default(); dimension],
            fitness: vec![f64::NEG_INFINITY; fitness_len],
            best_position: vec![T::default(); dimension],
            best_fitness: vec![f64::NEG_INFINITY; fitness_len],
            global_position: vec![T::default(); dimension],
            global_fitness: vec![f64::NEG_INFINITY; fitness_len],
        }
    }

    /// Number of position components
    pub fn dimension(&self) -> usize {
        self.position.len()
    }

    /// Length of every fitness vector
    pub fn fitness_len(&self) -> usize {
        self.fitness.len()
    }

    pub fn position(&self) -> &[T] {
        &self.position
    }

    pub fn velocity(&self) -> &[T] {
        &self.velocity
    }

    /// Fitness vector of the most recent evaluation
    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    /// Scalar criterion of the most recent evaluation
    pub fn current_fit(&self) -> f64 {
        self.fitness[0]
    }

    pub fn best_position(&self) -> &[T] {
        &self.best_position
    }

    pub fn best_fitness(&self) -> &[f64] {
        &self.best_fitness
    }

    /// Scalar criterion of the personal best
    pub fn best_fit(&self) -> f64 {
        self.best_fitness[0]
    }

    pub fn global_position(&self) -> &[T] {
        &self.global_position
    }

    pub fn global_fitness(&self) -> &[f64] {
        &self.global_fitness
    }

    /// Scalar criterion of the neighborhood best
    pub fn global_fit(&self) -> f64 {
        self.global_fitness[0]
    }

    pub fn set_position(&mut self, position: &[T]) -> Result<()> {
        check_len(self.position.len(), position.len(), Error::dimension)?;
        self.position.copy_from_slice(position);
        Ok(())
    }

    pub fn set_velocity(&mut self, velocity: &[T]) -> Result<()> {
        check_len(self.velocity.len(), velocity.len(), Error::dimension)?;
        self.velocity.copy_from_slice(velocity);
        Ok(())
    }

    pub fn set_fitness(&mut self, fitness: &[f64]) -> Result<()> {
        check_len(self.fitness.len(), fitness.len(), Error::fitness)?;
        self.fitness.copy_from_slice(fitness);
        Ok(())
    }

    /// Overwrite the personal best directly.
    pub fn set_personal_best(&mut self, position: &[T], fitness: &[f64]) -> Result<()> {
        check_len(self.best_position.len(), position.len(), Error::dimension)?;
        check_len(self.best_fitness.len(), fitness.len(), Error::fitness)?;
        self.best_position.copy_from_slice(position);
        self.best_fitness.copy_from_slice(fitness);
        Ok(())
    }

    /// Overwrite the neighborhood best.
    pub fn set_global_best(&mut self, position: &[T], fitness: &[f64]) -> Result<()> {
        check_len(self.global_position.len(), position.len(), Error::dimension)?;
        check_len(self.global_fitness.len(), fitness.len(), Error::fitness)?;
        self.global_position.copy_from_slice(position);
        self.global_fitness.copy_from_slice(fitness);
        Ok(())
    }

    /// Personal best := current position and fitness.
    pub fn update_best(&mut self) {
        self.best_position.clone_from(&self.position);
        self.best_fitness.clone_from(&self.fitness);
    }

    /// Global best := personal best.
    pub fn promote_best_to_global(&mut self) {
        self.global_position.clone_from(&self.best_position);
        self.global_fitness.clone_from(&self.best_fitness);
    }
}

fn check_len(expected: usize, got: usize, err: fn(usize, usize) -> Error) -> Result<()> {
    if expected != got {
        return Err(err(expected, got));
    }
    Ok(())
}

impl Error {
    fn dimension(expected: usize, got: usize) -> Self {
        Error::DimensionMismatch { expected, got }
    }

    fn fitness(expected: usize, got: usize) -> Self {
        Error::FitnessLengthMismatch { expected, got }
    }
}
