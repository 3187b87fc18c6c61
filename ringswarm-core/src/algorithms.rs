//! Local particle swarm rules
//!
//! Everything here touches one candidate on one process. The neighborhood
//! best these rules read is maintained by the distributed protocols.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::scalar::Scalar;
use crate::{Error, Result};

/// Particle Swarm Optimization (PSO) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsoConfig {
    /// Cognitive coefficient (attraction to personal best)
    pub phi1: f64,
    /// Social coefficient (attraction to neighborhood best)
    pub phi2: f64,
    /// Maximum absolute velocity per component
    pub max_velocity: f64,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            phi1: 0.6,
            phi2: 1.0,
            max_velocity: 0.2,
        }
    }
}

impl PsoConfig {
    /// Check coefficient ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_velocity.is_finite() && self.max_velocity > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "max_velocity must be positive, got {}",
                self.max_velocity
            )));
        }
        for (name, value) in [("phi1", self.phi1), ("phi2", self.phi2)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Give a fresh candidate its starting state.
///
/// The personal best becomes the current position and every velocity
/// component is drawn uniformly from `[0, max_velocity)`.
pub fn seed_particle<T: Scalar, R: Rng + ?Sized>(
    candidate: &mut Candidate<T>,
    config: &PsoConfig,
    rng: &mut R,
) -> Result<()> {
    candidate.update_best();
    let velocity: Vec<T> = (0..candidate.dimension())
        .map(|_| T::from_real(rng.gen::<f64>() * config.max_velocity))
        .collect();
    candidate.set_velocity(&velocity)
}

/// Move one particle.
///
/// Returns the new, not yet wrapped, position and stores the clamped new
/// velocity. The velocity update uses the position before the move.
pub fn advance_particle<T: Scalar, R: Rng + ?Sized>(
    candidate: &mut Candidate<T>,
    config: &PsoConfig,
    rng: &mut R,
) -> Result<Vec<T>> {
    let dim = candidate.dimension();
    let mut new_pos = Vec::with_capacity(dim);
    let mut new_vel = Vec::with_capacity(dim);

    for i in 0..dim {
        let pos = candidate.position()[i];
        let vel = candidate.velocity()[i];
        let personal = candidate.best_position()[i];
        let global = candidate.global_position()[i];

        new_pos.push(pos + vel);
        let pull = (personal - pos).scale(config.phi1 * rng.gen::<f64>())
            + (global - pos).scale(config.phi2 * rng.gen::<f64>());
        new_vel.push((vel + pull).clamp_components(config.max_velocity));
    }

    candidate.set_velocity(&new_vel)?;
    Ok(new_pos)
}

/// Keep the current state as personal best when it is strictly better.
///
/// Returns whether the personal best changed.
pub fn select_personal_best<T: Scalar>(candidate: &mut Candidate<T>) -> bool {
    if candidate.best_fit() < candidate.current_fit() {
        candidate.update_best();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn particle(position: &[f64], velocity: &[f64], personal: &[f64], global: &[f64]) -> Candidate<f64> {
        let mut c = Candidate::new(position.len(), 1);
        c.set_position(position).unwrap();
        c.set_velocity(velocity).unwrap();
        c.set_personal_best(personal, &[0.0]).unwrap();
        c.set_global_best(global, &[0.0]).unwrap();
        c
    }

    #[test]
    fn position_moves_by_previous_velocity() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = particle(&[1.0, 2.0], &[0.1, -0.2], &[1.0, 2.0], &[1.0, 2.0]);
        let new_pos = advance_particle(&mut c, &PsoConfig::default(), &mut rng).unwrap();
        assert!((new_pos[0] - 1.1).abs() < 1e-12);
        assert!((new_pos[1] - 1.8).abs() < 1e-12);
        // bests coincide with the old position, so only the old velocity remains
        assert_eq!(c.velocity(), &[0.1, -0.2]);
    }

    #[test]
    fn velocity_is_clamped() {
        let mut rng = StdRng::seed_from_u64(2);
        let config = PsoConfig {
            phi1: 5.0,
            phi2: 5.0,
            max_velocity: 0.2,
        };
        let mut c = particle(&[0.0; 4], &[0.15; 4], &[10.0, -10.0, 3.0, -3.0], &[-7.0; 4]);
        for _ in 0..50 {
            advance_particle(&mut c, &config, &mut rng).unwrap();
            assert!(c.velocity().iter().all(|v| v.abs() <= config.max_velocity));
        }
    }

    #[test]
    fn complex_velocity_is_clamped_per_component() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = PsoConfig::default();
        let mut c = Candidate::<Complex64>::new(2, 1);
        c.set_personal_best(&[Complex64::new(4.0, -4.0); 2], &[0.0]).unwrap();
        c.set_global_best(&[Complex64::new(-4.0, 4.0); 2], &[0.0]).unwrap();
        for _ in 0..20 {
            advance_particle(&mut c, &config, &mut rng).unwrap();
            assert!(c
                .velocity()
                .iter()
                .all(|v| v.max_component() <= config.max_velocity));
        }
    }

    #[test]
    fn seed_particle_draws_bounded_velocity() {
        let mut rng = StdRng::seed_from_u64(4);
        let config = PsoConfig::default();
        let mut c = particle(&[0.3; 8], &[0.0; 8], &[0.0; 8], &[0.0; 8]);
        c.set_fitness(&[0.42]).unwrap();
        seed_particle(&mut c, &config, &mut rng).unwrap();
        assert_eq!(c.best_position(), &[0.3; 8]);
        assert_eq!(c.best_fit(), 0.42);
        assert!(c
            .velocity()
            .iter()
            .all(|&v| (0.0..config.max_velocity).contains(&v)));
    }

    #[test]
    fn personal_best_only_improves() {
        let mut c = particle(&[1.0], &[0.0], &[0.0], &[0.0]);
        c.set_personal_best(&[0.0], &[0.5]).unwrap();

        c.set_fitness(&[0.5]).unwrap();
        assert!(!select_personal_best(&mut c));
        assert_eq!(c.best_position(), &[0.0]);

        c.set_fitness(&[0.7]).unwrap();
        assert!(select_personal_best(&mut c));
        assert_eq!(c.best_position(), &[1.0]);
        assert_eq!(c.best_fit(), 0.7);

        c.set_fitness(&[0.1]).unwrap();
        assert!(!select_personal_best(&mut c));
        assert_eq!(c.best_fit(), 0.7);
    }

    #[test]
    fn config_validation() {
        assert!(PsoConfig::default().validate().is_ok());
        let bad = PsoConfig {
            max_velocity: 0.0,
            ..PsoConfig::default()
        };
        assert!(bad.validate().is_err());
        let json = r#"{"phi1": 1.2}"#;
        let parsed: PsoConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.phi1, 1.2);
        assert_eq!(parsed.max_velocity, 0.2);
    }
}
