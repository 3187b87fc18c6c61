//! Numeric element type of a search space
//!
//! A run is either real-valued (`f64`) or complex-valued (`Complex64`).
//! The element type is fixed at compile time; its serde representation is
//! what goes on the wire when positions are exchanged between processes.

use core::fmt::Debug;
use core::ops::{Add, Sub};

use num_complex::Complex64;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

/// Element of a position or velocity vector.
pub trait Scalar:
    Copy
    + Default
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Embed a real value
    fn from_real(value: f64) -> Self;

    /// Multiply by a real factor
    fn scale(self, factor: f64) -> Self;

    /// Clamp every real component into `[-limit, limit]`
    fn clamp_components(self, limit: f64) -> Self;

    /// Largest absolute value over the real components
    fn max_component(self) -> f64;

    /// Uniform sample with every real component in `[lower, upper)`
    fn sample_uniform<R: Rng + ?Sized>(lower: f64, upper: f64, rng: &mut R) -> Self;

    /// Gaussian sample around `mean`, folded to non-negative components
    fn sample_folded_normal<R: Rng + ?Sized>(mean: Self, std_dev: f64, rng: &mut R)
        -> Result<Self>;
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    let invalid = || Error::InvalidParameter(format!(
        "standard deviation must be finite and non-negative, got {std_dev}"
    ));
    // Normal::new accepts a negative deviation and mirrors the samples
    if !(std_dev.is_finite() && std_dev >= 0.0) {
        return Err(invalid());
    }
    Normal::new(mean, std_dev).map_err(|_| invalid())
}

impl Scalar for f64 {
    #[inline]
    fn from_real(value: f64) -> Self {
        value
    }

    #[inline]
    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    #[inline]
    fn clamp_components(self, limit: f64) -> Self {
        self.clamp(-limit, limit)
    }

    #[inline]
    fn max_component(self) -> f64 {
        self.abs()
    }

    fn sample_uniform<R: Rng + ?Sized>(lower: f64, upper: f64, rng: &mut R) -> Self {
        lower + rng.gen::<f64>() * (upper - lower)
    }

    fn sample_folded_normal<R: Rng + ?Sized>(mean: Self, std_dev: f64, rng: &mut R) -> Result<Self> {
        Ok(normal(mean, std_dev)?.sample(rng).abs())
    }
}

impl Scalar for Complex64 {
    #[inline]
    fn from_real(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }

    #[inline]
    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    #[inline]
    fn clamp_components(self, limit: f64) -> Self {
        Complex64::new(self.re.clamp(-limit, limit), self.im.clamp(-limit, limit))
    }

    #[inline]
    fn max_component(self) -> f64 {
        self.re.abs().max(self.im.abs())
    }

    fn sample_uniform<R: Rng + ?Sized>(lower: f64, upper: f64, rng: &mut R) -> Self {
        Complex64::new(
            f64::sample_uniform(lower, upper, rng),
            f64::sample_uniform(lower, upper, rng),
        )
    }

    fn sample_folded_normal<R: Rng + ?Sized>(mean: Self, std_dev: f64, rng: &mut R) -> Result<Self> {
        Ok(Complex64::new(
            normal(mean.re, std_dev)?.sample(rng).abs(),
            normal(mean.im, std_dev)?.sample(rng).abs(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn real_clamp_is_symmetric() {
        assert_eq!(0.7f64.clamp_components(0.2), 0.2);
        assert_eq!((-0.7f64).clamp_components(0.2), -0.2);
        assert_eq!(0.1f64.clamp_components(0.2), 0.1);
    }

    #[test]
    fn complex_clamp_is_per_component() {
        let z = Complex64::new(3.0, -0.05).clamp_components(0.2);
        assert_eq!(z, Complex64::new(0.2, -0.05));
        assert!((z.max_component() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn uniform_samples_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let x = f64::sample_uniform(-1.5, 2.5, &mut rng);
            assert!((-1.5..2.5).contains(&x));
        }
    }

    #[test]
    fn folded_normal_is_non_negative() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let z = Complex64::sample_folded_normal(Complex64::new(0.0, 0.0), 1.0, &mut rng)
                .unwrap();
            assert!(z.re >= 0.0 && z.im >= 0.0);
        }
    }

    #[test]
    fn negative_deviation_is_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(f64::sample_folded_normal(1.0, -0.5, &mut rng).is_err());
        assert!(f64::sample_folded_normal(1.0, f64::NAN, &mut rng).is_err());
        assert!(Complex64::sample_folded_normal(Complex64::new(1.0, 1.0), -0.5, &mut rng).is_err());
    }

    #[test]
    fn zero_deviation_returns_the_folded_mean() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(f64::sample_folded_normal(-2.0, 0.0, &mut rng).unwrap(), 2.0);
    }
}
