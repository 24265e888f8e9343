//! Random processes shared by the synthetic profile generators.

use std::f64::consts::TAU;

use rand::{Rng, rngs::StdRng};

/// Zero-mean normal sample scaled to `std_dev` (Box-Muller, cosine branch).
///
/// Drives the [`Ar1`] shocks behind cloud cover and wind, the hourly jitter
/// of the synthetic spot price and the demand wobble. A non-positive
/// `std_dev` switches the noise off without drawing from `rng`, so a
/// noiseless generator keeps the stream of its other draws unchanged.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    // keep ln() finite
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    std_dev * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// First-order autoregressive process clamped to a band.
///
/// The state evolves as:
/// ```text
/// x(t) = mean + alpha * (x(t-1) - mean) + epsilon(t)
/// ```
/// where `epsilon` is Gaussian noise with standard deviation `noise_std`.
#[derive(Debug, Clone)]
pub struct Ar1 {
    /// Long-run mean the process reverts to.
    pub mean: f64,
    /// Persistence (0.0 = white noise, 1.0 = random walk).
    pub alpha: f64,
    /// Innovation standard deviation.
    pub noise_std: f64,
    /// Lower clamp.
    pub min: f64,
    /// Upper clamp.
    pub max: f64,
    state: f64,
}

impl Ar1 {
    /// Creates a process starting at its mean.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`.
    pub fn new(mean: f64, alpha: f64, noise_std: f64, min: f64, max: f64) -> Self {
        assert!(min <= max, "min must be <= max");
        Self {
            mean,
            alpha: alpha.clamp(0.0, 1.0),
            noise_std: noise_std.max(0.0),
            min,
            max,
            state: mean.clamp(min, max),
        }
    }

    /// Advances the process by one step and returns the new value.
    pub fn advance(&mut self, rng: &mut StdRng) -> f64 {
        let epsilon = gaussian_noise(rng, self.noise_std);
        self.state = self.mean + self.alpha * (self.state - self.mean) + epsilon;
        self.state = self.state.clamp(self.min, self.max);
        self.state
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn zero_std_gives_zero_noise() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(gaussian_noise(&mut rng, 0.0), 0.0);
        assert_eq!(gaussian_noise(&mut rng, -1.0), 0.0);
    }

    #[test]
    fn disabled_noise_leaves_the_stream_untouched() {
        let mut a = StdRng::seed_from_u64(5);
        let mut b = StdRng::seed_from_u64(5);
        gaussian_noise(&mut a, 0.0);
        assert_eq!(gaussian_noise(&mut a, 0.5), gaussian_noise(&mut b, 0.5));
    }

    #[test]
    fn noise_scales_with_std_dev() {
        let n = 5000;
        let spread = |std_dev| {
            let mut rng = StdRng::seed_from_u64(9);
            let sq: f64 = (0..n).map(|_| gaussian_noise(&mut rng, std_dev).powi(2)).sum();
            (sq / n as f64).sqrt()
        };
        let unit = spread(1.0);
        assert!((unit - 1.0).abs() < 0.1, "sample std {unit} too far from 1");
        assert!((spread(0.02) - 0.02 * unit).abs() < 1e-12);
    }

    #[test]
    fn noise_is_roughly_centered() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 5000;
        let mean: f64 = (0..n).map(|_| gaussian_noise(&mut rng, 1.0)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.1, "sample mean {mean} too far from 0");
    }

    #[test]
    fn ar1_stays_within_band() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = Ar1::new(0.8, 0.9, 0.5, 0.2, 1.2);
        for _ in 0..1000 {
            let v = p.advance(&mut rng);
            assert!((0.2..=1.2).contains(&v));
        }
    }

    #[test]
    fn ar1_without_noise_stays_at_mean() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = Ar1::new(0.4, 0.9, 0.0, 0.0, 1.0);
        for _ in 0..10 {
            p.advance(&mut rng);
        }
        assert_eq!(p.value(), 0.4);
    }

    #[test]
    fn same_seed_same_path() {
        let path = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut p = Ar1::new(0.5, 0.8, 0.2, 0.0, 1.0);
            (0..50).map(|_| p.advance(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(path(11), path(11));
        assert_ne!(path(11), path(12));
    }
}
