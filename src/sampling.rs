//! Random-variate sampling kernel
//!
//! All stochastic stages of the imaging pipeline draw from a single
//! [`RvSampler`]: a seeded uniform source with the derived samplers built on
//! top of it (Gaussian, Poisson, Gamma, Gumbel, atom-loss time and the
//! conditional EM-gain distribution of the multiplication register).

use std::hash::Hash;
use std::{env, f64::consts::E, f64::consts::PI, time::Instant};

use rand::Rng;
use rand_seeder::{Seeder, SipRng};

/// Seeded uniform source and derived samplers
///
/// # Example
/// ```
/// use atomcam::RvSampler;
/// let mut rv = RvSampler::seeded("stripy zebra");
/// let photons = rv.sample_poisson(3.2);
/// ```
pub struct RvSampler {
    rng: SipRng,
}

impl RvSampler {
    /// Creates a sampler seeded from the `SEED` environment variable,
    /// falling back to the clock when the variable is not set
    pub fn from_env() -> Self {
        let rng: SipRng = if let Ok(seed) = env::var("SEED") {
            Seeder::from(seed).make_rng()
        } else {
            let now = Instant::now();
            Seeder::from(now).make_rng()
        };
        Self { rng }
    }
    /// Creates a sampler with a fixed seed
    pub fn seeded<S: Hash>(seed: S) -> Self {
        Self {
            rng: Seeder::from(seed).make_rng(),
        }
    }
    /// Returns a uniform draw in `[0,1)`
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen()
    }
    /// Returns a Gaussian draw via the Box-Muller transform
    ///
    /// Only the cosine branch is kept; the log argument is taken from
    /// `(0,1]` so the transform stays finite.
    pub fn sample_gaussian(&mut self, mean: f64, stdev: f64) -> f64 {
        let amplitude = (-2. * (1. - self.uniform()).ln()).sqrt();
        let phase = 2. * PI * self.uniform();
        amplitude * phase.cos() * stdev + mean
    }
    /// Returns an integer-valued Poisson draw with the given mean
    ///
    /// Knuth's multiplicative algorithm below `lambda = 10`, Hörmann's
    /// transformed rejection (PTRS) above it.
    pub fn sample_poisson(&mut self, lambda: f64) -> f64 {
        if lambda <= 0. {
            0.
        } else if lambda < 10. {
            self.poisson_knuth(lambda)
        } else {
            self.poisson_ptrs(lambda)
        }
    }
    fn poisson_knuth(&mut self, lambda: f64) -> f64 {
        let limit = (-lambda).exp();
        let mut k = 0u64;
        let mut p = self.uniform();
        while p > limit {
            k += 1;
            p *= self.uniform();
        }
        k as f64
    }
    // Hörmann 1993, "The transformed rejection method for generating
    // Poisson random variables", valid for lambda >= 10
    fn poisson_ptrs(&mut self, lambda: f64) -> f64 {
        let log_lambda = lambda.ln();
        let b = 0.931 + 2.53 * lambda.sqrt();
        let a = -0.059 + 0.02483 * b;
        let inv_alpha = 1.1239 + 1.1328 / (b - 3.4);
        let v_r = 0.9277 - 3.6224 / (b - 2.);
        loop {
            let u = self.uniform() - 0.5;
            let v = self.uniform();
            let u_shifted = 0.5 - u.abs();
            let k = ((2. * a / u_shifted + b) * u + lambda + 0.43).floor();
            if u_shifted >= 0.07 && v <= v_r {
                return k;
            }
            if k < 0. || (u_shifted < 0.013 && v > u_shifted) {
                continue;
            }
            if (v * inv_alpha / (a / (u_shifted * u_shifted) + b)).ln()
                <= k * log_lambda - lambda - ln_gamma(k + 1.)
            {
                return k;
            }
        }
    }
    /// Returns a Gamma draw with the given shape and rate
    ///
    /// Marsaglia-Tsang for `shape >= 1`; smaller shapes sample
    /// `Gamma(shape + 1)` and apply Johnk's boost `U^(1/shape)`.
    pub fn sample_gamma(&mut self, shape: f64, rate: f64) -> f64 {
        let value = if shape < 1. {
            self.marsaglia_tsang(shape + 1.) * self.uniform().powf(1. / shape)
        } else {
            self.marsaglia_tsang(shape)
        };
        value / rate
    }
    // Marsaglia & Tsang 2000 squeeze-rejection, shape >= 1, unit rate
    fn marsaglia_tsang(&mut self, shape: f64) -> f64 {
        let d = shape - 1. / 3.;
        let c = 1. / (9. * d).sqrt();
        loop {
            let (x, v) = loop {
                let x = self.sample_gaussian(0., 1.);
                let v = 1. + c * x;
                if v > 0. {
                    break (x, v);
                }
            };
            let v = v * v * v;
            let u = self.uniform();
            if u < 1. - 0.0331 * (x * x) * (x * x) {
                return d * v;
            }
            if u.ln() < 0.5 * x * x + d * (1. - v + v.ln()) {
                return d * v;
            }
        }
    }
    /// Returns a Gumbel draw by inverse CDF
    pub fn sample_gumbel(&mut self, location: f64, scale: f64) -> f64 {
        location - scale * (-(1. - self.uniform()).ln()).ln()
    }
    /// Returns the fractional exposure time at which a lost atom went dark
    ///
    /// Exponential-in-time survival model conditioned on loss within the
    /// exposure: `t = ln((s - 1) U + 1)/ln(s)`, in `[0,1)`.
    pub fn sample_atom_loss_time(&mut self, survival_probability: f64) -> f64 {
        ((survival_probability - 1.) * self.uniform() + 1.).ln() / survival_probability.ln()
    }
    /// Returns the secondary-electron count out of the multiplication
    /// register, given `primary` input electrons and total gain `em_gain`
    ///
    /// The register output follows
    /// `P(n|x) = n^(x-1) exp(-n/g) / (g^x (x-1)!)` with `x` primaries and
    /// gain `g`, so `CDF(n|x) = 1 - Q(x, n/g)` with `Q` the regularized
    /// upper incomplete Gamma function. A uniform draw is pushed through
    /// the inverse CDF by third-order Schröder iteration on
    /// `f(b) = 1 - Q(x, b)`, `b = n/g`, starting from `b = x` and stopping
    /// once the squared step falls below `1/(100 g^2)`. One primary reduces
    /// to a plain exponential.
    pub fn sample_em_gain(&mut self, primary: u64, em_gain: f64) -> f64 {
        if primary == 0 {
            return 0.;
        }
        if primary == 1 {
            return (-em_gain * (1. - self.uniform()).ln()).trunc();
        }
        let x = primary as f64;
        // e^x (x-1)!/x^(x-1), accumulated factor by factor to stay in range
        let mut prefactor = E;
        for i in 1..primary {
            prefactor *= i as f64 / x * E;
        }
        let u = self.uniform();
        let tolerance = 1. / (100. * em_gain * em_gain);
        let mut b = x;
        for _ in 0..100 {
            // sum_j prod_{i=j+1}^{x-1} i/b, the Q-series at the current b
            let mut sum = 1.;
            let mut summand = 1.;
            for j in (1..primary).rev() {
                summand *= j as f64 / b;
                sum += summand;
            }
            let f_over_deriv = prefactor * (x / b).powf(x - 1.) * u * (b - x).exp() - sum;
            let curvature_ratio = (x - 1.) / b - 1.;
            let change = f_over_deriv * (1. + f_over_deriv * curvature_ratio / 2.);
            b -= change;
            if change * change <= tolerance {
                break;
            }
        }
        (b * em_gain).trunc()
    }
}

// Stirling series with the argument shifted above 10 by the recurrence
// ln G(x) = ln G(x+1) - ln x
pub(crate) fn ln_gamma(x: f64) -> f64 {
    let mut x = x;
    let mut shift = 0.;
    while x < 10. {
        shift -= x.ln();
        x += 1.;
    }
    let inv = 1. / x;
    let inv_sq = inv * inv;
    let series = inv * (1. / 12. - inv_sq * (1. / 360. - inv_sq * (1. / 1260. - inv_sq / 1680.)));
    shift + 0.5 * (2. * PI).ln() + (x - 0.5) * x.ln() - x + series
}
