//! Candidate trap-site layouts
//!
//! Simulation harnesses mostly image regular tweezer lattices, sometimes
//! with calibration jitter, sometimes fully scattered sites. The layouts
//! here produce candidate positions in fractional field-of-view
//! coordinates ready for the capture entry points.

use std::{env, ops::Deref, time::Instant};

use rand_distr::{Distribution, Normal, Uniform};
use rand_seeder::{Seeder, SipRng};

/// Candidate trap sites in fractional field-of-view coordinates
pub struct Candidates(Vec<(f64, f64)>);

impl Deref for Candidates {
    type Target = Vec<(f64, f64)>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Spatial layouts of candidate sites
///
/// The seed of the random generator can be set with the `SEED` environment
/// variable
///
/// # Example
/// ```
/// use atomcam::{Candidates, SiteDistribution};
/// let sites: Candidates = SiteDistribution::Grid {
///     nx: 5,
///     ny: 4,
///     margin: 0.15,
///     jitter: 0.,
/// }
/// .into();
/// assert_eq!(sites.len(), 20);
/// ```
pub enum SiteDistribution {
    /// Rectangular `nx x ny` lattice spanning `[margin, 1 - margin]` on
    /// both axes, each site displaced by a Gaussian of width `jitter`
    Grid {
        nx: usize,
        ny: usize,
        margin: f64,
        jitter: f64,
    },
    /// Sites scattered uniformly over `[margin, 1 - margin]^2`
    Uniform { n_sites: usize, margin: f64 },
}

impl From<&SiteDistribution> for Candidates {
    fn from(sites: &SiteDistribution) -> Self {
        let mut rng: SipRng = if let Ok(seed) = env::var("SEED") {
            Seeder::from(seed).make_rng()
        } else {
            let now = Instant::now();
            Seeder::from(now).make_rng()
        };
        match sites {
            SiteDistribution::Grid {
                nx,
                ny,
                margin,
                jitter,
            } => {
                let displacement = Normal::new(0f64, *jitter).unwrap();
                let pitch = |index: usize, count: usize| {
                    if count < 2 {
                        0.5
                    } else {
                        margin + (1. - 2. * margin) * index as f64 / (count - 1) as f64
                    }
                };
                let mut sites = Vec::with_capacity(nx * ny);
                for i in 0..*ny {
                    for j in 0..*nx {
                        sites.push((
                            pitch(j, *nx) + displacement.sample(&mut rng),
                            pitch(i, *ny) + displacement.sample(&mut rng),
                        ));
                    }
                }
                Self(sites)
            }
            SiteDistribution::Uniform { n_sites, margin } => {
                let position = Uniform::new(*margin, 1. - margin);
                Self(
                    (0..*n_sites)
                        .map(|_| (position.sample(&mut rng), position.sample(&mut rng)))
                        .collect(),
                )
            }
        }
    }
}

impl From<SiteDistribution> for Candidates {
    fn from(sites: SiteDistribution) -> Self {
        (&sites).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_layout() {
        let sites: Candidates = SiteDistribution::Grid {
            nx: 5,
            ny: 4,
            margin: 0.15,
            jitter: 0.,
        }
        .into();
        assert_eq!(sites.len(), 20);
        assert_eq!(sites[0], (0.15, 0.15));
        assert!((sites[4].0 - 0.85).abs() < 1e-12 && (sites[4].1 - 0.15).abs() < 1e-12);
        assert!((sites[19].1 - 0.85).abs() < 1e-12);
    }

    #[test]
    fn jittered_grid_stays_near_the_lattice() {
        let sites: Candidates = SiteDistribution::Grid {
            nx: 10,
            ny: 10,
            margin: 0.2,
            jitter: 0.002,
        }
        .into();
        for (k, &(x, y)) in sites.iter().enumerate() {
            let x0 = 0.2 + 0.6 * (k % 10) as f64 / 9.;
            let y0 = 0.2 + 0.6 * (k / 10) as f64 / 9.;
            assert!((x - x0).abs() < 0.05 && (y - y0).abs() < 0.05);
        }
    }

    #[test]
    fn uniform_scatter_honors_the_margin() {
        let sites: Candidates = SiteDistribution::Uniform {
            n_sites: 200,
            margin: 0.1,
        }
        .into();
        assert_eq!(sites.len(), 200);
        assert!(sites
            .iter()
            .all(|&(x, y)| (0.1..0.9).contains(&x) && (0.1..0.9).contains(&y)));
    }
}
