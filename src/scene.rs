//! Emitter scene assembly
//!
//! Decides which candidate sites hold an atom, places the occupied atoms on
//! the super-sampled canvas and runs the optical model over it. Ground
//! truth is an explicit per-candidate array: 1 for an atom that survived
//! the exposure, 0 for an empty site, and the fractional exposure time at
//! which the atom went dark for an atom lost mid-exposure.

use std::f64::consts::PI;

use crate::{config::SimulationConfig, optics, sampling::RvSampler};

/// An occupied trap site, addressed by its candidate index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    /// Index into the candidate list
    pub site: usize,
    pub x: f64,
    pub y: f64,
}

/// Super-sampled image canvas
///
/// The signal lives in the centered `height x width` window of a
/// `2 height x 2 width` buffer; the surrounding zero padding absorbs the
/// circular-convolution wraparound of the optical model. One canvas is
/// allocated per frame and dropped with it.
pub struct Canvas {
    pub(crate) height: usize,
    pub(crate) width: usize,
    pub(crate) data: Vec<f64>,
}

impl Canvas {
    /// Allocates a zeroed canvas for a `height x width` signal window
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![0f64; 4 * height * width],
        }
    }
    /// Signal window dimensions `(height, width)`
    pub fn window(&self) -> (usize, usize) {
        (self.height, self.width)
    }
    /// Full padded buffer, row-major `2 height x 2 width`
    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Draws the occupancy of every candidate site
///
/// Independent Bernoulli with probability `filling_ratio` per site. When a
/// ground-truth buffer is given it receives 1 or 0 at each candidate
/// position. Occupied sites come back in candidate order.
pub fn fill_atom_locations(
    rv: &mut RvSampler,
    candidates: &[(f64, f64)],
    filling_ratio: f64,
    mut truth: Option<&mut [f64]>,
) -> Vec<Atom> {
    let mut atoms = Vec::new();
    for (site, &(x, y)) in candidates.iter().enumerate() {
        let occupied = rv.uniform() <= filling_ratio;
        if let Some(truth) = truth.as_deref_mut() {
            truth[site] = if occupied { 1. } else { 0. };
        }
        if occupied {
            atoms.push(Atom { site, x, y });
        }
    }
    atoms
}

/// Brings atom positions into fractional field-of-view coordinates
///
/// Positions already in camera coordinates pass through unchanged;
/// otherwise they are divided by the object-plane field of view.
pub fn normalize_camera_coords(cfg: &SimulationConfig, atoms: &mut [Atom], camera_coords: bool) {
    if camera_coords {
        return;
    }
    let (fov_width, fov_height) = cfg.field_of_view();
    for atom in atoms.iter_mut() {
        atom.x /= fov_width;
        atom.y /= fov_height;
    }
}

/// Paints the atoms onto the canvas and images them through the optics
///
/// Each atom inside the field of view is deposited into the centered
/// window, either as a single cell or as a full-canvas Gaussian of peak
/// `1/(2 pi sigma^2)` when the light source is broadened. An atom lost
/// mid-exposure scales down to its loss time, which also overwrites its
/// ground-truth slot. The optical model runs once over the whole canvas if
/// anything was in sight.
pub fn init_image_and_simulate_optical_effects(
    canvas: &mut Canvas,
    atoms: &[Atom],
    mut truth: Option<&mut [f64]>,
    approximation_steps: usize,
    cfg: &SimulationConfig,
    rv: &mut RvSampler,
) {
    let height = canvas.height;
    let width = canvas.width;
    let fractional_solid_angle =
        (1. - (1. - cfg.numerical_aperture * cfg.numerical_aperture).sqrt()) / 2.;
    let photons_per_atom = fractional_solid_angle
        * cfg.scattering_rate
        * cfg.exposure_time
        * cfg.quantum_efficiency;

    canvas.data.iter_mut().for_each(|cell| *cell = 0.);

    let sigma = cfg.light_source_stdev * approximation_steps as f64;
    let peak = if sigma > 0. {
        1. / (2. * PI * sigma * sigma)
    } else {
        1.
    };

    let mut any_within_sight = false;
    for atom in atoms {
        let x = width as f64 * atom.x;
        let y = height as f64 * atom.y;
        if x < 0. || y < 0. || x >= width as f64 || y >= height as f64 {
            continue;
        }
        // into the centered window
        let x = x + (width / 2) as f64;
        let y = y + (height / 2) as f64;
        any_within_sight = true;
        let mut brightness = 1.;
        if rv.uniform() > cfg.survival_probability {
            brightness = rv.sample_atom_loss_time(cfg.survival_probability);
            if let Some(truth) = truth.as_deref_mut() {
                truth[atom.site] = brightness;
            }
        }
        if sigma > 0. {
            for yi in 0..2 * height {
                for xi in 0..2 * width {
                    let dx = xi as f64 - x;
                    let dy = yi as f64 - y;
                    canvas.data[yi * 2 * width + xi] +=
                        brightness * peak * (-(dx * dx + dy * dy) / (2. * sigma * sigma)).exp();
                }
            }
        } else {
            canvas.data[y as usize * 2 * width + x as usize] += brightness;
        }
    }

    if any_within_sight {
        optics::simulate_optics(
            &mut canvas.data,
            2 * height,
            2 * width,
            cfg.pixel_size / approximation_steps as f64,
            photons_per_atom,
            cfg,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photons_per_atom(cfg: &SimulationConfig) -> f64 {
        let solid_angle =
            (1. - (1. - cfg.numerical_aperture * cfg.numerical_aperture).sqrt()) / 2.;
        solid_angle * cfg.scattering_rate * cfg.exposure_time * cfg.quantum_efficiency
    }

    #[test]
    fn filling_ratio_statistics() {
        let mut rv = RvSampler::seeded("filling ratio");
        let candidates: Vec<(f64, f64)> = (0..1000)
            .map(|k| {
                let (i, j) = (k / 100, k % 100);
                (0.1 + 0.8 * j as f64 / 99., 0.1 + 0.8 * i as f64 / 9.)
            })
            .collect();
        let mut truth = vec![0f64; candidates.len()];
        let atoms = fill_atom_locations(&mut rv, &candidates, 0.3, Some(&mut truth));
        let occupied: f64 = truth.iter().sum();
        assert_eq!(occupied as usize, atoms.len());
        assert!((250. ..=350.).contains(&occupied));
        // truth is indexed by candidate, not by occupied atom
        for atom in &atoms {
            assert_eq!(truth[atom.site], 1.);
        }
    }

    #[test]
    fn atom_loss_marks_truth() {
        let mut cfg = SimulationConfig::default();
        cfg.set_resolution(16, 16);
        cfg.survival_probability = 0.5;
        let mut rv = RvSampler::seeded("atom loss truth");
        let candidates: Vec<(f64, f64)> = (0..100)
            .map(|k| {
                let (i, j) = (k / 10, k % 10);
                (0.1 + 0.08 * j as f64, 0.1 + 0.08 * i as f64)
            })
            .collect();
        let mut truth = vec![0f64; candidates.len()];
        let atoms = fill_atom_locations(&mut rv, &candidates, 1., Some(&mut truth));
        assert_eq!(atoms.len(), 100);
        let mut canvas = Canvas::new(16, 16);
        init_image_and_simulate_optical_effects(
            &mut canvas,
            &atoms,
            Some(&mut truth),
            1,
            &cfg,
            &mut rv,
        );
        let lost = truth.iter().filter(|&&t| t > 0. && t < 1.).count();
        let survived = truth.iter().filter(|&&t| t == 1.).count();
        assert_eq!(lost + survived, 100);
        assert!((25..=75).contains(&lost));
    }

    #[test]
    fn camera_coordinates_pass_through() {
        let cfg = SimulationConfig::default();
        let mut atoms = vec![Atom {
            site: 0,
            x: 0.25,
            y: 0.75,
        }];
        normalize_camera_coords(&cfg, &mut atoms, true);
        assert_eq!((atoms[0].x, atoms[0].y), (0.25, 0.75));
    }

    #[test]
    fn physical_coordinates_are_normalized() {
        let cfg = SimulationConfig::default();
        let (fov_width, fov_height) = cfg.field_of_view();
        let mut atoms = vec![Atom {
            site: 0,
            x: 0.5 * fov_width,
            y: 0.25 * fov_height,
        }];
        normalize_camera_coords(&cfg, &mut atoms, false);
        assert!((atoms[0].x - 0.5).abs() < 1e-12);
        assert!((atoms[0].y - 0.25).abs() < 1e-12);
    }

    #[test]
    fn single_atom_photon_budget() {
        let mut cfg = SimulationConfig::default();
        cfg.set_resolution(16, 16);
        let mut rv = RvSampler::seeded("photon budget");
        let atoms = [Atom {
            site: 0,
            x: 0.5,
            y: 0.5,
        }];
        let mut canvas = Canvas::new(16, 16);
        init_image_and_simulate_optical_effects(&mut canvas, &atoms, None, 1, &cfg, &mut rv);
        let total: f64 = canvas.data().iter().sum();
        let expected = photons_per_atom(&cfg);
        assert!((total - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn broadened_source_keeps_the_photon_budget() {
        let mut cfg = SimulationConfig::default();
        cfg.set_resolution(16, 16);
        cfg.light_source_stdev = 1.;
        let mut rv = RvSampler::seeded("broadened source");
        let atoms = [Atom {
            site: 0,
            x: 0.5,
            y: 0.5,
        }];
        let mut canvas = Canvas::new(16, 16);
        init_image_and_simulate_optical_effects(&mut canvas, &atoms, None, 1, &cfg, &mut rv);
        let total: f64 = canvas.data().iter().sum();
        // the Gaussian kernel integrates to one up to its clipped tails
        let expected = photons_per_atom(&cfg);
        assert!((total - expected).abs() / expected < 0.02);
    }

    #[test]
    fn out_of_sight_atoms_leave_the_canvas_dark() {
        let cfg = SimulationConfig::default();
        let mut rv = RvSampler::seeded("out of sight");
        let atoms = [
            Atom {
                site: 0,
                x: -0.2,
                y: 0.5,
            },
            Atom {
                site: 1,
                x: 0.5,
                y: 1.3,
            },
        ];
        let mut canvas = Canvas::new(8, 8);
        init_image_and_simulate_optical_effects(&mut canvas, &atoms, None, 1, &cfg, &mut rv);
        assert!(canvas.data().iter().all(|&cell| cell == 0.));
    }
}
