//! Fourier-optics imaging of an emitter scene
//!
//! The imaging system is modeled by its modulation transfer function,
//! derived from a complex pupil carrying a Zernike phase screen: pupil →
//! amplitude PSF → intensity PSF → OTF → MTF, all on the natural DFT grid.
//! The scene spectrum is multiplied by the MTF and transformed back, then
//! rescaled so the total photon count is conserved.

use std::f64::consts::PI;

use num_complex::Complex;
use num_traits::Zero;

use crate::{config::SimulationConfig, dft::Dft2, zernike::zernike_phase};

/// Replaces `image` with its imaging through the configured optics,
/// normalized to `sum(image) * photons_per_atom` photons
///
/// `image` is a row-major `height x width` map of relative emitter
/// brightness; `effective_pixel_size` is the object-plane size of one of
/// its cells in the same unit as the wavelength. The pupil is cut off at
/// `min(height, width) * effective_pixel_size * NA / wavelength` frequency
/// pixels, with the off-axis anisotropy folded into the pupil coordinates.
pub fn simulate_optics(
    image: &mut [f64],
    height: usize,
    width: usize,
    effective_pixel_size: f64,
    photons_per_atom: f64,
    cfg: &SimulationConfig,
) {
    let (x_fac, y_fac) = if height < width {
        (height as f64 / width as f64, 1.)
    } else {
        (1., width as f64 / height as f64)
    };
    // pupil radius in frequency pixels
    let pupil_radius = height.min(width) as f64 * effective_pixel_size * cfg.numerical_aperture
        / cfg.wavelength;
    log::debug!(
        r"
 . image sampling: {height}x{width}
 . pupil radius  : {pupil_radius:.3}px
 . photons/atom  : {photons_per_atom:.3}
        "
    );

    let mut fwd = Dft2::forward(height, width);
    let mut inv = Dft2::inverse(height, width);

    // complex pupil with the phase screen, centered on the natural grid
    let y_center = ((height - 1) / 2) as f64;
    let x_center = ((width - 1) / 2) as f64;
    let mut pupil = vec![Complex::zero(); height * width];
    for i in 0..height {
        let y = (i as f64 - y_center) * y_fac;
        for j in 0..width {
            let x = (j as f64 - x_center) * x_fac;
            let r = (x * x + y * y).sqrt();
            if r < pupil_radius {
                let phase = 2. * PI / cfg.wavelength
                    * zernike_phase(r / pupil_radius, y.atan2(x), &cfg.zernike_coefficients);
                pupil[i * width + j] = Complex::from_polar(1., phase);
            }
        }
    }

    // amplitude PSF, squared into the intensity PSF, transformed into the
    // OTF and reduced to the MTF
    let psf = fwd.load(pupil).process().norm_sqr();
    let mtf: Vec<f64> = {
        let otf = fwd.load_real(&psf).process().buffer();
        let peak = otf[0].norm();
        otf.iter().map(|o| o.norm() / peak).collect()
    };

    let sum_initial: f64 = image.iter().sum();
    let spectrum = fwd.load_real(image).process().filter_real(&mtf).buffer().to_vec();
    let blurred = inv.load(spectrum).process().norm();

    let dft_scale = (height * width) as f64;
    let mut sum_end = 0.;
    for (pixel, value) in image.iter_mut().zip(&blurred) {
        *pixel = value / dft_scale;
        sum_end += *pixel;
    }
    // photon-count conservation against MTF normalization drift
    let rescale = sum_initial / sum_end * photons_per_atom;
    image.iter_mut().for_each(|pixel| *pixel *= rescale);
}
