//! Sensor back ends
//!
//! A [`Detector`] turns the expected photoelectrons on the super-sampled
//! canvas into a binned frame of read-out samples. [`Emccd`] amplifies
//! binned charge packets through a stochastic multiplication register;
//! [`Cmos`] reads every pixel through its own amplifier before binning.

mod cmos;
mod emccd;
pub use cmos::Cmos;
pub use emccd::Emccd;

use crate::{
    config::SimulationConfig,
    sampling::RvSampler,
    scene::{self, Canvas},
};

/// Sensor model turning expected photoelectrons into a binned frame
pub trait Detector {
    /// Applies the sensor noise stack to the canvas and bins it down to
    /// `(resolution_y / binning) x (resolution_x / binning)` samples
    fn read_out(
        &self,
        canvas: &mut Canvas,
        cfg: &SimulationConfig,
        rv: &mut RvSampler,
        approximation_steps: usize,
    ) -> Vec<f64>;
}

/// Synthesizes one frame: occupancy, optics and sensor read-out
///
/// `candidates` are candidate trap sites, either in fractional
/// field-of-view coordinates (`camera_coords = true`) or in object-plane
/// units of the field of view. A ground-truth buffer, when given, must hold
/// one slot per candidate; it receives the per-candidate occupancy with
/// lost atoms marked by their fractional loss time. The frame comes back in
/// row-major order, integer-valued (readout samples are truncated toward
/// zero).
pub fn capture<D: Detector>(
    detector: &D,
    cfg: &SimulationConfig,
    rv: &mut RvSampler,
    candidates: &[(f64, f64)],
    camera_coords: bool,
    mut truth: Option<&mut [f64]>,
    approximation_steps: usize,
) -> Vec<f64> {
    cfg.validate();
    if let Some(truth) = truth.as_deref() {
        debug_assert_eq!(truth.len(), candidates.len());
    }
    let height = approximation_steps * cfg.resolution_y;
    let width = approximation_steps * cfg.resolution_x;

    let mut atoms =
        scene::fill_atom_locations(rv, candidates, cfg.filling_ratio, truth.as_deref_mut());
    scene::normalize_camera_coords(cfg, &mut atoms, camera_coords);

    let mut canvas = Canvas::new(height, width);
    scene::init_image_and_simulate_optical_effects(
        &mut canvas,
        &atoms,
        truth.as_deref_mut(),
        approximation_steps,
        cfg,
        rv,
    );
    detector.read_out(&mut canvas, cfg, rv, approximation_steps)
}
