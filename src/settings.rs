//! Process-wide settings facade
//!
//! The capture entry points in [`crate::detector`] take an explicit
//! configuration and sampler. Host programs and bindings layers that expect
//! the legacy flat API get it here: a process-wide configuration mutated by
//! free setter functions and a sampler seeded lazily on first use. Neither
//! must be touched while an image synthesis is running.

use std::path::Path;
use std::sync::Mutex;

use crate::{
    config::SimulationConfig,
    detector::{capture, Cmos, Emccd},
    sampling::RvSampler,
};

static SETTINGS: Mutex<SimulationConfig> = Mutex::new(SimulationConfig::DEFAULT);
static SAMPLER: Mutex<Option<RvSampler>> = Mutex::new(None);

fn with_sampler<T>(run: impl FnOnce(&SimulationConfig, &mut RvSampler) -> T) -> T {
    let cfg = SETTINGS.lock().unwrap().clone();
    let mut guard = SAMPLER.lock().unwrap();
    let rv = guard.get_or_insert_with(RvSampler::from_env);
    run(&cfg, rv)
}

/// Overlays a settings file onto the process-wide configuration
pub fn read_config<P: AsRef<Path>>(path: P) {
    SETTINGS.lock().unwrap().load(path);
}

/// Returns a copy of the process-wide configuration
pub fn configuration() -> SimulationConfig {
    SETTINGS.lock().unwrap().clone()
}

/// Synthesizes an EMCCD frame with the process-wide configuration
///
/// `image` must hold `(resolution_x / binning) * (resolution_y / binning)`
/// samples; `truth`, when given, one slot per candidate.
pub fn create_image_emccd(
    image: &mut [f64],
    candidates: &[(f64, f64)],
    camera_coords: bool,
    truth: Option<&mut [f64]>,
    approximation_steps: usize,
) {
    with_sampler(|cfg, rv| {
        let frame = capture(
            &Emccd,
            cfg,
            rv,
            candidates,
            camera_coords,
            truth,
            approximation_steps,
        );
        image.copy_from_slice(&frame);
    })
}

/// Synthesizes an sCMOS frame with the process-wide configuration
pub fn create_image_cmos(
    image: &mut [f64],
    candidates: &[(f64, f64)],
    camera_coords: bool,
    truth: Option<&mut [f64]>,
    approximation_steps: usize,
) {
    with_sampler(|cfg, rv| {
        let frame = capture(
            &Cmos,
            cfg,
            rv,
            candidates,
            camera_coords,
            truth,
            approximation_steps,
        );
        image.copy_from_slice(&frame);
    })
}

pub fn set_stray_light_rate(value: f64) {
    SETTINGS.lock().unwrap().stray_light_rate = value;
}

pub fn set_dark_current_rate(value: f64) {
    SETTINGS.lock().unwrap().dark_current_rate = value;
}

pub fn set_dark_current_sampling_alpha(value: f64) {
    SETTINGS.lock().unwrap().dark_current_sampling_alpha = value;
}

pub fn set_dark_current_sampling_beta(value: f64) {
    SETTINGS.lock().unwrap().dark_current_sampling_beta = value;
}

pub fn set_cic_chance(value: f64) {
    SETTINGS.lock().unwrap().cic_chance = value;
}

pub fn set_quantum_efficiency(value: f64) {
    SETTINGS.lock().unwrap().quantum_efficiency = value;
}

pub fn set_wavelength(value: f64) {
    SETTINGS.lock().unwrap().wavelength = value;
}

pub fn set_numerical_aperture(value: f64) {
    SETTINGS.lock().unwrap().numerical_aperture = value;
}

/// Also refreshes the derived object-plane pixel size
pub fn set_physical_pixel_size(value: f64) {
    SETTINGS.lock().unwrap().set_physical_pixel_size(value);
}

/// Also refreshes the derived object-plane pixel size
pub fn set_magnification(value: f64) {
    SETTINGS.lock().unwrap().set_magnification(value);
}

pub fn set_bias_clamp(value: f64) {
    SETTINGS.lock().unwrap().bias_clamp = value;
}

pub fn set_bias_stdev(value: f64) {
    SETTINGS.lock().unwrap().bias_stdev = value;
}

pub fn set_row_noise_stdev(value: f64) {
    SETTINGS.lock().unwrap().row_noise_stdev = value;
}

pub fn set_column_noise_scale(value: f64) {
    SETTINGS.lock().unwrap().column_noise_scale = value;
}

pub fn set_flicker_noise_scale(value: f64) {
    SETTINGS.lock().unwrap().flicker_noise_scale = value;
}

pub fn set_preampgain(value: f64) {
    SETTINGS.lock().unwrap().preampgain = value;
}

pub fn set_scic_chance(value: f64) {
    SETTINGS.lock().unwrap().scic_chance = value;
}

pub fn set_readout_stdev(value: f64) {
    SETTINGS.lock().unwrap().readout_stdev = value;
}

pub fn set_number_gain_registers(value: f64) {
    SETTINGS.lock().unwrap().number_gain_registers = value;
}

pub fn set_p0(value: f64) {
    SETTINGS.lock().unwrap().p0 = value;
}

pub fn set_scattering_rate(value: f64) {
    SETTINGS.lock().unwrap().scattering_rate = value;
}

pub fn set_exposure_time(value: f64) {
    SETTINGS.lock().unwrap().exposure_time = value;
}

pub fn set_survival_probability(value: f64) {
    SETTINGS.lock().unwrap().survival_probability = value;
}

pub fn set_filling_ratio(value: f64) {
    SETTINGS.lock().unwrap().filling_ratio = value;
}

pub fn set_light_source_stdev(value: f64) {
    SETTINGS.lock().unwrap().light_source_stdev = value;
}

pub fn set_binning(value: usize) {
    SETTINGS.lock().unwrap().binning = value;
}

pub fn set_resolution(x: usize, y: usize) {
    SETTINGS.lock().unwrap().set_resolution(x, y);
}

pub fn set_zernike_coefficients(coefficients: &[f64; 15]) {
    SETTINGS
        .lock()
        .unwrap()
        .set_zernike_coefficients(coefficients);
}
