//! Simulation parameters
//!
//! A [`SimulationConfig`] gathers the optical, illumination and sensor
//! parameters of one camera model. It is plain data: build one, adjust the
//! fields or load a settings file over the defaults, then hand it to the
//! capture entry points. Nothing mutates it during an image synthesis.

use std::{fs, path::Path};

/// Camera and illumination parameters
///
/// # Example
/// ```
/// use atomcam::SimulationConfig;
/// let mut cfg = SimulationConfig::default();
/// cfg.set_resolution(64, 64);
/// cfg.exposure_time = 0.05;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Stray photon rate per pixel (photons/s)
    pub stray_light_rate: f64,
    /// EMCCD dark current (electrons/pixel/s)
    pub dark_current_rate: f64,
    /// sCMOS per-pixel dark current Gamma shape
    pub dark_current_sampling_alpha: f64,
    /// sCMOS per-pixel dark current Gamma rate
    pub dark_current_sampling_beta: f64,
    /// Parallel-clock induced charge (photon equivalents/pixel/exposure)
    pub cic_chance: f64,
    pub quantum_efficiency: f64,
    /// Imaging wavelength (microns)
    pub wavelength: f64,
    pub numerical_aperture: f64,
    /// Sensor pixel pitch (microns)
    pub physical_pixel_size: f64,
    pub magnification: f64,
    /// Object-plane pixel size (microns), kept in sync with
    /// `physical_pixel_size / magnification`
    pub pixel_size: f64,
    /// Readout offset (ADU)
    pub bias_clamp: f64,
    /// sCMOS per-pixel bias spread
    pub bias_stdev: f64,
    /// sCMOS row-noise Gaussian width
    pub row_noise_stdev: f64,
    /// sCMOS column fixed-pattern Gumbel scale
    pub column_noise_scale: f64,
    /// sCMOS flicker Gumbel scale
    pub flicker_noise_scale: f64,
    pub preampgain: f64,
    /// Per-register serial clock-induced charge probability
    pub scic_chance: f64,
    /// Readout Gaussian width (electrons)
    pub readout_stdev: f64,
    /// EM register stage count
    pub number_gain_registers: f64,
    /// Single-stage multiplication probability; total gain `(1+p0)^r`
    pub p0: f64,
    /// Photons scattered per atom per second
    pub scattering_rate: f64,
    /// Exposure (seconds)
    pub exposure_time: f64,
    /// Probability that an atom survives the full exposure
    pub survival_probability: f64,
    /// Probability that a candidate site holds an atom
    pub filling_ratio: f64,
    /// Pre-convolution emitter broadening (pixels)
    pub light_source_stdev: f64,
    /// On-sensor binning factor, divides both resolutions
    pub binning: usize,
    pub resolution_x: usize,
    pub resolution_y: usize,
    /// Wavefront aberrations, Noll indices 1..15, in wavelength units
    pub zernike_coefficients: [f64; 15],
}

impl SimulationConfig {
    pub const DEFAULT: Self = Self {
        stray_light_rate: 0.4,
        dark_current_rate: 2.9e-4,
        dark_current_sampling_alpha: 0.006,
        dark_current_sampling_beta: 1.,
        cic_chance: 3.7e-4,
        quantum_efficiency: 0.86,
        wavelength: 0.4619,
        numerical_aperture: 0.65,
        physical_pixel_size: 16.,
        magnification: 156.25,
        pixel_size: 0.1024,
        bias_clamp: 500.,
        bias_stdev: 1.,
        row_noise_stdev: 0.5,
        column_noise_scale: 0.5,
        flicker_noise_scale: 0.2,
        preampgain: 4.11,
        scic_chance: 2e-5,
        readout_stdev: 4.,
        number_gain_registers: 536.,
        p0: 0.01069820610,
        scattering_rate: 30000.,
        exposure_time: 0.1,
        survival_probability: 1.,
        filling_ratio: 1.,
        light_source_stdev: 0.,
        binning: 1,
        resolution_x: 512,
        resolution_y: 512,
        zernike_coefficients: [0.; 15],
    };

    /// Sets the sensor pixel pitch and refreshes the derived object-plane
    /// pixel size
    pub fn set_physical_pixel_size(&mut self, value: f64) {
        self.physical_pixel_size = value;
        self.pixel_size = value / self.magnification;
    }
    /// Sets the magnification and refreshes the derived object-plane pixel
    /// size
    pub fn set_magnification(&mut self, value: f64) {
        self.magnification = value;
        self.pixel_size = self.physical_pixel_size / value;
    }
    pub fn set_resolution(&mut self, x: usize, y: usize) {
        self.resolution_x = x;
        self.resolution_y = y;
    }
    pub fn set_zernike_coefficients(&mut self, coefficients: &[f64; 15]) {
        self.zernike_coefficients = *coefficients;
    }
    /// Total gain of the multiplication register, `(1+p0)^r`
    pub fn em_gain(&self) -> f64 {
        (1. + self.p0).powf(self.number_gain_registers)
    }
    /// Object-plane field of view `(width, height)` in microns
    pub fn field_of_view(&self) -> (f64, f64) {
        (
            self.resolution_x as f64 * self.physical_pixel_size / self.magnification,
            self.resolution_y as f64 * self.physical_pixel_size / self.magnification,
        )
    }

    /// Overlays a `name = value` settings file onto the current values
    ///
    /// Lines without `=`, unknown names and unparsable values are skipped;
    /// a missing file keeps every current value. `resolution` takes two
    /// integers and `zernikeCoefficients` up to 15 doubles, comma or space
    /// separated.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) {
        let Ok(contents) = fs::read_to_string(path.as_ref()) else {
            log::debug!("no settings file at {:?}", path.as_ref());
            return;
        };
        self.overlay(&contents);
    }

    pub(crate) fn overlay(&mut self, contents: &str) {
        for line in contents.lines() {
            let Some((name, values)) = line.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let mut values = values
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|token| !token.is_empty());
            let Some(first) = values.next() else {
                continue;
            };
            let scalar = first.parse::<f64>();
            match name {
                "strayLightRate" => self.stray_light_rate = scalar.unwrap_or(self.stray_light_rate),
                "darkCurrentRate" => {
                    self.dark_current_rate = scalar.unwrap_or(self.dark_current_rate)
                }
                "darkCurrentSamplingAlpha" => {
                    self.dark_current_sampling_alpha =
                        scalar.unwrap_or(self.dark_current_sampling_alpha)
                }
                "darkCurrentSamplingBeta" => {
                    self.dark_current_sampling_beta =
                        scalar.unwrap_or(self.dark_current_sampling_beta)
                }
                "cicChance" => self.cic_chance = scalar.unwrap_or(self.cic_chance),
                "quantumEfficiency" => {
                    self.quantum_efficiency = scalar.unwrap_or(self.quantum_efficiency)
                }
                "wavelength" => self.wavelength = scalar.unwrap_or(self.wavelength),
                "numericalAperture" => {
                    self.numerical_aperture = scalar.unwrap_or(self.numerical_aperture)
                }
                "physicalPixelSize" => {
                    if let Ok(value) = scalar {
                        self.set_physical_pixel_size(value);
                    }
                }
                "magnification" => {
                    if let Ok(value) = scalar {
                        self.set_magnification(value);
                    }
                }
                "biasClamp" => self.bias_clamp = scalar.unwrap_or(self.bias_clamp),
                "biasStdev" => self.bias_stdev = scalar.unwrap_or(self.bias_stdev),
                "rowNoiseStdev" => self.row_noise_stdev = scalar.unwrap_or(self.row_noise_stdev),
                "columnNoiseScale" => {
                    self.column_noise_scale = scalar.unwrap_or(self.column_noise_scale)
                }
                "flickerNoiseScale" => {
                    self.flicker_noise_scale = scalar.unwrap_or(self.flicker_noise_scale)
                }
                "preampgain" => self.preampgain = scalar.unwrap_or(self.preampgain),
                "sCICChance" => self.scic_chance = scalar.unwrap_or(self.scic_chance),
                "readoutStdev" => self.readout_stdev = scalar.unwrap_or(self.readout_stdev),
                "numberGainRegisters" => {
                    self.number_gain_registers = scalar.unwrap_or(self.number_gain_registers)
                }
                "p0" => self.p0 = scalar.unwrap_or(self.p0),
                "scatteringRate" => self.scattering_rate = scalar.unwrap_or(self.scattering_rate),
                "exposureTime" => self.exposure_time = scalar.unwrap_or(self.exposure_time),
                "survivalProbability" => {
                    self.survival_probability = scalar.unwrap_or(self.survival_probability)
                }
                "fillingRatio" => self.filling_ratio = scalar.unwrap_or(self.filling_ratio),
                "lightSourceStdev" => {
                    self.light_source_stdev = scalar.unwrap_or(self.light_source_stdev)
                }
                "binning" => self.binning = first.parse().unwrap_or(self.binning),
                "resolution" => {
                    if let (Ok(x), Some(Ok(y))) =
                        (first.parse(), values.next().map(str::parse::<usize>))
                    {
                        self.resolution_x = x;
                        self.resolution_y = y;
                    }
                }
                "zernikeCoefficients" => {
                    for (slot, token) in self
                        .zernike_coefficients
                        .iter_mut()
                        .zip(std::iter::once(first).chain(values))
                    {
                        if let Ok(value) = token.parse() {
                            *slot = value;
                        }
                    }
                }
                _ => log::debug!("unrecognized setting {name}"),
            }
        }
    }

    /// Debug-build sanity checks on the caller contract
    pub fn validate(&self) {
        debug_assert!(self.wavelength > 0.);
        debug_assert!(self.numerical_aperture > 0. && self.numerical_aperture < 1.);
        debug_assert!(self.binning >= 1);
        debug_assert!(self.resolution_x % self.binning == 0);
        debug_assert!(self.resolution_y % self.binning == 0);
        debug_assert!(self.survival_probability > 0. && self.survival_probability <= 1.);
        debug_assert!(self.p0 > 0. && self.p0 < 1.);
        debug_assert!(
            self.stray_light_rate >= 0.
                && self.dark_current_rate >= 0.
                && self.cic_chance >= 0.
                && self.scic_chance >= 0.
        );
        debug_assert!(
            self.readout_stdev >= 0.
                && self.bias_stdev >= 0.
                && self.row_noise_stdev >= 0.
                && self.column_noise_scale >= 0.
                && self.flicker_noise_scale >= 0.
                && self.light_source_stdev >= 0.
        );
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_defaults() {
        let cfg = SimulationConfig::default();
        assert!((cfg.pixel_size - cfg.physical_pixel_size / cfg.magnification).abs() < 1e-12);
        // p0 is calibrated for a gain of 300
        assert!((cfg.em_gain() - 300.).abs() < 0.5);
    }

    #[test]
    fn overlay_scalars_and_lists() {
        let mut cfg = SimulationConfig::default();
        cfg.overlay(
            "# camera\n\
             strayLightRate = 0.05\n\
             this line is ignored\n\
             notASetting = 12\n\
             binning = 2\n\
             resolution = 256, 128\n\
             zernikeCoefficients = 0.1 -0.2, 0.3\n\
             exposureTime =\n",
        );
        assert!((cfg.stray_light_rate - 0.05).abs() < 1e-12);
        assert_eq!(cfg.binning, 2);
        assert_eq!((cfg.resolution_x, cfg.resolution_y), (256, 128));
        assert!((cfg.zernike_coefficients[0] - 0.1).abs() < 1e-12);
        assert!((cfg.zernike_coefficients[1] + 0.2).abs() < 1e-12);
        assert!((cfg.zernike_coefficients[2] - 0.3).abs() < 1e-12);
        assert_eq!(cfg.zernike_coefficients[3..], [0.; 12]);
        // empty value keeps the default
        assert!((cfg.exposure_time - 0.1).abs() < 1e-12);
    }

    #[test]
    fn derived_pixel_size_follows_both_setters() {
        let mut cfg = SimulationConfig::default();
        cfg.set_physical_pixel_size(13.);
        assert!((cfg.pixel_size - 13. / 156.25).abs() < 1e-12);
        cfg.set_magnification(100.);
        assert!((cfg.pixel_size - 0.13).abs() < 1e-12);
        cfg.overlay("magnification = 130");
        assert!((cfg.pixel_size - 0.1).abs() < 1e-12);
    }

    #[test]
    fn missing_file_keeps_values() {
        let mut cfg = SimulationConfig::default();
        cfg.load("/no/such/settings.cfg");
        assert_eq!(cfg, SimulationConfig::DEFAULT);
    }
}
