//! Electron-multiplying CCD read-out

use super::Detector;
use crate::{config::SimulationConfig, sampling::RvSampler, scene::Canvas};

/// EMCCD sensor: binned charge packets pass through a serial
/// multiplication register before a single read-out amplifier
pub struct Emccd;

impl Detector for Emccd {
    fn read_out(
        &self,
        canvas: &mut Canvas,
        cfg: &SimulationConfig,
        rv: &mut RvSampler,
        approximation_steps: usize,
    ) -> Vec<f64> {
        let height = canvas.height;
        let width = canvas.width;
        let steps_sq = (approximation_steps * approximation_steps) as f64;

        // light plus spurious charges in a single draw per cell, by
        // Poisson reproductivity
        let spurious = ((cfg.stray_light_rate + cfg.dark_current_rate) * cfg.exposure_time
            + cfg.cic_chance)
            / steps_sq;
        for i in height / 2..height + height / 2 {
            for j in width / 2..width + width / 2 {
                let k = i * 2 * width + j;
                canvas.data[k] = rv.sample_poisson(canvas.data[k] + spurious);
            }
        }

        let gain = cfg.em_gain();
        let registers = cfg.number_gain_registers;
        let out_rows = cfg.resolution_y / cfg.binning;
        let out_cols = cfg.resolution_x / cfg.binning;
        let block = cfg.binning * approximation_steps;
        let mut frame = vec![0f64; out_rows * out_cols];
        for i in 0..out_rows {
            for j in 0..out_cols {
                // binning
                let mut electrons = 0f64;
                for y in 0..block {
                    for x in 0..block {
                        electrons += canvas.data
                            [(height / 2 + i * block + y) * 2 * width + width / 2 + j * block + x];
                    }
                }

                // multiplication register
                let mut electrons = rv.sample_em_gain(electrons as u64, gain);

                // serial clock-induced charge; the threshold follows the
                // successive binomial-trials ratio after each firing
                let mut threshold =
                    registers * cfg.scic_chance * cfg.scic_chance.powf(registers - 1.);
                let mut charges = 0u32;
                while rv.uniform() < threshold {
                    let remaining = (rv.uniform() * registers).trunc();
                    electrons += rv.sample_em_gain(1, (1. + cfg.p0).powf(remaining));
                    charges += 1;
                    threshold = (registers - charges as f64) / (charges as f64 + 1.)
                        * cfg.scic_chance
                        / (1. - cfg.scic_chance);
                }

                // read-out
                let sample = rv.sample_gaussian(
                    electrons / cfg.preampgain + cfg.bias_clamp,
                    cfg.readout_stdev,
                );
                frame[i * out_cols + j] = sample.trunc();
            }
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::capture;

    fn quiet_config(resolution: usize) -> SimulationConfig {
        let mut cfg = SimulationConfig::default();
        cfg.set_resolution(resolution, resolution);
        cfg.stray_light_rate = 0.;
        cfg.dark_current_rate = 0.;
        cfg.cic_chance = 0.;
        cfg
    }

    #[test]
    fn empty_scene_reads_the_bias() {
        let cfg = quiet_config(64);
        let mut rv = RvSampler::seeded("emccd empty scene");
        let frame = capture(&Emccd, &cfg, &mut rv, &[], true, None, 1);
        assert_eq!(frame.len(), 64 * 64);
        let n = frame.len() as f64;
        let mean = frame.iter().sum::<f64>() / n;
        let std =
            (frame.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt();
        // truncation pulls the mean half an ADU below the clamp
        assert!((mean - cfg.bias_clamp).abs() < 1.);
        assert!((std - cfg.readout_stdev).abs() < 0.5);
    }

    #[test]
    fn centered_emitter_lands_on_the_central_pixel() {
        let cfg = quiet_config(64);
        let mut rv = RvSampler::seeded("emccd centroid");
        let frame = capture(&Emccd, &cfg, &mut rv, &[(0.5, 0.5)], true, None, 1);
        // centroid of the thresholded signal
        let cutoff = cfg.bias_clamp + 3. * cfg.readout_stdev;
        let (mut weight, mut cx, mut cy) = (0f64, 0f64, 0f64);
        for (k, &value) in frame.iter().enumerate() {
            let signal = (value - cutoff).max(0.);
            weight += signal;
            cx += signal * (k % 64) as f64;
            cy += signal * (k / 64) as f64;
        }
        assert!(weight > 0.);
        assert!((cx / weight - 32.).abs() < 1.);
        assert!((cy / weight - 32.).abs() < 1.);
    }

    #[test]
    fn signal_scales_linearly_with_exposure() {
        let mut rv = RvSampler::seeded("emccd linearity");
        let baseline = |cfg: &SimulationConfig, rv: &mut RvSampler| -> f64 {
            let trials = 20;
            let mut total = 0f64;
            for _ in 0..trials {
                let frame = capture(&Emccd, cfg, rv, &[(0.5, 0.5)], true, None, 1);
                // truncation sits the empty-pixel mean half an ADU under
                // the clamp
                total += frame
                    .iter()
                    .map(|v| v - (cfg.bias_clamp - 0.5))
                    .sum::<f64>();
            }
            total / trials as f64
        };
        let mut cfg = quiet_config(64);
        cfg.exposure_time = 0.1;
        let short = baseline(&cfg, &mut rv);
        cfg.exposure_time = 0.2;
        let long = baseline(&cfg, &mut rv);
        let ratio = long / short;
        assert!(
            (1.8..=2.2).contains(&ratio),
            "doubling the exposure scaled the signal by {ratio}"
        );
    }
}
