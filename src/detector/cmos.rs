//! Scientific CMOS read-out

use super::Detector;
use crate::{config::SimulationConfig, sampling::RvSampler, scene::Canvas};

const EULER_MASCHERONI: f64 = 0.5772156649015328606065120900824024310422;

/// sCMOS sensor: per-pixel amplifiers with row, column and flicker
/// fixed-pattern noise; read-out happens before spatial binning
pub struct Cmos;

impl Detector for Cmos {
    fn read_out(
        &self,
        canvas: &mut Canvas,
        cfg: &SimulationConfig,
        rv: &mut RvSampler,
        approximation_steps: usize,
    ) -> Vec<f64> {
        let height = canvas.height;
        let width = canvas.width;
        let steps = approximation_steps;
        let steps_sq = (steps * steps) as f64;

        // light plus spurious charges; the dark current is resampled for
        // every cell
        for i in height / 2..height + height / 2 {
            for j in width / 2..width + width / 2 {
                let k = i * 2 * width + j;
                let dark = rv.sample_gamma(
                    cfg.dark_current_sampling_alpha,
                    cfg.dark_current_sampling_beta,
                );
                canvas.data[k] = rv.sample_poisson(
                    canvas.data[k] + (cfg.stray_light_rate + dark) * cfg.exposure_time / steps_sq,
                );
            }
        }

        // column fixed pattern, located so the Gumbel mean is zero
        let column_location = -cfg.column_noise_scale * EULER_MASCHERONI;
        let column_noises: Vec<f64> = (0..cfg.resolution_x)
            .map(|_| rv.sample_gumbel(column_location, cfg.column_noise_scale))
            .collect();
        let flicker_location = -cfg.flicker_noise_scale * EULER_MASCHERONI;

        // per-pixel read-out at the super-sample resolution; each sample
        // lands on the top-left cell of its block
        for i in 0..cfg.resolution_y {
            let row_noise = rv.sample_gaussian(0., cfg.row_noise_stdev);
            for j in 0..cfg.resolution_x {
                let mut electrons = 0f64;
                for y in 0..steps {
                    for x in 0..steps {
                        electrons += canvas.data
                            [(height / 2 + i * steps + y) * 2 * width + width / 2 + j * steps + x];
                    }
                }

                let bias = rv
                    .sample_gaussian(cfg.bias_clamp, cfg.bias_stdev)
                    .max(0.);
                electrons += rv.sample_gumbel(flicker_location, cfg.flicker_noise_scale);
                electrons += row_noise + column_noises[j];

                let sample =
                    rv.sample_gaussian(electrons / cfg.preampgain + bias, cfg.readout_stdev);
                canvas.data[(height / 2 + i * steps) * 2 * width + width / 2 + j * steps] =
                    sample.trunc();
            }
        }

        // binning sums one read-out sample per super-pixel block
        let out_rows = cfg.resolution_y / cfg.binning;
        let out_cols = cfg.resolution_x / cfg.binning;
        let block = cfg.binning * steps;
        let mut frame = vec![0f64; out_rows * out_cols];
        for i in 0..out_rows {
            for j in 0..out_cols {
                let mut electrons = 0f64;
                for y in 0..cfg.binning {
                    for x in 0..cfg.binning {
                        electrons += canvas.data[(height / 2 + i * block + y * steps) * 2 * width
                            + width / 2
                            + j * block
                            + x * steps];
                    }
                }
                frame[i * out_cols + j] = electrons;
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
        cfg.dark_current_sampling_alpha = 0.;
        cfg
    }

    #[test]
    fn empty_scene_reads_the_bias() {
        let cfg = quiet_config(64);
        let mut rv = RvSampler::seeded("cmos empty scene");
        let frame = capture(&Cmos, &cfg, &mut rv, &[], true, None, 1);
        assert_eq!(frame.len(), 64 * 64);
        let mean = frame.iter().sum::<f64>() / frame.len() as f64;
        assert!((mean - cfg.bias_clamp).abs() < 1.);
    }

    #[test]
    fn column_fixed_pattern_spread() {
        let mut cfg = quiet_config(64);
        cfg.row_noise_stdev = 0.;
        cfg.flicker_noise_scale = 0.;
        cfg.column_noise_scale = 2.;
        cfg.bias_stdev = 0.;
        cfg.preampgain = 1.;
        let mut rv = RvSampler::seeded("cmos column pattern");
        let frame = capture(&Cmos, &cfg, &mut rv, &[], true, None, 1);
        let n = 64;
        let column_means: Vec<f64> = (0..n)
            .map(|j| (0..n).map(|i| frame[i * n + j]).sum::<f64>() / n as f64)
            .collect();
        let mean = column_means.iter().sum::<f64>() / n as f64;
        let std = (column_means
            .iter()
            .map(|m| (m - mean) * (m - mean))
            .sum::<f64>()
            / n as f64)
            .sqrt();
        // Gumbel standard deviation pi b / sqrt(6)
        let expected = std::f64::consts::PI * cfg.column_noise_scale / 6f64.sqrt();
        assert!(
            (std - expected).abs() < 0.7,
            "column spread {std}, expected {expected}"
        );
    }

    #[test]
    fn binned_read_out_shape() {
        let mut cfg = quiet_config(32);
        cfg.binning = 2;
        let mut rv = RvSampler::seeded("cmos binning");
        let frame = capture(&Cmos, &cfg, &mut rv, &[(0.5, 0.5)], true, None, 2);
        assert_eq!(frame.len(), 16 * 16);
        // binning sums one read-out sample per pixel, so the background
        // sits near binning^2 times the bias
        let mean = frame.iter().sum::<f64>() / frame.len() as f64;
        assert!((mean - 4. * cfg.bias_clamp).abs() < 0.05 * 4. * cfg.bias_clamp);
    }
}
