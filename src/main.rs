use atomcam::{
    capture, save_frame, Candidates, Cmos, Emccd, RvSampler, SimulationConfig, SiteDistribution,
};
use indicatif::{ProgressBar, ProgressStyle};

fn main() -> anyhow::Result<()> {
    let mut cfg = SimulationConfig::default();
    cfg.load("simulationSettings.cfg");
    cfg.set_resolution(128, 96);
    cfg.scattering_rate = 29000.;
    cfg.filling_ratio = 0.6;
    cfg.survival_probability = 0.98;
    // mild defocus and spherical aberration
    let mut aberrations = [0f64; 15];
    aberrations[3] = 0.05;
    aberrations[10] = 0.02;
    cfg.set_zernike_coefficients(&aberrations);

    let sites: Candidates = SiteDistribution::Grid {
        nx: 5,
        ny: 4,
        margin: 0.15,
        jitter: 0.002,
    }
    .into();
    let mut rv = RvSampler::from_env();

    let n_frame = 8;
    let cols = cfg.resolution_x / cfg.binning;
    let bar = ProgressBar::new(2 * n_frame);
    bar.set_style(ProgressStyle::with_template(
        "[{eta:>4}] {bar:40.cyan/blue} {pos:>5}/{len:5}",
    )?);
    for index in 0..n_frame {
        let mut truth = vec![0f64; sites.len()];
        let frame = capture(&Emccd, &cfg, &mut rv, &sites, true, Some(&mut truth), 2);
        save_frame(format!("emccd_{index:02}.png"), &frame, cols)?;
        bar.inc(1);

        let frame = capture(&Cmos, &cfg, &mut rv, &sites, true, None, 2);
        save_frame(format!("cmos_{index:02}.png"), &frame, cols)?;
        bar.inc(1);
    }
    bar.finish();

    Ok(())
}
