//! # atomcam
//!
//! Synthetic camera images of trapped neutral-atom arrays under
//! near-resonant illumination, as recorded by an EMCCD or an sCMOS sensor.
//!
//! A frame is built in three stages: candidate trap sites are filled into
//! an emitter scene, the scene is imaged through a Fourier-optics model of
//! the collection objective (complex pupil with Zernike aberrations, MTF
//! multiplication in the frequency plane), and a sensor back end applies
//! its noise stack (shot noise, dark current, clock-induced charge,
//! electron multiplication or per-pixel fixed-pattern noise) before
//! binning down to the output resolution.
//!
//! ## Example
//! Two atoms imaged onto a 64x64 EMCCD frame:
//! ```
//! use atomcam::{capture, Emccd, RvSampler, SimulationConfig};
//!
//! let mut cfg = SimulationConfig::default();
//! cfg.set_resolution(64, 64);
//! let mut rv = RvSampler::seeded("first light");
//! let sites = [(0.4, 0.5), (0.6, 0.5)];
//! let frame = capture(&Emccd, &cfg, &mut rv, &sites, true, None, 2);
//! assert_eq!(frame.len(), 64 * 64);
//! ```
//!
//! Hosts that expect the flat legacy API (process-wide settings, free
//! setters, `create_image_*`) find it in [`mod@settings`].

mod config;
pub use config::SimulationConfig;
mod sampling;
pub use sampling::RvSampler;
mod zernike;
pub use zernike::zernike_phase;
mod dft;
pub use dft::Dft2;
mod optics;
pub use optics::simulate_optics;
mod scene;
pub use scene::{
    fill_atom_locations, init_image_and_simulate_optical_effects, normalize_camera_coords, Atom,
    Canvas,
};
mod sites;
pub use sites::{Candidates, SiteDistribution};
mod detector;
pub use detector::{capture, Cmos, Detector, Emccd};
mod render;
pub use render::save_frame;
pub mod settings;
