//! Frame rendering

use std::path::Path;

use image::{ImageResult, Rgb, RgbImage};

/// Saves a row-major frame of `cols` columns as a CUBEHELIX-mapped PNG
///
/// The frame is normalized between its extrema before the color look-up.
pub fn save_frame<P: AsRef<Path>>(path: P, frame: &[f64], cols: usize) -> ImageResult<()> {
    let rows = frame.len() / cols;
    let min = frame.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = frame.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = (max - min).max(f64::MIN_POSITIVE);
    let lut = colorous::CUBEHELIX;
    let mut img = RgbImage::new(cols as u32, rows as u32);
    img.pixels_mut().zip(frame).for_each(|(px, &value)| {
        *px = Rgb(lut.eval_continuous((value - min) / range).into_array());
    });
    img.save(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_round_trip() {
        let frame: Vec<f64> = (0..64).map(|k| k as f64).collect();
        let path = std::env::temp_dir().join("atomcam_gradient.png");
        save_frame(&path, &frame, 8).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (8, 8));
        std::fs::remove_file(path).ok();
    }
}
