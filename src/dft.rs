//! Two-dimensional complex discrete Fourier transform

use num_complex::Complex;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

type Cpx = Complex<f64>;

/// Rectangular 2-D DFT
///
/// Row-major `rows x cols` grids, transformed row pass then column pass.
/// Both directions are unnormalized, so a forward-inverse round trip scales
/// the data by `rows * cols`; callers divide where the algorithm requires
/// it.
pub struct Dft2 {
    buffer: Vec<Cpx>,
    flipped: Vec<Cpx>,
    row_scratch: Vec<Cpx>,
    col_scratch: Vec<Cpx>,
    rows: usize,
    cols: usize,
    row_fft: Arc<dyn Fft<f64>>,
    col_fft: Arc<dyn Fft<f64>>,
}

impl Dft2 {
    fn plan(rows: usize, cols: usize, inverse: bool) -> Self {
        let mut planner = FftPlanner::new();
        let (row_fft, col_fft) = if inverse {
            (planner.plan_fft_inverse(cols), planner.plan_fft_inverse(rows))
        } else {
            (planner.plan_fft_forward(cols), planner.plan_fft_forward(rows))
        };
        Self {
            buffer: vec![Complex::zero(); rows * cols],
            flipped: vec![Complex::zero(); rows * cols],
            row_scratch: vec![Complex::zero(); row_fft.get_inplace_scratch_len()],
            col_scratch: vec![Complex::zero(); col_fft.get_inplace_scratch_len()],
            rows,
            cols,
            row_fft,
            col_fft,
        }
    }
    /// Forward transform plan
    pub fn forward(rows: usize, cols: usize) -> Self {
        Self::plan(rows, cols, false)
    }
    /// Inverse transform plan
    pub fn inverse(rows: usize, cols: usize) -> Self {
        Self::plan(rows, cols, true)
    }
    /// Loads a complex buffer
    pub fn load(&mut self, buffer: Vec<Cpx>) -> &mut Self {
        assert_eq!(
            buffer.len(),
            self.rows * self.cols,
            "DFT input does not match the planned grid"
        );
        self.buffer = buffer;
        self
    }
    /// Loads a real buffer into the complex plane
    pub fn load_real(&mut self, data: &[f64]) -> &mut Self {
        assert_eq!(
            data.len(),
            self.rows * self.cols,
            "DFT input does not match the planned grid"
        );
        self.buffer = data.iter().map(|&v| Complex::new(v, 0.)).collect();
        self
    }
    /// Computes the 2-D transform of the loaded buffer
    pub fn process(&mut self) -> &mut Self {
        for row in self.buffer.chunks_exact_mut(self.cols) {
            self.row_fft.process_with_scratch(row, &mut self.row_scratch);
        }
        transpose::transpose(&self.buffer, &mut self.flipped, self.cols, self.rows);
        for column in self.flipped.chunks_exact_mut(self.rows) {
            self.col_fft.process_with_scratch(column, &mut self.col_scratch);
        }
        transpose::transpose(&self.flipped, &mut self.buffer, self.rows, self.cols);
        self
    }
    /// Multiplies the buffer element-wise with a real kernel
    pub fn filter_real(&mut self, kernel: &[f64]) -> &mut Self {
        self.buffer
            .iter_mut()
            .zip(kernel)
            .for_each(|(b, k)| *b *= k);
        self
    }
    /// Transform buffer
    pub fn buffer(&self) -> &[Cpx] {
        &self.buffer
    }
    /// Transform buffer norm
    pub fn norm(&self) -> Vec<f64> {
        self.buffer.iter().map(|b| b.norm()).collect()
    }
    /// Transform buffer norm squared
    pub fn norm_sqr(&self) -> Vec<f64> {
        self.buffer.iter().map(|b| b.norm_sqr()).collect()
    }
}
