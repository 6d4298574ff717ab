//! Real-input FFT magnitude spectrum

use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Planned forward FFT for a fixed size. Cloning shares the plan.
#[derive(Clone)]
pub struct FftProcessor {
    fft: Arc<dyn RealToComplex<f64>>,
    fft_size: usize,
}

impl FftProcessor {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        Self {
            fft: planner.plan_fft_forward(fft_size),
            fft_size,
        }
    }

    /// Number of bins produced per frame (`fft_size / 2 + 1`).
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Magnitude spectrum of an already-windowed frame.
    ///
    /// Input shorter than the FFT size is zero-padded; extra input is ignored.
    pub fn magnitude_spectrum(&self, frame: &[f64]) -> Vec<f64> {
        let mut input = self.fft.make_input_vec();
        for (dst, &src) in input.iter_mut().zip(frame) {
            *dst = src;
        }

        let mut output = self.fft.make_output_vec();
        if let Err(e) = self.fft.process(&mut input, &mut output) {
            log::warn!("FFT of size {} failed: {}", self.fft_size, e);
            return vec![0.0; self.num_bins()];
        }

        output.iter().map(|c| c.norm()).collect()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}
