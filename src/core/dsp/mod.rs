//! Digital Signal Processing utilities

mod fft;
mod windows;

pub use fft::FftProcessor;
pub use windows::WindowFunction;
