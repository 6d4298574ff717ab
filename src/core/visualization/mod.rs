//! Visualization tools for audio analysis
//!
//! Stateful per-column renderers for the waveform and spectrogram images.

mod spectrogram;
mod waveform;

pub use spectrogram::SpectrogramRenderer;
pub use waveform::{RenderCursor, WaveformRenderer};
