//! Audio analysis, palettes and the two image renderers

pub mod analyzer;
pub mod decoder;
pub mod dsp;
pub mod palette;
pub mod pipeline;
pub mod visualization;

pub use analyzer::{AnalysisConfig, AnalyzerBuilder, AudioAnalyzer, PeakPair, SpectralColumn};
pub use decoder::{open_source, AudioError, AudioSource, DecodedSource, MemorySource, WavSource};
pub use dsp::{FftProcessor, WindowFunction};
pub use palette::{build_palette, Palette, PALETTE_SIZE};
pub use pipeline::{create_wave_images, render_images, PipelineConfig, RenderedImages};
pub use visualization::{RenderCursor, SpectrogramRenderer, WaveformRenderer};
