//! wav2png - Waveform and spectrogram thumbnails for audio files
//!
//! Renders two images from one pass over an audio file: a waveform PNG whose
//! stroke color follows the spectral centroid, and a log-frequency
//! spectrogram JPEG.
//!
//! ## Features
//!
//! - **Streaming WAV input**: uncompressed files are read block by block via `hound`
//! - **Other formats**: FLAC, MP3, OGG, AAC and friends decoded with `symphonia`
//! - **Color schemes**: ten named schemes plus inline schemes from JSON
//! - **Parallel analysis**: optional `rayon` column analysis, pixel-identical output
//! - **Fault tolerant**: read errors mid-file are logged and rendered as silence
//!
//! ## Module Structure
//!
//! - `core` - Audio sources, analysis, palettes and renderers
//! - `cli` - Command-line interface
//! - `config` - Color schemes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wav2png::core::{create_wave_images, PipelineConfig};
//! use wav2png::config::ColorSchemeSource;
//!
//! let config = PipelineConfig::default();
//! create_wave_images(
//!     Path::new("kick.wav"),
//!     Path::new("kick_w.png"),
//!     Path::new("kick_s.jpg"),
//!     &config,
//!     &ColorSchemeSource::Named("Freesound2".into()),
//!     None,
//! )?;
//! ```
//!
//! ## Image Layout
//!
//! | Image       | Axis X            | Axis Y                        | Color              |
//! |-------------|-------------------|-------------------------------|--------------------|
//! | Waveform    | time (one column) | amplitude, 2px margin         | spectral centroid  |
//! | Spectrogram | time (one column) | 100 Hz - 22050 Hz, log scale  | magnitude in dB    |

// Audio analysis and rendering
pub mod core;

// Command-line interface
pub mod cli;

// Color schemes
pub mod config;

// Re-export commonly used types at crate root for convenience
pub use config::{ColorScheme, ColorSchemeSource, DEFAULT_COLOR_SCHEME_KEY};
pub use core::{
    create_wave_images, render_images, AnalysisConfig, AudioAnalyzer, AudioError, AudioSource,
    PipelineConfig, RenderedImages, WindowFunction,
};
