//! CLI argument parsing

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::{load_scheme_file, ColorSchemeSource, DEFAULT_COLOR_SCHEME_KEY};
use crate::core::{PipelineConfig, WindowFunction};

/// Parsed CLI arguments
#[derive(Parser, Debug)]
#[command(name = "wav2png")]
#[command(version, about = "Render waveform PNGs and spectrogram JPEGs from audio files")]
pub struct Args {
    /// Input files or directories
    #[arg(required_unless_present = "list_schemes")]
    pub files: Vec<PathBuf>,

    /// Image width in pixels
    #[arg(short, long, default_value_t = 500)]
    pub width: u32,

    /// Image height in pixels (odd heights center the zero line)
    #[arg(short = 'H', long, default_value_t = 171)]
    pub height: u32,

    /// FFT size for the spectral analysis
    #[arg(short, long = "fft", default_value_t = 2048)]
    pub fft_size: usize,

    /// Analysis window: rectangular, hann, hamming, blackman, blackman-harris
    #[arg(long, default_value = "hann", value_parser = parse_window)]
    pub window: WindowFunction,

    /// Named color scheme (see --list-schemes)
    #[arg(short, long, default_value = DEFAULT_COLOR_SCHEME_KEY)]
    pub color_scheme: String,

    /// JSON color scheme file, overrides --color-scheme
    #[arg(long, value_name = "JSON")]
    pub scheme_file: Option<PathBuf>,

    /// JPEG quality for the spectrogram
    #[arg(short, long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Analyze columns in parallel
    #[arg(long)]
    pub parallel: bool,

    /// List the named color schemes and exit
    #[arg(long)]
    pub list_schemes: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            width: self.width,
            height: self.height,
            fft_size: self.fft_size,
            window: self.window,
            jpeg_quality: self.quality,
            parallel: self.parallel,
            ..PipelineConfig::default()
        }
    }

    /// Inline scheme from `--scheme-file` if given, otherwise the named one
    pub fn scheme_source(&self) -> Result<ColorSchemeSource> {
        match &self.scheme_file {
            Some(path) => Ok(ColorSchemeSource::Inline(load_scheme_file(path)?)),
            None => Ok(ColorSchemeSource::Named(self.color_scheme.clone())),
        }
    }
}

fn parse_window(name: &str) -> Result<WindowFunction, String> {
    WindowFunction::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = WindowFunction::all().iter().map(|w| w.name()).collect();
        format!("unknown window '{}', expected one of: {}", name, known.join(", "))
    })
}
