// src/core/pipeline.rs
//
// Drives one analysis pass over the audio and feeds both renderers column by
// column, left to right.

use anyhow::{bail, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::analyzer::{AnalysisConfig, AudioAnalyzer, PeakPair, SpectralColumn};
use super::decoder::{open_source, AudioError};
use super::dsp::WindowFunction;
use super::visualization::{SpectrogramRenderer, WaveformRenderer};
use crate::config::{ColorScheme, ColorSchemeSource};

/// Image and analysis settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub width: u32,
    pub height: u32,
    pub fft_size: usize,
    pub window: WindowFunction,
    pub db_range: f64,
    /// JPEG quality for the spectrogram (1-100)
    pub jpeg_quality: u8,
    /// Analyze columns on the rayon pool before drawing them in order
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 171,
            fft_size: 2048,
            window: WindowFunction::Hann,
            db_range: 110.0,
            jpeg_quality: 80,
            parallel: false,
        }
    }
}

impl PipelineConfig {
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            fft_size: self.fft_size,
            window: self.window,
            db_range: self.db_range,
            ..AnalysisConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("Image size must be non-zero, got {}x{}", self.width, self.height);
        }
        if self.fft_size < 2 {
            bail!("FFT size must be at least 2, got {}", self.fft_size);
        }
        if !(self.db_range > 0.0) {
            bail!("dB range must be positive, got {}", self.db_range);
        }
        Ok(())
    }
}

/// Both finished images, before encoding
#[derive(Debug, Clone)]
pub struct RenderedImages {
    /// RGBA for transparent schemes, RGB otherwise
    pub waveform: DynamicImage,
    pub spectrogram: RgbImage,
}

impl RenderedImages {
    /// Write the waveform losslessly (format from the extension, normally
    /// PNG) and the spectrogram as JPEG at `jpeg_quality`
    pub fn save(&self, waveform_path: &Path, spectrogram_path: &Path, jpeg_quality: u8) -> Result<()> {
        self.waveform
            .save(waveform_path)
            .with_context(|| format!("Failed to write waveform image: {}", waveform_path.display()))?;
        log::debug!("Waveform saved to {}", waveform_path.display());

        let file = File::create(spectrogram_path).with_context(|| {
            format!("Failed to create spectrogram image: {}", spectrogram_path.display())
        })?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), jpeg_quality.clamp(1, 100));
        self.spectrogram.write_with_encoder(encoder).with_context(|| {
            format!("Failed to encode spectrogram image: {}", spectrogram_path.display())
        })?;
        log::debug!("Spectrogram saved to {}", spectrogram_path.display());

        Ok(())
    }
}

/// Per-column analysis result handed to the renderers
#[derive(Debug, Clone)]
struct ColumnAnalysis {
    spectral: SpectralColumn,
    peaks: PeakPair,
}

fn analyze_column(analyzer: &mut AudioAnalyzer, x: u32, samples_per_pixel: f64) -> ColumnAnalysis {
    let seek_point = (x as f64 * samples_per_pixel) as u64;
    let next_seek_point = ((x + 1) as f64 * samples_per_pixel) as u64;

    ColumnAnalysis {
        spectral: analyzer.spectral_column(seek_point),
        peaks: analyzer.peak_range(seek_point as i64, next_seek_point as i64),
    }
}

/// Analyze every column on the rayon pool, one forked analyzer per worker.
/// Results come back in column order.
fn analyze_parallel(
    analyzer: &AudioAnalyzer,
    width: u32,
    samples_per_pixel: f64,
) -> Result<Vec<ColumnAnalysis>, AudioError> {
    (0..width)
        .into_par_iter()
        .map_init(
            || analyzer.fork(),
            |worker, x| match worker {
                Ok(worker) => Ok(analyze_column(worker, x, samples_per_pixel)),
                Err(e) => Err(e.clone()),
            },
        )
        .collect()
}

/// Invokes the caller's progress sink at roughly 1% of the width
struct ProgressReporter<'a> {
    sink: Option<&'a mut dyn FnMut(u32, u32)>,
    step: u32,
    total: u32,
}

impl<'a> ProgressReporter<'a> {
    fn new(sink: Option<&'a mut dyn FnMut(u32, u32)>, total: u32) -> Self {
        Self {
            sink,
            step: (total / 100).max(1),
            total,
        }
    }

    fn column(&mut self, x: u32) {
        if x % self.step == 0 {
            if let Some(sink) = self.sink.as_deref_mut() {
                sink(x, self.total);
            }
        }
    }

    fn finish(&mut self) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink(self.total, self.total);
        }
    }
}

/// Render both images from `analyzer` without touching the filesystem
pub fn render_images(
    analyzer: &mut AudioAnalyzer,
    config: &PipelineConfig,
    scheme: &ColorScheme,
    progress: Option<&mut dyn FnMut(u32, u32)>,
) -> Result<RenderedImages> {
    config.validate()?;

    let width = config.width;
    let samples_per_pixel = analyzer.frames() as f64 / width as f64;

    let mut waveform = WaveformRenderer::new(width, config.height, scheme)
        .context("Failed to set up waveform renderer")?;
    let mut spectrogram =
        SpectrogramRenderer::new(width, config.height, analyzer.config().fft_size, scheme)
            .context("Failed to set up spectrogram renderer")?;

    log::debug!(
        "Rendering {}x{} from {} frames ({:.2} samples/pixel{})",
        width,
        config.height,
        analyzer.frames(),
        samples_per_pixel,
        if config.parallel { ", parallel" } else { "" }
    );

    let mut progress = ProgressReporter::new(progress, width);

    if config.parallel {
        let columns = analyze_parallel(analyzer, width, samples_per_pixel)
            .context("Failed to start analysis workers")?;
        for (x, column) in (0..width).zip(columns) {
            progress.column(x);
            waveform.draw_column(x, column.peaks, column.spectral.centroid);
            spectrogram.draw_column(x, &column.spectral.db_spectrum);
        }
    } else {
        for x in 0..width {
            progress.column(x);
            let column = analyze_column(analyzer, x, samples_per_pixel);
            waveform.draw_column(x, column.peaks, column.spectral.centroid);
            spectrogram.draw_column(x, &column.spectral.db_spectrum);
        }
    }

    progress.finish();

    Ok(RenderedImages {
        waveform: waveform.finalize(),
        spectrogram: spectrogram.finalize(),
    })
}

/// Render `input` and write the waveform PNG and spectrogram JPEG
pub fn create_wave_images(
    input: &Path,
    waveform_output: &Path,
    spectrogram_output: &Path,
    config: &PipelineConfig,
    scheme: &ColorSchemeSource,
    progress: Option<&mut dyn FnMut(u32, u32)>,
) -> Result<()> {
    config.validate()?;
    let scheme = scheme.resolve();

    let source = open_source(input).with_context(|| format!("Failed to analyze {}", input.display()))?;
    let mut analyzer = AudioAnalyzer::new(source, config.analysis_config());

    log::debug!(
        "Processing {} ({} frames, {} Hz, {} channel(s))",
        input.display(),
        analyzer.frames(),
        analyzer.sample_rate(),
        analyzer.channels()
    );

    let images = render_images(&mut analyzer, config, &scheme, progress)?;
    images.save(waveform_output, spectrogram_output, config.jpeg_quality)
}
