// src/core/analyzer.rs
//
// Per-column audio analysis: loudness normalization, peak pairs, dB spectra
// and spectral centroids.

use std::path::Path;

use super::decoder::{open_source, AudioError, AudioSource};
use super::dsp::{FftProcessor, WindowFunction};

/// Added to magnitudes before taking the log so silence maps to the floor
const DB_EPSILON: f64 = 1e-60;

/// Column energy at or below this yields a zero centroid
const ENERGY_EPSILON: f64 = 1e-60;

/// Immutable per-run analysis parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// FFT window size; powers of two are fastest
    pub fft_size: usize,
    pub window: WindowFunction,
    /// Dynamic range kept in the dB spectrum
    pub db_range: f64,
    /// Lower bound of the centroid axis in Hz
    pub freq_min: f64,
    /// Upper bound of the centroid axis in Hz
    pub freq_max: f64,
    /// Frames per read during the level prescan and peak scans
    pub block_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            window: WindowFunction::Hann,
            db_range: 110.0,
            freq_min: 100.0,
            freq_max: 22050.0,
            block_size: 4096,
        }
    }
}

/// Analysis of one FFT window
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralColumn {
    /// Log-frequency position of the energy centroid in `[0, 1]`
    pub centroid: f64,
    /// Magnitudes compressed to `[0, 1]` over the configured dB range
    pub db_spectrum: Vec<f64>,
}

/// Sample extrema of a pixel's range, in the order they occur
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPair {
    pub first: f32,
    pub second: f32,
}

impl PeakPair {
    pub fn new(first: f32, second: f32) -> Self {
        Self { first, second }
    }
}

/// Builder for AudioAnalyzer configuration
pub struct AnalyzerBuilder {
    config: AnalysisConfig,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }

    pub fn fft_size(mut self, size: usize) -> Self {
        self.config.fft_size = size;
        self
    }

    pub fn window(mut self, window: WindowFunction) -> Self {
        self.config.window = window;
        self
    }

    pub fn db_range(mut self, range: f64) -> Self {
        self.config.db_range = range;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Open `path` and prepare an analyzer for it
    pub fn build_from_path<P: AsRef<Path>>(self, path: P) -> Result<AudioAnalyzer, AudioError> {
        let source = open_source(path.as_ref())?;
        Ok(AudioAnalyzer::new(source, self.config))
    }

    /// Wrap an already-open source
    pub fn build(self, source: Box<dyn AudioSource>) -> AudioAnalyzer {
        AudioAnalyzer::new(source, self.config)
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns an audio source and answers per-column analysis requests
pub struct AudioAnalyzer {
    source: Box<dyn AudioSource>,
    config: AnalysisConfig,
    window: Vec<f64>,
    fft: FftProcessor,
    scale: f64,
    frames: u64,
    sample_rate: u32,
}

impl AudioAnalyzer {
    /// Create an analyzer with the default configuration
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        AnalyzerBuilder::new().build_from_path(path)
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Prescan `source` for its peak level and derive the normalization scale.
    ///
    /// A zero FFT size or block size is bumped to 2 and 1 respectively, and a
    /// non-positive dB range falls back to the default.
    pub fn new(mut source: Box<dyn AudioSource>, mut config: AnalysisConfig) -> Self {
        config.fft_size = config.fft_size.max(2);
        config.block_size = config.block_size.max(1);
        if !(config.db_range > 0.0) {
            config.db_range = AnalysisConfig::default().db_range;
        }

        let window = config.window.generate(config.fft_size);
        let fft = FftProcessor::new(config.fft_size);

        let peak = max_level(source.as_mut(), config.block_size);

        // magnitude of a windowed DC signal is the loudest any bin can get
        let reference = fft
            .magnitude_spectrum(&window)
            .into_iter()
            .fold(0.0f64, f64::max);
        let scale = if peak > 0.0 && reference > 0.0 {
            1.0 / (peak as f64 * reference)
        } else {
            1.0
        };

        let frames = source.frames();
        let sample_rate = source.sample_rate();

        log::debug!(
            "Analyzer ready: {} frames @ {} Hz, peak {:.4}, scale {:.6e}",
            frames,
            sample_rate,
            peak,
            scale
        );

        Self {
            source,
            config,
            window,
            fft,
            scale,
            frames,
            sample_rate,
        }
    }

    /// Independent analyzer over the same audio that reuses this one's
    /// normalization scale instead of rescanning
    pub fn fork(&self) -> Result<Self, AudioError> {
        Ok(Self {
            source: self.source.try_clone()?,
            config: self.config.clone(),
            window: self.window.clone(),
            fft: self.fft.clone(),
            scale: self.scale,
            frames: self.frames,
            sample_rate: self.sample_rate,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.source.channels()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Read `size` samples starting at `start`, which may be negative or run
    /// past the end of the stream.
    ///
    /// With `pad` the result is always `size` long, zero-filled wherever the
    /// window falls outside the audio. Without it only in-bounds samples come
    /// back. Decode faults are masked with zeros.
    pub fn read_samples(&mut self, start: i64, size: usize, pad: bool) -> Vec<f32> {
        let frames = self.frames as i64;
        let size_i = size as i64;

        let (seek_to, add_to_start, to_read) = if start < 0 {
            if size_i + start <= 0 {
                return if pad { vec![0.0; size] } else { Vec::new() };
            }
            (0, (-start) as usize, (size_i + start).min(frames).max(0))
        } else {
            (start, 0, size_i.min(frames - start).max(0))
        };
        let to_read = to_read as usize;

        let read = self
            .source
            .seek(seek_to as u64)
            .and_then(|_| self.source.read(to_read));

        let samples = match read {
            Ok(samples) => samples,
            Err(e) => {
                log::warn!("Masking read fault with silence: {}", e);
                return vec![0.0; if pad { size } else { to_read }];
            }
        };

        if !pad {
            return samples;
        }

        let mut out = Vec::with_capacity(size);
        out.resize(add_to_start, 0.0);
        out.extend_from_slice(&samples);
        out.resize(size, 0.0);
        out
    }

    /// Spectrum and centroid of the FFT window centered on `seek_point`
    pub fn spectral_column(&mut self, seek_point: u64) -> SpectralColumn {
        let fft_size = self.config.fft_size;
        let start = seek_point as i64 - (fft_size / 2) as i64;
        let samples = self.read_samples(start, fft_size, true);

        let windowed: Vec<f64> = samples
            .iter()
            .zip(&self.window)
            .map(|(&s, &w)| s as f64 * w)
            .collect();

        let spectrum: Vec<f64> = self
            .fft
            .magnitude_spectrum(&windowed)
            .into_iter()
            .map(|m| m * self.scale)
            .collect();

        let range = self.config.db_range;
        let db_spectrum = spectrum
            .iter()
            .map(|&m| ((20.0 * (m + DB_EPSILON).log10()).clamp(-range, 0.0) + range) / range)
            .collect();

        let energy: f64 = spectrum.iter().sum();
        let centroid = if energy > ENERGY_EPSILON {
            let last_bin = (spectrum.len() - 1).max(1) as f64;
            let weighted: f64 = spectrum
                .iter()
                .enumerate()
                .map(|(bin, &m)| bin as f64 * m)
                .sum();
            let hz = weighted / (energy * last_bin) * self.sample_rate as f64 * 0.5;
            self.log_position(hz)
        } else {
            0.0
        };

        SpectralColumn {
            centroid,
            db_spectrum,
        }
    }

    /// Min and max sample in `[start, end)`, ordered by first occurrence
    pub fn peak_range(&mut self, start: i64, end: i64) -> PeakPair {
        let start = start.max(0);
        let end = end.min(self.frames as i64);

        if end <= start {
            let sample = self.read_samples(start, 1, false).first().copied().unwrap_or(0.0);
            return PeakPair::new(sample, sample);
        }

        let block_size = self.config.block_size as i64;

        let mut min_value = f32::INFINITY;
        let mut max_value = f32::NEG_INFINITY;
        let mut min_index = 0i64;
        let mut max_index = 0i64;

        let mut position = start;
        while position < end {
            let to_read = block_size.min(end - position) as usize;
            let samples = self.read_samples(position, to_read, true);

            for (offset, &sample) in samples.iter().enumerate() {
                let index = position + offset as i64;
                if sample > max_value {
                    max_value = sample;
                    max_index = index;
                }
                if sample < min_value {
                    min_value = sample;
                    min_index = index;
                }
            }
            position += to_read as i64;
        }

        if min_index < max_index {
            PeakPair::new(min_value, max_value)
        } else {
            PeakPair::new(max_value, min_value)
        }
    }

    /// Clip `hz` to the configured bounds and map it log-linearly to `[0, 1]`
    fn log_position(&self, hz: f64) -> f64 {
        let lower = self.config.freq_min.log10();
        let higher = self.config.freq_max.log10();
        let hz = hz.clamp(self.config.freq_min, self.config.freq_max);
        ((hz.log10() - lower) / (higher - lower)).clamp(0.0, 1.0)
    }
}

/// Largest absolute first-channel sample, streamed in `block_size` reads
pub fn max_level(source: &mut dyn AudioSource, block_size: usize) -> f32 {
    let block_size = block_size.max(1);
    let total = source.frames();
    let mut peak = 0.0f32;

    if let Err(e) = source.seek(0) {
        log::warn!("Level scan could not rewind source: {}", e);
        return peak;
    }

    let mut position = 0u64;
    while position < total {
        let to_read = block_size.min((total - position) as usize);
        match source.read(to_read) {
            Ok(samples) if samples.is_empty() => break,
            Ok(samples) => {
                peak = samples.iter().fold(peak, |acc, &s| acc.max(s.abs()));
            }
            Err(e) => {
                log::warn!("Level scan skipping unreadable block: {}", e);
                if source.seek(position + to_read as u64).is_err() {
                    break;
                }
            }
        }
        position += to_read as u64;
    }

    peak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decoder::MemorySource;
    use std::f32::consts::PI;

    fn analyzer_for(samples: Vec<f32>, fft_size: usize) -> AudioAnalyzer {
        AnalyzerBuilder::new()
            .fft_size(fft_size)
            .build(Box::new(MemorySource::new(samples, 44100)))
    }

    /// Source whose reads always fail, for the masking paths
    struct FaultySource;

    impl AudioSource for FaultySource {
        fn frames(&self) -> u64 {
            1000
        }
        fn sample_rate(&self) -> u32 {
            44100
        }
        fn channels(&self) -> usize {
            1
        }
        fn seek(&mut self, _frame: u64) -> Result<(), AudioError> {
            Ok(())
        }
        fn read(&mut self, count: usize) -> Result<Vec<f32>, AudioError> {
            Err(AudioError::Read {
                position: 0,
                frames: count,
                reason: "corrupt block".into(),
            })
        }
        fn try_clone(&self) -> Result<Box<dyn AudioSource>, AudioError> {
            Ok(Box::new(FaultySource))
        }
    }

    #[test]
    fn test_silent_input() {
        let mut analyzer = analyzer_for(vec![0.0; 8192], 512);
        assert_eq!(analyzer.scale(), 1.0);

        for seek in [0u64, 100, 4096, 8191, 9000] {
            let column = analyzer.spectral_column(seek);
            assert_eq!(column.centroid, 0.0);
            assert_eq!(column.db_spectrum.len(), 257);
            assert!(column.db_spectrum.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_scale_normalizes_peak() {
        let analyzer = analyzer_for(vec![0.0, 0.5, -0.25, 0.1], 4);
        // Hann(4) = [0, .75, .75, 0]; DC magnitude 1.5
        assert!((analyzer.scale() - 1.0 / (0.5 * 1.5)).abs() < 1e-9);
    }

    #[test]
    fn test_read_samples_pads_prefix() {
        let samples: Vec<f32> = (1..=100).map(|i| i as f32 / 100.0).collect();
        let mut analyzer = analyzer_for(samples, 64);

        let out = analyzer.read_samples(-32, 64, true);
        assert_eq!(out.len(), 64);
        assert!(out[..32].iter().all(|&s| s == 0.0));
        assert_eq!(out[32], 0.01);
        assert_eq!(out[63], 0.32);

        let unpadded = analyzer.read_samples(-32, 64, false);
        assert_eq!(unpadded.len(), 32);
        assert_eq!(unpadded[0], 0.01);
    }

    #[test]
    fn test_read_samples_pads_suffix() {
        let samples: Vec<f32> = (1..=100).map(|i| i as f32 / 100.0).collect();
        let mut analyzer = analyzer_for(samples, 64);

        let out = analyzer.read_samples(90, 16, true);
        assert_eq!(out.len(), 16);
        assert_eq!(out[9], 1.0);
        assert!(out[10..].iter().all(|&s| s == 0.0));

        assert_eq!(analyzer.read_samples(90, 16, false).len(), 10);
    }

    #[test]
    fn test_read_samples_entirely_before_start() {
        let mut analyzer = analyzer_for(vec![0.5; 10], 4);
        assert_eq!(analyzer.read_samples(-8, 8, true), vec![0.0; 8]);
        assert!(analyzer.read_samples(-8, 8, false).is_empty());
    }

    #[test]
    fn test_read_samples_window_larger_than_file() {
        let mut analyzer = analyzer_for(vec![0.5; 4], 4);
        let out = analyzer.read_samples(-2, 10, true);
        assert_eq!(out, vec![0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_peak_range_min_first() {
        // falls to -1 then climbs to 1
        let samples: Vec<f32> = (0..200)
            .map(|i| if i < 50 { -(i as f32) / 49.0 } else { -1.0 + 2.0 * (i - 50) as f32 / 149.0 })
            .collect();
        let mut analyzer = analyzer_for(samples, 64);
        let peaks = analyzer.peak_range(0, 200);
        assert_eq!(peaks, PeakPair::new(-1.0, 1.0));
    }

    #[test]
    fn test_peak_range_max_first() {
        let samples: Vec<f32> = (0..200).map(|i| 1.0 - 2.0 * i as f32 / 199.0).collect();
        let mut analyzer = analyzer_for(samples, 64);
        let peaks = analyzer.peak_range(0, 200);
        assert_eq!(peaks, PeakPair::new(1.0, -1.0));
    }

    #[test]
    fn test_peak_range_spans_blocks() {
        // the maximum sits in the first block, the minimum in the third
        let mut samples = vec![0.0f32; 300];
        samples[10] = 0.9;
        samples[250] = -0.7;
        let mut analyzer = AnalyzerBuilder::new()
            .fft_size(64)
            .block_size(100)
            .build(Box::new(MemorySource::new(samples, 44100)));

        assert_eq!(analyzer.peak_range(0, 300), PeakPair::new(0.9, -0.7));
        // a flat start counts as both extrema, so the later minimum comes second
        assert_eq!(analyzer.peak_range(200, 300), PeakPair::new(0.0, -0.7));
    }

    #[test]
    fn test_peak_range_degenerate() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        let mut analyzer = analyzer_for(samples, 4);

        assert_eq!(analyzer.peak_range(3, 3), PeakPair::new(0.3, 0.3));
        assert_eq!(analyzer.peak_range(5, 2), PeakPair::new(0.5, 0.5));
        // past the end there is nothing to read
        assert_eq!(analyzer.peak_range(20, 30), PeakPair::new(0.0, 0.0));
    }

    #[test]
    fn test_sine_centroid_position() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (2.0 * PI * 1000.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect();
        let mut analyzer = analyzer_for(samples, 2048);

        let column = analyzer.spectral_column(22050);
        let expected = (1000f64.log10() - 2.0) / (22050f64.log10() - 2.0);
        assert!((column.centroid - expected).abs() < 0.05, "centroid {}", column.centroid);
        assert!(column.db_spectrum.iter().all(|&v| (0.0..=1.0).contains(&v)));

        // the sine bin sits at the top of the normalized range
        let loudest = column.db_spectrum.iter().cloned().fold(0.0, f64::max);
        assert!(loudest > 0.9);
    }

    #[test]
    fn test_read_faults_are_masked() {
        let mut analyzer = AnalyzerBuilder::new().fft_size(64).build(Box::new(FaultySource));
        assert_eq!(analyzer.scale(), 1.0);

        assert_eq!(analyzer.read_samples(10, 32, true), vec![0.0; 32]);
        assert_eq!(analyzer.read_samples(10, 32, false), vec![0.0; 32]);

        let column = analyzer.spectral_column(500);
        assert_eq!(column.centroid, 0.0);
        assert_eq!(analyzer.peak_range(0, 100), PeakPair::new(0.0, 0.0));
    }

    #[test]
    fn test_fork_shares_scale() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin() * 0.3).collect();
        let mut analyzer = analyzer_for(samples, 256);
        let mut fork = analyzer.fork().unwrap();

        assert_eq!(fork.scale(), analyzer.scale());
        assert_eq!(fork.spectral_column(500), analyzer.spectral_column(500));
    }
}
