// src/core/decoder.rs
//
// Seekable audio sources. WAV files are streamed straight from disk through
// hound; every other container is demuxed and decoded on demand by Symphonia.

use hound::{SampleFormat, WavReader};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Failures raised by an [`AudioSource`].
///
/// `Open` aborts a run. `Read` and `Seek` are local to a single request and
/// the analyzer masks them with silence.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("failed to open audio source {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    #[error("decode fault reading {frames} frames at frame {position}: {reason}")]
    Read {
        position: u64,
        frames: usize,
        reason: String,
    },

    #[error("failed to seek to frame {frame}: {reason}")]
    Seek { frame: u64, reason: String },
}

impl AudioError {
    fn open(path: &Path, reason: impl ToString) -> Self {
        AudioError::Open {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error should abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AudioError::Open { .. })
    }
}

/// Random-access reader over decodable audio.
///
/// Only the first channel is ever returned: multi-channel material is reduced
/// by channel selection, not by averaging.
pub trait AudioSource: Send + Sync {
    /// Total number of frames (samples per channel).
    fn frames(&self) -> u64;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> usize;

    /// Move the read cursor to `frame`. Positions past the end clamp to the end.
    fn seek(&mut self, frame: u64) -> Result<(), AudioError>;

    /// Read up to `count` frames from the cursor, returning first-channel
    /// samples in `[-1.0, 1.0]`. Fewer samples come back at end of stream.
    fn read(&mut self, count: usize) -> Result<Vec<f32>, AudioError>;

    /// Independent reader over the same audio, positioned at frame 0.
    fn try_clone(&self) -> Result<Box<dyn AudioSource>, AudioError>;
}

/// Open `path` with the most suitable backend.
///
/// `.wav` files are tried with the streaming reader first and fall back to
/// Symphonia when hound rejects them.
pub fn open_source(path: &Path) -> Result<Box<dyn AudioSource>, AudioError> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "wav" | "wave"))
        .unwrap_or(false);

    if is_wav {
        match WavSource::open(path) {
            Ok(source) => return Ok(Box::new(source)),
            Err(e) => log::debug!("hound rejected {}, falling back to symphonia: {}", path.display(), e),
        }
    }

    Ok(Box::new(DecodedSource::open(path)?))
}

/// Streaming WAV reader. Memory use is bounded by the read size.
pub struct WavSource {
    path: PathBuf,
    reader: WavReader<BufReader<File>>,
    format: SampleFormat,
    bits_per_sample: u16,
    channels: usize,
    sample_rate: u32,
    frames: u64,
    position: u64,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let reader = WavReader::open(path).map_err(|e| AudioError::open(path, e))?;
        let spec = reader.spec();

        if spec.channels == 0 {
            return Err(AudioError::open(path, "file reports 0 audio channels"));
        }
        if spec.sample_format == SampleFormat::Int && !(1..=32).contains(&spec.bits_per_sample) {
            return Err(AudioError::open(
                path,
                format!("unsupported bit depth {}", spec.bits_per_sample),
            ));
        }

        let frames = reader.duration() as u64;
        log::debug!(
            "Opened WAV {}: {} frames, {} Hz, {} channel(s), {}-bit {:?}",
            path.display(),
            frames,
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            format: spec.sample_format,
            bits_per_sample: spec.bits_per_sample,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
            frames,
            position: 0,
        })
    }
}

impl AudioSource for WavSource {
    fn frames(&self) -> u64 {
        self.frames
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn seek(&mut self, frame: u64) -> Result<(), AudioError> {
        let frame = frame.min(self.frames);
        self.reader
            .seek(frame as u32)
            .map_err(|e| AudioError::Seek {
                frame,
                reason: e.to_string(),
            })?;
        self.position = frame;
        Ok(())
    }

    fn read(&mut self, count: usize) -> Result<Vec<f32>, AudioError> {
        let position = self.position;
        let channels = self.channels;

        let samples = match self.format {
            SampleFormat::Float => {
                first_channel(self.reader.samples::<f32>(), channels, count, position, |s| s)
            }
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (self.bits_per_sample - 1)) as f32;
                first_channel(self.reader.samples::<i32>(), channels, count, position, |s| {
                    s as f32 * scale
                })
            }
        };

        match samples {
            Ok(samples) => {
                self.position += samples.len() as u64;
                Ok(samples)
            }
            Err(e) => {
                // the reader stopped mid-frame; resync so the next request starts clean
                if let Err(resync) = self.seek(position) {
                    log::warn!(
                        "Could not resync {} to frame {}: {}",
                        self.path.display(),
                        position,
                        resync
                    );
                }
                Err(e)
            }
        }
    }

    fn try_clone(&self) -> Result<Box<dyn AudioSource>, AudioError> {
        Ok(Box::new(WavSource::open(&self.path)?))
    }
}

fn first_channel<S, I, F>(
    samples: I,
    channels: usize,
    count: usize,
    position: u64,
    convert: F,
) -> Result<Vec<f32>, AudioError>
where
    I: Iterator<Item = hound::Result<S>>,
    F: Fn(S) -> f32,
{
    let mut out = Vec::with_capacity(count);
    for (i, sample) in samples.take(count * channels).enumerate() {
        let sample = sample.map_err(|e| AudioError::Read {
            position,
            frames: count,
            reason: e.to_string(),
        })?;
        if i % channels == 0 {
            out.push(convert(sample));
        }
    }
    Ok(out)
}

/// Streaming reader for any Symphonia-supported container.
///
/// Holds the demuxer and decoder open and decodes packets on demand, so memory
/// use is bounded by the largest read plus one packet. Seeks are accurate:
/// samples before the requested frame are decoded and dropped.
pub struct DecodedSource {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    frames: u64,
    position: u64,
    /// Decoded first-channel samples starting at `position`
    pending: VecDeque<f32>,
    /// Timestamp reached by the last seek; earlier samples are discarded
    seek_target: Option<u64>,
    end_of_stream: bool,
    sample_buf: Option<SampleBuffer<f32>>,
    sample_buf_frames: u64,
    skipped_packets: usize,
}

/// Demuxer and decoder for the first audio track of a file
struct OpenedTrack {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    n_frames: Option<u64>,
}

fn open_track(path: &Path) -> Result<OpenedTrack, AudioError> {
    let file = File::open(path).map_err(|e| AudioError::open(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::open(path, format!("unrecognised format: {}", e)))?;

    let format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::open(path, "no supported audio track found"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::open(path, "file does not specify sample rate"))?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    if channels == 0 {
        return Err(AudioError::open(path, "file reports 0 audio channels"));
    }
    let n_frames = track.codec_params.n_frames;

    let decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::open(path, format!("no decoder for codec: {}", e)))?;

    Ok(OpenedTrack {
        format,
        decoder,
        track_id,
        sample_rate,
        channels,
        n_frames,
    })
}

/// Sum packet durations when the container does not declare a length.
/// Only the demuxer runs; nothing is decoded.
fn count_frames(path: &Path) -> Result<u64, AudioError> {
    let mut track = open_track(path)?;
    let mut frames = 0u64;

    loop {
        match track.format.next_packet() {
            Ok(packet) if packet.track_id() == track.track_id => frames += packet.dur(),
            Ok(_) => {}
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => continue,
            Err(e) => {
                log::warn!("Length scan of {} stopped early: {}", path.display(), e);
                break;
            }
        }
    }

    log::debug!("Counted {} frames in {}", frames, path.display());
    Ok(frames)
}

impl DecodedSource {
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let track = open_track(path)?;
        let frames = match track.n_frames {
            Some(frames) => frames,
            None => count_frames(path)?,
        };

        log::debug!(
            "Opened {} via symphonia: {} frames, {} Hz, {} channel(s)",
            path.display(),
            frames,
            track.sample_rate,
            track.channels
        );

        Ok(Self::with_track(path, track, frames))
    }

    fn with_track(path: &Path, track: OpenedTrack, frames: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            format: track.format,
            decoder: track.decoder,
            track_id: track.track_id,
            sample_rate: track.sample_rate,
            channels: track.channels,
            frames,
            position: 0,
            pending: VecDeque::new(),
            seek_target: None,
            end_of_stream: false,
            sample_buf: None,
            sample_buf_frames: 0,
            skipped_packets: 0,
        }
    }

    /// Decode the next packet of our track into `pending`
    fn decode_packet(&mut self) -> Result<(), SymphoniaError> {
        let packet = match self.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.end_of_stream = true;
                return Ok(());
            }
            Err(SymphoniaError::ResetRequired) => {
                self.decoder.reset();
                return Ok(());
            }
            Err(e) => {
                self.end_of_stream = true;
                return Err(e);
            }
        };

        if packet.track_id() != self.track_id {
            return Ok(());
        }

        let decoded = match self.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                self.skipped_packets += 1;
                log::debug!("Skipping undecodable packet at ts {}: {}", packet.ts(), e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let spec = *decoded.spec();
        let capacity = decoded.capacity() as u64;
        let packet_frames = decoded.frames();

        if self.sample_buf.is_none() || capacity > self.sample_buf_frames {
            self.sample_buf = Some(SampleBuffer::new(capacity, spec));
            self.sample_buf_frames = capacity;
        }

        let skip = match self.seek_target {
            Some(target) if target > packet.ts() => (target - packet.ts()) as usize,
            _ => 0,
        };
        if skip < packet_frames {
            self.seek_target = None;
        }

        if let Some(ref mut buf) = self.sample_buf {
            buf.copy_interleaved_ref(decoded);
            let stride = spec.channels.count().max(1);
            self.pending.extend(buf.samples().iter().step_by(stride).skip(skip));
        }

        Ok(())
    }
}

impl AudioSource for DecodedSource {
    fn frames(&self) -> u64 {
        self.frames
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn seek(&mut self, frame: u64) -> Result<(), AudioError> {
        let frame = frame.min(self.frames);
        let ahead = frame.saturating_sub(self.position);

        // forward within what is already decoded
        if frame >= self.position && ahead <= self.pending.len() as u64 && !self.end_of_stream {
            self.pending.drain(..ahead as usize);
            self.position = frame;
            return Ok(());
        }

        self.pending.clear();
        self.position = frame;
        self.seek_target = None;

        if frame >= self.frames {
            self.end_of_stream = true;
            return Ok(());
        }

        let seek_to = SeekTo::TimeStamp {
            ts: frame,
            track_id: self.track_id,
        };
        match self.format.seek(SeekMode::Accurate, seek_to) {
            Ok(seeked) => {
                self.decoder.reset();
                self.seek_target = Some(seeked.required_ts);
                self.end_of_stream = false;
                Ok(())
            }
            Err(e) => {
                self.end_of_stream = true;
                Err(AudioError::Seek {
                    frame,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn read(&mut self, count: usize) -> Result<Vec<f32>, AudioError> {
        let position = self.position;
        let remaining = self.frames.saturating_sub(position) as usize;
        let count = count.min(remaining);

        while self.pending.len() < count && !self.end_of_stream {
            self.decode_packet().map_err(|e| AudioError::Read {
                position,
                frames: count,
                reason: e.to_string(),
            })?;
        }

        if self.skipped_packets > 0 {
            log::warn!(
                "Skipped {} undecodable packet(s) in {}",
                self.skipped_packets,
                self.path.display()
            );
            self.skipped_packets = 0;
        }

        let n = count.min(self.pending.len());
        self.position += n as u64;
        Ok(self.pending.drain(..n).collect())
    }

    fn try_clone(&self) -> Result<Box<dyn AudioSource>, AudioError> {
        let track = open_track(&self.path)?;
        Ok(Box::new(Self::with_track(&self.path, track, self.frames)))
    }
}

/// First-channel samples already in memory. Clones share the buffer.
#[derive(Debug, Clone)]
pub struct MemorySource {
    samples: Arc<[f32]>,
    sample_rate: u32,
    position: u64,
}

impl MemorySource {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            position: 0,
        }
    }
}

impl AudioSource for MemorySource {
    fn frames(&self) -> u64 {
        self.samples.len() as u64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        1
    }

    fn seek(&mut self, frame: u64) -> Result<(), AudioError> {
        self.position = frame.min(self.frames());
        Ok(())
    }

    fn read(&mut self, count: usize) -> Result<Vec<f32>, AudioError> {
        let start = self.position as usize;
        let end = (start + count).min(self.samples.len());
        self.position = end as u64;
        Ok(self.samples[start..end].to_vec())
    }

    fn try_clone(&self) -> Result<Box<dyn AudioSource>, AudioError> {
        let mut clone = self.clone();
        clone.position = 0;
        Ok(Box::new(clone))
    }
}
