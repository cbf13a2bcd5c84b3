// WavAudioSource - plays a WAV file forward one tick hop per pull
//
// Offline stand-in for live capture: each snapshot returns the window that
// starts at the current position, then advances by the hop. Windows that
// run past the end of the file are zero-padded.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::AudioSource;
use crate::analysis::{AudioFrame, FftProcessor};
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Read a WAV file as f32 samples on the [-1, 1] scale
///
/// Multi-channel files keep the first channel, as live capture does.
///
/// # Returns
/// (samples, sample_rate)
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let load_failed = |reason: String| AudioError::FileLoadFailed {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = hound::WavReader::open(path).map_err(|err| load_failed(err.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|err| load_failed(err.to_string()))?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) - 1).max(1) as f32;
            match spec.bits_per_sample {
                8 | 16 | 24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(|err| load_failed(err.to_string()))?,
                other => {
                    return Err(load_failed(format!("unsupported bits per sample {}", other)))
                }
            }
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.first().copied().unwrap_or(0.0))
            .collect()
    };

    Ok((samples, spec.sample_rate))
}

pub struct WavAudioSource {
    samples: Vec<f32>,
    sample_rate: u32,
    window_len: usize,
    hop: usize,
    position: AtomicUsize,
    fft: FftProcessor,
}

impl WavAudioSource {
    /// Open a WAV file
    ///
    /// # Arguments
    /// * `path` - WAV file
    /// * `config` - Window length and FFT size
    /// * `hop_ms` - How far each pull advances (normally the tick interval)
    pub fn open(path: &Path, config: &AudioConfig, hop_ms: u64) -> Result<Self, AudioError> {
        let (samples, sample_rate) = read_wav(path)?;
        tracing::info!(
            "[WavAudioSource] Loaded {} samples at {} Hz from {}",
            samples.len(),
            sample_rate,
            path.display()
        );
        Ok(Self::from_samples(samples, sample_rate, config, hop_ms))
    }

    pub fn from_samples(
        samples: Vec<f32>,
        sample_rate: u32,
        config: &AudioConfig,
        hop_ms: u64,
    ) -> Self {
        let window_len =
            ((config.window_seconds.max(0.0) * sample_rate as f32).round() as usize).max(1);
        let hop = ((hop_ms as u128 * sample_rate as u128) / 1000).max(1) as usize;
        Self {
            samples,
            sample_rate,
            window_len,
            hop,
            position: AtomicUsize::new(0),
            fft: FftProcessor::new(config.fft_size),
        }
    }

    /// Position of the next window, in samples
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    /// True once every window has been pulled
    pub fn is_exhausted(&self) -> bool {
        self.position() >= self.samples.len()
    }

    /// Seconds from the start of the file to the next window
    pub fn position_seconds(&self) -> f32 {
        self.position() as f32 / self.sample_rate.max(1) as f32
    }

    fn window_at(&self, start: usize) -> Vec<f32> {
        let start = start.min(self.samples.len());
        let end = (start + self.window_len).min(self.samples.len());
        let mut window = self.samples[start..end].to_vec();
        window.resize(self.window_len, 0.0);
        window
    }
}

impl AudioSource for WavAudioSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn time_domain(&self) -> Vec<f32> {
        self.window_at(self.position())
    }

    fn frequency_data(&self) -> Vec<u8> {
        self.fft.compute_byte_spectrum(&self.time_domain())
    }

    fn snapshot(&self) -> AudioFrame {
        let start = self.position.fetch_add(self.hop, Ordering::AcqRel);
        AudioFrame::from_samples(self.window_at(start), self.sample_rate, &self.fft)
    }
}
