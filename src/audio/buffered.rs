// BufferedAudioSource - rolling sample window fed by the caller
//
// Holds the most recent `window_len` samples. Reads return a fixed-size
// window, zero-padded at the front until enough audio has arrived.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::AudioSource;
use crate::analysis::{AudioFrame, FftProcessor};
use crate::config::AudioConfig;

pub struct BufferedAudioSource {
    sample_rate: u32,
    window_len: usize,
    samples: Mutex<VecDeque<f32>>,
    fft: FftProcessor,
}

impl BufferedAudioSource {
    /// Create a source whose window covers `config.window_seconds`
    pub fn new(sample_rate: u32, config: &AudioConfig) -> Self {
        let window_len = (config.window_seconds.max(0.0) * sample_rate as f32).round() as usize;
        Self::with_window(sample_rate, window_len, config.fft_size)
    }

    /// # Arguments
    /// * `sample_rate` - Rate of the samples that will be pushed
    /// * `window_len` - Samples per time-domain window (at least 1)
    /// * `fft_size` - FFT size for the synthesized spectrum
    pub fn with_window(sample_rate: u32, window_len: usize, fft_size: usize) -> Self {
        let window_len = window_len.max(1);
        Self {
            sample_rate,
            window_len,
            samples: Mutex::new(VecDeque::with_capacity(window_len)),
            fft: FftProcessor::new(fft_size),
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Append samples, discarding the oldest beyond the window
    pub fn push(&self, samples: &[f32]) {
        let mut window = self.lock_samples();
        let skip = samples.len().saturating_sub(self.window_len);
        window.extend(&samples[skip..]);
        let excess = window.len().saturating_sub(self.window_len);
        window.drain(..excess);
    }

    pub fn clear(&self) {
        self.lock_samples().clear();
    }

    /// Sample data has no invariants a panicking writer could break
    fn lock_samples(&self) -> MutexGuard<'_, VecDeque<f32>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioSource for BufferedAudioSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn time_domain(&self) -> Vec<f32> {
        let window = self.lock_samples();
        let pad = self.window_len - window.len();
        let mut out = Vec::with_capacity(self.window_len);
        out.resize(pad, 0.0);
        out.extend(window.iter().copied());
        out
    }

    fn frequency_data(&self) -> Vec<u8> {
        self.fft.compute_byte_spectrum(&self.time_domain())
    }

    fn snapshot(&self) -> AudioFrame {
        AudioFrame::from_samples(self.time_domain(), self.sample_rate, &self.fft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_front_padded() {
        let source = BufferedAudioSource::with_window(16000, 4, 256);
        source.push(&[0.5, 0.25]);
        assert_eq!(source.time_domain(), vec![0.0, 0.0, 0.5, 0.25]);
    }

    #[test]
    fn test_window_keeps_most_recent_samples() {
        let source = BufferedAudioSource::with_window(16000, 3, 256);
        source.push(&[0.1, 0.2]);
        source.push(&[0.3, 0.4]);
        assert_eq!(source.time_domain(), vec![0.2, 0.3, 0.4]);

        source.push(&[1.0, 0.9, 0.8, 0.7, 0.6]);
        assert_eq!(source.time_domain(), vec![0.8, 0.7, 0.6]);
    }

    #[test]
    fn test_window_length_from_config() {
        let config = AudioConfig {
            fft_size: 1024,
            window_seconds: 0.5,
        };
        let source = BufferedAudioSource::new(44100, &config);
        assert_eq!(source.window_len(), 22050);
        assert_eq!(source.frequency_data().len(), 512);
    }

    #[test]
    fn test_snapshot_matches_arrays() {
        let source = BufferedAudioSource::with_window(8000, 512, 256);
        source.push(&vec![0.3; 512]);

        let frame = source.snapshot();
        assert_eq!(frame.sample_rate, 8000);
        assert_eq!(frame.time_domain, source.time_domain());
        assert_eq!(frame.frequency_data, source.frequency_data());
    }

    #[test]
    fn test_clear() {
        let source = BufferedAudioSource::with_window(8000, 2, 64);
        source.push(&[0.9, 0.9]);
        source.clear();
        assert_eq!(source.time_domain(), vec![0.0, 0.0]);
    }
}
