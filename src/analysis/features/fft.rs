// FFT module - byte spectrum synthesis
//
// Audio sources that only have PCM samples (WAV files, live capture) still
// have to hand the classifiers an analyser-style frequency frame. This module
// windows the most recent samples, runs a forward FFT and maps magnitudes to
// the 0-255 decibel scale a browser analyser node produces.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Lower bound of the byte scale in dB
pub const MIN_DECIBELS: f32 = -100.0;
/// Upper bound of the byte scale in dB
pub const MAX_DECIBELS: f32 = -30.0;

/// FFT processor producing byte-scaled magnitude spectra
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Blackman window (pre-computed), as used by analyser nodes
    window: Vec<f32>,
}

impl FftProcessor {
    /// Create a new FFT processor
    ///
    /// # Arguments
    /// * `fft_size` - FFT window size; the spectrum has `fft_size / 2` bins
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let n = fft_size as f32;
        let window = (0..fft_size)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / n;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            window,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Compute the byte spectrum of the last `fft_size` samples
    ///
    /// Shorter inputs are zero-padded at the front so the newest sample is
    /// always at the end of the window.
    ///
    /// # Returns
    /// Byte spectrum (size = fft_size / 2)
    pub fn compute_byte_spectrum(&self, audio: &[f32]) -> Vec<u8> {
        let start = audio.len().saturating_sub(self.fft_size);
        let recent = &audio[start..];
        let pad = self.fft_size - recent.len();

        let mut buffer: Vec<Complex<f32>> = Vec::with_capacity(self.fft_size);
        buffer.extend((0..pad).map(|_| Complex::new(0.0, 0.0)));
        buffer.extend(
            recent
                .iter()
                .zip(&self.window[pad..])
                .map(|(&sample, &w)| Complex::new(sample * w, 0.0)),
        );

        self.fft.process(&mut buffer);

        let scale = 1.0 / self.fft_size as f32;
        buffer[..self.bin_count()]
            .iter()
            .map(|c| magnitude_to_byte(c.norm() * scale))
            .collect()
    }
}

/// Map a linear magnitude onto the analyser byte scale
fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}
