// AudioFrame - one tick's worth of audio
//
// A frame pairs the time-domain samples with the analyser byte spectrum of
// the same moment. Frames are produced once per detection tick and consumed
// immediately.

use super::features::{peak_amplitude, FftProcessor};

/// Fixed-size snapshot of live audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Time-ordered samples on the [-1, 1] amplitude scale
    pub time_domain: Vec<f32>,
    /// Analyser magnitudes, 0-255, covering 0..nyquist
    pub frequency_data: Vec<u8>,
    /// Capture sample rate in Hz
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(time_domain: Vec<f32>, frequency_data: Vec<u8>, sample_rate: u32) -> Self {
        Self {
            time_domain,
            frequency_data,
            sample_rate,
        }
    }

    /// Build a frame from PCM samples, synthesizing the byte spectrum
    pub fn from_samples(time_domain: Vec<f32>, sample_rate: u32, fft: &FftProcessor) -> Self {
        let frequency_data = fft.compute_byte_spectrum(&time_domain);
        Self::new(time_domain, frequency_data, sample_rate)
    }

    /// Largest absolute time-domain sample
    pub fn peak_amplitude(&self) -> f32 {
        peak_amplitude(&self.time_domain)
    }

    /// Byte bins scaled to [0, 1]
    pub fn normalized_spectrum(&self) -> Vec<f32> {
        self.frequency_data
            .iter()
            .map(|&b| b as f32 / 255.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_spectrum() {
        let frame = AudioFrame::new(vec![0.0], vec![0, 255, 51], 16000);
        assert_eq!(frame.normalized_spectrum(), vec![0.0, 1.0, 0.2]);
    }

    #[test]
    fn test_from_samples_bin_count() {
        let fft = FftProcessor::new(1024);
        let frame = AudioFrame::from_samples(vec![0.25; 4096], 44100, &fft);
        assert_eq!(frame.frequency_data.len(), 512);
        assert_eq!(frame.time_domain.len(), 4096);
        assert_eq!(frame.peak_amplitude(), 0.25);
    }
}
