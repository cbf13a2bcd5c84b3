// FeatureExtractor - DSP feature extraction for instrument classification
//
// This module turns one AudioFrame into a FeatureSet for the heuristic
// classifier. Features come from both representations of the frame: the
// analyser byte spectrum and the raw time-domain samples.
//
// Module organization:
// - types: Data structures (Band, BandEnergies, FeatureSet)
// - fft: byte spectrum synthesis for PCM-only audio sources
// - spectral: Frequency-domain features (bands, centroid, flatness, harmonics)
// - temporal: Time-domain features (transient flag, peak amplitude)
// - mod.rs: Coordinator (FeatureExtractor)
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

pub(crate) mod fft;
mod spectral;
mod temporal;
mod types;

pub use fft::FftProcessor;
pub use spectral::SpectralFeatures;
pub use temporal::{max_sample_delta, peak_amplitude, TemporalFeatures};
pub use types::{Band, BandEnergies, FeatureSet};

use crate::analysis::frame::AudioFrame;
use crate::config::FeatureConfig;

/// FeatureExtractor coordinates the feature extraction pipeline
///
/// Pure and deterministic: the same frame always yields the same features.
pub struct FeatureExtractor {
    temporal_features: TemporalFeatures,
    fundamental_floor: f32,
}

impl FeatureExtractor {
    /// Create a new FeatureExtractor with the given thresholds
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            temporal_features: TemporalFeatures::new(config.transient_threshold),
            fundamental_floor: config.fundamental_floor,
        }
    }

    /// Extract all features from an audio frame
    ///
    /// 1. Normalize byte bins to [0, 1]
    /// 2. Compute band energies, centroid, flatness and harmonic ratio
    /// 3. Detect transients in the time-domain samples
    pub fn extract(&self, frame: &AudioFrame) -> FeatureSet {
        let spectrum = frame.normalized_spectrum();
        let spectral =
            SpectralFeatures::new(frame.sample_rate, frame.frequency_data.len());

        FeatureSet {
            bands: spectral.compute_band_energies(&spectrum),
            transient: self.temporal_features.detect_transient(&frame.time_domain),
            centroid: spectral.compute_centroid(&spectrum),
            flatness: spectral.compute_flatness(&spectrum),
            harmonic_ratio: spectral.compute_harmonic_ratio(&spectrum, self.fundamental_floor),
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(&FeatureConfig::default())
    }
}
