// Temporal module - Time-domain feature extraction
//
// This module computes features directly from time-domain samples on the
// [-1, 1] amplitude scale: the transient (sharp attack) flag and the peak
// amplitude used for silence gating.

/// Temporal feature computation functions
pub struct TemporalFeatures {
    transient_threshold: f32,
}

impl TemporalFeatures {
    /// Create a new temporal features processor
    ///
    /// # Arguments
    /// * `transient_threshold` - Sample-to-sample delta that marks an attack
    pub fn new(transient_threshold: f32) -> Self {
        Self {
            transient_threshold,
        }
    }

    /// Detect a sharp attack in the frame
    ///
    /// A frame is transient when the largest absolute difference between two
    /// consecutive samples exceeds the threshold.
    pub fn detect_transient(&self, audio: &[f32]) -> bool {
        max_sample_delta(audio) > self.transient_threshold
    }
}

/// Largest absolute difference between consecutive samples
pub fn max_sample_delta(audio: &[f32]) -> f32 {
    audio
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .fold(0.0, f32::max)
}

/// Largest absolute sample value
pub fn peak_amplitude(audio: &[f32]) -> f32 {
    audio.iter().map(|s| s.abs()).fold(0.0, f32::max)
}
