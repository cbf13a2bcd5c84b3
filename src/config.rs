//! Configuration management for detection tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! so thresholds, model sources and the detection cadence can be adjusted
//! without recompilation. Missing fields fall back to the built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub features: FeatureConfig,
    pub model: ModelConfig,
    pub audio: AudioConfig,
}

/// Detection loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Tick period in milliseconds
    pub interval_ms: u64,
    /// Peak amplitude below which a tick is skipped
    pub silence_threshold: f32,
    /// Minimum confidence before the prompt feed exposes a label
    pub prompt_confidence_gate: f32,
    /// Opt-in flag for the prompt feed
    pub prompt_feed_enabled: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1500,
            silence_threshold: 0.01,
            prompt_confidence_gate: 0.25,
            prompt_feed_enabled: false,
        }
    }
}

/// Feature extraction thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Max sample-to-sample delta that marks a transient
    pub transient_threshold: f32,
    /// Minimum normalized magnitude for a fundamental to count
    pub fundamental_floor: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            transient_threshold: 0.3,
            // ~25/255 on the analyser byte scale
            fundamental_floor: 0.1,
        }
    }
}

/// Neural model acquisition and inference parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// On-disk model path tried first
    pub local_path: Option<PathBuf>,
    /// Remote mirrors tried in order after the local path
    pub remote_mirrors: Vec<String>,
    /// Reference class-map file (index,mid,display_name)
    pub class_map_url: Option<String>,
    /// Native sample rate of the model
    pub sample_rate: u32,
    /// Fixed input length in samples
    pub input_samples: usize,
    /// Number of top scores considered before instrument filtering
    pub top_k: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            local_path: Some(PathBuf::from("models/yamnet.onnx")),
            // Deployment-specific; supplied through the config file
            remote_mirrors: Vec::new(),
            class_map_url: Some(
                "https://raw.githubusercontent.com/tensorflow/models/master/research/audioset/yamnet/yamnet_class_map.csv"
                    .to_string(),
            ),
            sample_rate: 16_000,
            input_samples: 15_600,
            top_k: 5,
        }
    }
}

/// Audio frame parameters for PCM-only sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// FFT size used to synthesize the byte spectrum (bins = fft_size / 2)
    pub fft_size: usize,
    /// Length of the time-domain window handed to the classifiers, in seconds
    pub window_seconds: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            window_seconds: 1.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or the defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    tracing::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/detection_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.interval_ms, 1500);
        assert_eq!(config.detection.silence_threshold, 0.01);
        assert_eq!(config.detection.prompt_confidence_gate, 0.25);
        assert_eq!(config.features.transient_threshold, 0.3);
        assert_eq!(config.model.sample_rate, 16_000);
        assert_eq!(config.model.input_samples, 15_600);
        assert_eq!(config.model.top_k, 5);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.detection.interval_ms, config.detection.interval_ms);
        assert_eq!(parsed.model.remote_mirrors, config.model.remote_mirrors);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "detection": {{ "interval_ms": 500 }} }}"#).unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config.detection.interval_ms, 500);
        assert_eq!(config.detection.silence_threshold, 0.01);
        assert_eq!(config.model.input_samples, 15_600);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/detection_config.json");
        assert_eq!(config.detection.interval_ms, 1500);
    }

    #[test]
    fn test_invalid_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config.features.transient_threshold, 0.3);
    }
}
