// Model acquisition and inference error types

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Model error code constants
///
/// Error code range: 3001-3008
pub struct ModelErrorCodes;

impl ModelErrorCodes {
    /// Loading the model from the local path failed
    pub const LOCAL_LOAD_FAILED: i32 = 3001;

    /// Fetching or loading the model from a remote mirror failed
    pub const REMOTE_LOAD_FAILED: i32 = 3002;

    /// Every configured model source failed
    pub const ALL_SOURCES_FAILED: i32 = 3003;

    /// A single forward pass failed
    pub const INFERENCE_FAILED: i32 = 3004;

    /// Input tensor did not have the expected length
    pub const INVALID_INPUT: i32 = 3005;

    /// No inference backend compiled into this build
    pub const BACKEND_UNAVAILABLE: i32 = 3006;

    /// The warm-up pass after loading failed
    pub const WARMUP_FAILED: i32 = 3007;

    /// Class map could not be fetched or parsed
    pub const CLASS_MAP_UNAVAILABLE: i32 = 3008;
}

/// Log a model error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_model_error(err: &ModelError, context: &str) {
    error!(
        "Model error in {}: code={}, component=ModelManager, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Model-related errors
///
/// Every variant is recoverable: load failures end in heuristic mode and
/// inference failures are replaced by a heuristic result for that tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Local on-disk model could not be loaded
    LocalLoadFailed { path: String, reason: String },

    /// Remote mirror could not be fetched or loaded
    RemoteLoadFailed { url: String, reason: String },

    /// Every source was attempted and failed
    AllSourcesFailed { attempted: usize },

    /// Forward pass failed
    InferenceFailed { reason: String },

    /// Input length mismatch
    InvalidInput { expected: usize, actual: usize },

    /// No inference backend available in this build
    BackendUnavailable,

    /// Warm-up inference failed after a successful load
    WarmupFailed { reason: String },

    /// Class map fetch or parse failed
    ClassMapUnavailable { reason: String },
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::LocalLoadFailed { .. } => ModelErrorCodes::LOCAL_LOAD_FAILED,
            ModelError::RemoteLoadFailed { .. } => ModelErrorCodes::REMOTE_LOAD_FAILED,
            ModelError::AllSourcesFailed { .. } => ModelErrorCodes::ALL_SOURCES_FAILED,
            ModelError::InferenceFailed { .. } => ModelErrorCodes::INFERENCE_FAILED,
            ModelError::InvalidInput { .. } => ModelErrorCodes::INVALID_INPUT,
            ModelError::BackendUnavailable => ModelErrorCodes::BACKEND_UNAVAILABLE,
            ModelError::WarmupFailed { .. } => ModelErrorCodes::WARMUP_FAILED,
            ModelError::ClassMapUnavailable { .. } => ModelErrorCodes::CLASS_MAP_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            ModelError::LocalLoadFailed { path, reason } => {
                format!("Failed to load model from {}: {}", path, reason)
            }
            ModelError::RemoteLoadFailed { url, reason } => {
                format!("Failed to load model from {}: {}", url, reason)
            }
            ModelError::AllSourcesFailed { attempted } => {
                format!("All {} model sources failed", attempted)
            }
            ModelError::InferenceFailed { reason } => {
                format!("Inference failed: {}", reason)
            }
            ModelError::InvalidInput { expected, actual } => {
                format!(
                    "Invalid model input: expected {} samples, got {}",
                    expected, actual
                )
            }
            ModelError::BackendUnavailable => {
                "No inference backend available (build with the `onnx` feature)".to_string()
            }
            ModelError::WarmupFailed { reason } => {
                format!("Warm-up inference failed: {}", reason)
            }
            ModelError::ClassMapUnavailable { reason } => {
                format!("Class map unavailable: {}", reason)
            }
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ModelError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ModelError {}
