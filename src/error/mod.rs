// Error types for the timbre detector
//
// This module defines coded error types for audio capture, model acquisition
// and the detection loop. None of them are fatal to the hosting application:
// callers log them and degrade (heuristic fallback, skipped tick).

mod audio;
mod detection;
mod model;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use detection::{log_detection_error, DetectionError, DetectionErrorCodes};
pub use model::{log_model_error, ModelError, ModelErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so status displays and telemetry can report
/// failures uniformly.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
