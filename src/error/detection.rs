// Detection loop error types

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Detection error code constants
///
/// Error code range: 4001-4004
pub struct DetectionErrorCodes;

impl DetectionErrorCodes {
    /// No audio source configured
    pub const AUDIO_SOURCE_MISSING: i32 = 4001;

    /// Shared detection state lock was poisoned
    pub const LOCK_POISONED: i32 = 4002;

    /// Detection loop already running
    pub const ALREADY_RUNNING: i32 = 4003;

    /// Detection loop not running
    pub const NOT_RUNNING: i32 = 4004;
}

/// Log a detection error with structured context
pub fn log_detection_error(err: &DetectionError, context: &str) {
    error!(
        "Detection error in {}: code={}, component=DetectionLoop, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Detection-loop errors
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// No audio source has been attached to the controller
    AudioSourceMissing,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Start requested while running
    AlreadyRunning,

    /// Stop requested while stopped
    NotRunning,
}

impl ErrorCode for DetectionError {
    fn code(&self) -> i32 {
        match self {
            DetectionError::AudioSourceMissing => DetectionErrorCodes::AUDIO_SOURCE_MISSING,
            DetectionError::LockPoisoned { .. } => DetectionErrorCodes::LOCK_POISONED,
            DetectionError::AlreadyRunning => DetectionErrorCodes::ALREADY_RUNNING,
            DetectionError::NotRunning => DetectionErrorCodes::NOT_RUNNING,
        }
    }

    fn message(&self) -> String {
        match self {
            DetectionError::AudioSourceMissing => {
                "No audio source configured; detection disabled".to_string()
            }
            DetectionError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            DetectionError::AlreadyRunning => "Detection loop already running".to_string(),
            DetectionError::NotRunning => "Detection loop not running".to_string(),
        }
    }
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DetectionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DetectionError {}
