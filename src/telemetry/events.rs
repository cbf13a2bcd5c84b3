//! Core telemetry event types describing detection-loop diagnostics exposed
//! to the CLI and any in-process subscriber.

use serde::{Deserialize, Serialize};

use crate::analysis::BackendKind;
use crate::managers::BackendStatus;

/// Why a tick ended without publishing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Silence,
    NoAudioSource,
    EmptyClassification,
    Disabled,
}

/// Metric events covering detections, backend transitions and tick outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    Detection {
        tag: String,
        confidence: f32,
        backend: BackendKind,
    },
    BackendReady {
        status: BackendStatus,
        timestamp_ms: u64,
    },
    InferenceFallback {
        reason: String,
    },
    TickSkipped {
        reason: SkipReason,
    },
    TickLatency {
        avg_ms: f32,
        max_ms: f32,
        sample_count: usize,
    },
    Error {
        code: i32,
        context: String,
    },
}
