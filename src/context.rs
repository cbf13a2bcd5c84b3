// DetectionContext: explicitly owned classifier state
//
// One context per detection session, shared through Arc between the loop
// controller, the engine handle and consumers. It holds:
// - the detection-enabled flag (checked again at publish time)
// - the last published DetectionResult
// - the prompt-feed gate and opt-in flag
// - the ModelManager, which owns the model handle and backend status
//
// Publishing and clearing happen under the result write lock, together with
// the display notification, so a late publish can never land after a stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::analysis::DetectionResult;
use crate::config::DetectionConfig;
use crate::error::{log_detection_error, DetectionError};
use crate::managers::{BackendStatus, ModelManager};

/// Point-in-time view of the classifier state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierState {
    pub backend: BackendStatus,
    pub enabled: bool,
    pub last_result: Option<DetectionResult>,
    pub confidence_gate: f32,
    pub prompt_feed_enabled: bool,
}

/// DetectionContext: dependency container for one detection session
///
/// Benefits:
/// - No ambient global state; several sessions can coexist
/// - Graceful lock error handling (no unwrap/expect)
/// - Clear teardown: clearing the context resets everything the display
///   shows
pub struct DetectionContext {
    model_manager: Arc<ModelManager>,
    enabled: AtomicBool,
    last_result: RwLock<Option<DetectionResult>>,
    confidence_gate: f32,
    prompt_feed_enabled: AtomicBool,
}

impl DetectionContext {
    /// Create a context with detection disabled and no result
    ///
    /// # Arguments
    /// * `model_manager` - Manager owning the model handle for this session
    /// * `config` - Prompt gate and opt-in defaults
    pub fn new(model_manager: Arc<ModelManager>, config: &DetectionConfig) -> Self {
        Self {
            model_manager,
            enabled: AtomicBool::new(false),
            last_result: RwLock::new(None),
            confidence_gate: config.prompt_confidence_gate,
            prompt_feed_enabled: AtomicBool::new(config.prompt_feed_enabled),
        }
    }

    // ========================================================================
    // LOCK HELPER METHODS
    // Safe lock acquisition with typed error handling (no unwrap/expect)
    // ========================================================================

    fn read_result(&self) -> Result<RwLockReadGuard<'_, Option<DetectionResult>>, DetectionError> {
        self.last_result
            .read()
            .map_err(|_| DetectionError::LockPoisoned {
                component: "last_result".to_string(),
            })
    }

    fn write_result(
        &self,
    ) -> Result<RwLockWriteGuard<'_, Option<DetectionResult>>, DetectionError> {
        self.last_result
            .write()
            .map_err(|_| DetectionError::LockPoisoned {
                component: "last_result".to_string(),
            })
    }

    // ========================================================================
    // STATE ACCESSORS
    // ========================================================================

    pub fn model_manager(&self) -> &Arc<ModelManager> {
        &self.model_manager
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable publishing; only the loop controller calls this
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn confidence_gate(&self) -> f32 {
        self.confidence_gate
    }

    pub fn prompt_feed_enabled(&self) -> bool {
        self.prompt_feed_enabled.load(Ordering::Acquire)
    }

    pub fn set_prompt_feed_enabled(&self, enabled: bool) {
        self.prompt_feed_enabled.store(enabled, Ordering::Release);
    }

    /// Last published result, if any
    pub fn last_result(&self) -> Result<Option<DetectionResult>, DetectionError> {
        Ok(self.read_result()?.clone())
    }

    pub fn snapshot(&self) -> Result<ClassifierState, DetectionError> {
        Ok(ClassifierState {
            backend: self.model_manager.status(),
            enabled: self.is_enabled(),
            last_result: self.last_result()?,
            confidence_gate: self.confidence_gate,
            prompt_feed_enabled: self.prompt_feed_enabled(),
        })
    }

    // ========================================================================
    // BUSINESS LOGIC METHODS - PUBLISH / RESET
    // ========================================================================

    /// Store `result` as the current detection if detection is still enabled
    ///
    /// `notify` runs under the same lock, after the store.
    ///
    /// # Returns
    /// * `Ok(true)` - Result stored and `notify` called
    /// * `Ok(false)` - Detection was disabled; nothing changed
    pub fn publish<F>(&self, result: DetectionResult, notify: F) -> Result<bool, DetectionError>
    where
        F: FnOnce(&DetectionResult),
    {
        let mut guard = self.write_result().map_err(|err| {
            log_detection_error(&err, "publish");
            err
        })?;

        if !self.is_enabled() {
            tracing::debug!("[DetectionContext] Dropping late result '{}'", result.tag);
            return Ok(false);
        }

        let stored = guard.insert(result);
        notify(stored);
        Ok(true)
    }

    /// Disable detection and clear the current result
    ///
    /// `notify` runs under the result lock once the result is cleared.
    pub fn disable_and_clear<F>(&self, notify: F) -> Result<(), DetectionError>
    where
        F: FnOnce(),
    {
        self.enabled.store(false, Ordering::Release);

        let mut guard = self.write_result().map_err(|err| {
            log_detection_error(&err, "disable_and_clear");
            err
        })?;
        *guard = None;
        notify();
        Ok(())
    }
}
