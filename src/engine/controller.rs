//! DetectionController: periodic detection loop.
//!
//! `stopped → running → stopped`. Starting brings the model manager to a
//! terminal state, fetches the class map (best effort) and then fires a
//! tick every `interval_ms`. Each tick runs as its own task, so a slow
//! inference never delays the next tick.
//!
//! A tick pulls one frame, skips it when the peak amplitude is below the
//! silence threshold, classifies it with the backend the model manager
//! selects and publishes the result. Neural inference errors fall back to
//! the heuristic classifier for that tick only. Publishing re-checks the
//! enabled flag under the result lock, so results that finish after a stop
//! are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::analysis::{
    AudioFrame, BackendKind, DetectionResult, FeatureExtractor, HeuristicClassifier,
    LabelCatalog,
};
use crate::audio::AudioSource;
use crate::config::{AppConfig, DetectionConfig};
use crate::context::DetectionContext;
use crate::display::DisplaySink;
use crate::error::{log_detection_error, log_model_error, DetectionError, ErrorCode};
use crate::managers::{ActiveBackend, BackendStatus, BroadcastChannelManager, DetectionUpdate};
use crate::telemetry::{SkipReason, TelemetryHub};

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A result was stored and shown
    Published(DetectionResult),
    /// Peak amplitude below the silence threshold
    Silent { peak: f32 },
    /// No audio source attached
    NoAudioSource,
    /// Neural path found no instrument class; the previous result stays
    Empty,
    /// Detection was disabled before the result could be published
    Disabled,
}

/// Owns the detection timer and the per-tick pipeline
pub struct DetectionController {
    context: Arc<DetectionContext>,
    config: DetectionConfig,
    extractor: FeatureExtractor,
    heuristic: HeuristicClassifier,
    catalog: &'static LabelCatalog,
    audio: RwLock<Option<Arc<dyn AudioSource>>>,
    display: Arc<dyn DisplaySink>,
    updates: Option<Arc<BroadcastChannelManager>>,
    telemetry: Arc<TelemetryHub>,
    running: AtomicBool,
    loop_task: Mutex<Option<JoinHandle<()>>>,
    missing_source_warned: AtomicBool,
}

impl DetectionController {
    /// # Arguments
    /// * `context` - Session state shared with consumers
    /// * `config` - Detection cadence/gates and feature thresholds
    /// * `display` - Sink notified on every publish and on stop
    /// * `telemetry` - Session telemetry hub
    pub fn new(
        context: Arc<DetectionContext>,
        config: &AppConfig,
        display: Arc<dyn DisplaySink>,
        telemetry: Arc<TelemetryHub>,
    ) -> Self {
        Self {
            context,
            config: config.detection.clone(),
            extractor: FeatureExtractor::new(&config.features),
            heuristic: HeuristicClassifier::new(),
            catalog: LabelCatalog::shared(),
            audio: RwLock::new(None),
            display,
            updates: None,
            telemetry,
            running: AtomicBool::new(false),
            loop_task: Mutex::new(None),
            missing_source_warned: AtomicBool::new(false),
        }
    }

    /// Also fan display updates out over the detection broadcast channel
    ///
    /// The sender is looked up per update, so closing the channel on the
    /// manager closes it for subscribers too.
    pub fn with_updates(mut self, broadcasts: Arc<BroadcastChannelManager>) -> Self {
        self.updates = Some(broadcasts);
        self
    }

    pub fn context(&self) -> &Arc<DetectionContext> {
        &self.context
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Attach or detach the audio source
    pub fn set_audio_source(
        &self,
        source: Option<Arc<dyn AudioSource>>,
    ) -> Result<(), DetectionError> {
        let mut guard = self.audio.write().map_err(|_| DetectionError::LockPoisoned {
            component: "audio_source".to_string(),
        })?;
        if source.is_some() {
            self.missing_source_warned.store(false, Ordering::Release);
        }
        *guard = source;
        Ok(())
    }

    fn audio_source(&self) -> Result<Option<Arc<dyn AudioSource>>, DetectionError> {
        self.audio
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| DetectionError::LockPoisoned {
                component: "audio_source".to_string(),
            })
    }

    fn has_audio_source(&self) -> bool {
        matches!(self.audio_source(), Ok(Some(_)))
    }

    fn warn_missing_source(&self) {
        if !self.missing_source_warned.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                "[DetectionLoop] {}",
                DetectionError::AudioSourceMissing.message()
            );
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Start the periodic loop
    ///
    /// No-op when already running. Declines to start (with a one-time
    /// warning) when no audio source is attached.
    ///
    /// # Returns
    /// `Ok(true)` if this call started the loop
    pub async fn start(self: &Arc<Self>) -> Result<bool, DetectionError> {
        if !self.begin().await? {
            return Ok(false);
        }

        let mut task = self.lock_loop_task()?;
        if !self.is_running() {
            // Stopped while the backend was loading
            return Ok(false);
        }

        self.context.enable();
        *task = Some(self.spawn_loop());
        tracing::info!(
            "[DetectionLoop] Started ({} ms interval)",
            self.config.interval_ms
        );
        Ok(true)
    }

    /// Start without a timer; the caller drives ticks with `run_tick`
    ///
    /// Used for offline sources such as WAV files.
    pub async fn start_manual(&self) -> Result<bool, DetectionError> {
        if !self.begin().await? {
            return Ok(false);
        }

        let _task = self.lock_loop_task()?;
        if !self.is_running() {
            return Ok(false);
        }
        self.context.enable();
        tracing::info!("[DetectionLoop] Started in manual mode");
        Ok(true)
    }

    /// Common start sequence: claim the running flag and prepare backends
    async fn begin(&self) -> Result<bool, DetectionError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("[DetectionLoop] {}", DetectionError::AlreadyRunning.message());
            return Ok(false);
        }

        let claim = RunningClaim {
            running: &self.running,
            kept: false,
        };
        if !self.has_audio_source() {
            self.warn_missing_source();
            return Ok(false);
        }

        self.prepare().await;
        claim.keep();
        Ok(true)
    }

    /// Bring the model manager to a terminal state and load the class map
    pub async fn prepare(&self) -> BackendStatus {
        let manager = self.context.model_manager();
        let status = manager.activate().await;
        if manager.ensure_class_map().await.is_none() {
            tracing::debug!("[DetectionLoop] Class map unavailable, using built-in table");
        }
        status
    }

    /// Stop the loop, clear the current result and notify the display
    ///
    /// No-op when not running.
    ///
    /// # Returns
    /// `true` if this call stopped the loop
    pub fn stop(&self) -> bool {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("[DetectionLoop] {}", DetectionError::NotRunning.message());
            return false;
        }

        match self.lock_loop_task() {
            Ok(mut task) => {
                if let Some(handle) = task.take() {
                    handle.abort();
                }
            }
            Err(err) => log_detection_error(&err, "stop"),
        }

        let cleared = self.context.disable_and_clear(|| {
            self.display.show(None);
            self.broadcast(None);
        });
        if let Err(err) = cleared {
            log_detection_error(&err, "stop");
        }

        tracing::info!("[DetectionLoop] Stopped");
        true
    }

    fn spawn_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let period = Duration::from_millis(self.config.interval_ms.max(1));
        let controller = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    controller.run_tick().await;
                });
            }
        })
    }

    fn lock_loop_task(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<JoinHandle<()>>>, DetectionError> {
        self.loop_task
            .lock()
            .map_err(|_| DetectionError::LockPoisoned {
                component: "loop_task".to_string(),
            })
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// Run one detection tick
    pub async fn run_tick(&self) -> TickOutcome {
        if !self.context.is_enabled() {
            return TickOutcome::Disabled;
        }
        let started = Instant::now();

        let source = match self.audio_source() {
            Ok(Some(source)) => source,
            Ok(None) => {
                self.warn_missing_source();
                self.telemetry.record_tick_skipped(SkipReason::NoAudioSource);
                return TickOutcome::NoAudioSource;
            }
            Err(err) => {
                log_detection_error(&err, "run_tick");
                self.telemetry.record_tick_skipped(SkipReason::NoAudioSource);
                return TickOutcome::NoAudioSource;
            }
        };

        let frame = source.snapshot();
        let peak = frame.peak_amplitude();
        if peak < self.config.silence_threshold {
            tracing::trace!("[DetectionLoop] Silent frame (peak {:.4})", peak);
            self.telemetry.record_tick_skipped(SkipReason::Silence);
            return TickOutcome::Silent { peak };
        }

        let Some(result) = self.classify(&frame).await else {
            self.telemetry
                .record_tick_skipped(SkipReason::EmptyClassification);
            return TickOutcome::Empty;
        };

        let outcome = self.publish(result);
        if matches!(outcome, TickOutcome::Published(_)) {
            self.telemetry
                .record_tick_latency(started.elapsed().as_secs_f32() * 1000.0);
        }
        outcome
    }

    async fn classify(&self, frame: &AudioFrame) -> Option<DetectionResult> {
        match self.context.model_manager().active_backend() {
            ActiveBackend::Neural(neural) => match neural.classify(frame).await {
                Ok(result) => result,
                Err(err) => {
                    log_model_error(&err, "run_tick");
                    self.telemetry.record_inference_fallback(err.message());
                    tracing::warn!("[DetectionLoop] Inference failed, using heuristic for this tick");
                    self.classify_heuristic(frame)
                }
            },
            ActiveBackend::Heuristic => self.classify_heuristic(frame),
        }
    }

    fn classify_heuristic(&self, frame: &AudioFrame) -> Option<DetectionResult> {
        let features = self.extractor.extract(frame);
        let candidates = self.heuristic.classify(&features);
        DetectionResult::from_ranked(&candidates, self.catalog, BackendKind::Heuristic)
    }

    fn publish(&self, result: DetectionResult) -> TickOutcome {
        let mut shown = None;
        let published = self.context.publish(result, |stored| {
            self.display.show(Some(stored));
            self.broadcast(Some(stored.clone()));
            self.telemetry.record_detection(stored);
            shown = Some(stored.clone());
        });

        match (published, shown) {
            (Ok(true), Some(stored)) => TickOutcome::Published(stored),
            (Ok(_), _) => {
                self.telemetry.record_tick_skipped(SkipReason::Disabled);
                TickOutcome::Disabled
            }
            (Err(err), _) => {
                self.telemetry.record_error(&err, "publish");
                TickOutcome::Disabled
            }
        }
    }

    fn broadcast(&self, update: DetectionUpdate) {
        if let Some(tx) = self.updates.as_ref().and_then(|b| b.detection_sender()) {
            // No subscribers is fine
            let _ = tx.send(update);
        }
    }
}

/// Running flag claimed by a start in progress
///
/// Dropped without `keep` (declined start, or the start future was
/// cancelled while the backend loaded), it clears the flag again.
struct RunningClaim<'a> {
    running: &'a AtomicBool,
    kept: bool,
}

impl RunningClaim<'_> {
    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for RunningClaim<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.running.store(false, Ordering::Release);
        }
    }
}

impl Drop for DetectionController {
    fn drop(&mut self) {
        if let Ok(mut task) = self.loop_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
