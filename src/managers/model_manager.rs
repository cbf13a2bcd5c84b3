// ModelManager: neural model acquisition and heuristic fallback
//
// Single Responsibility: owns the model handle and the backend state machine
//
//   uninitialized → loading → { neural_ready | heuristic_ready }
//
// Sources are tried local path first, then remote mirrors in order. The
// first handle that loads is warmed up with one discarded inference before
// the manager reports neural_ready. Any failure ends in heuristic_ready,
// which is not retried until the handle/marker is released.
//
// The class map is a separate one-time fetch; its failure never blocks
// readiness.
//
// A load sequence is owned by a `LoadSequence` guard. If the activating
// future is dropped mid-load, the guard clears the loading flag and
// publishes `Uninitialized` so waiting activations take over. A release
// during a load bumps the generation; the finished load then discards its
// handle instead of storing it.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, OnceCell};

use crate::config::ModelConfig;
use crate::error::{log_model_error, ErrorCode, ModelError};
use crate::neural::{
    ClassMap, ClassMapSource, InferenceModel, ModelLoader, ModelLocation, NeuralClassifier,
};
use crate::telemetry::TelemetryHub;

/// Backend state reported by the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Uninitialized,
    Loading,
    NeuralReady,
    HeuristicReady,
}

impl BackendStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BackendStatus::NeuralReady | BackendStatus::HeuristicReady)
    }
}

/// Classifier selected for one tick
#[derive(Clone)]
pub enum ActiveBackend {
    Neural(NeuralClassifier),
    Heuristic,
}

/// Manages the neural model lifecycle
///
/// Shared through `Arc`; every method takes `&self`.
pub struct ModelManager {
    config: ModelConfig,
    loader: Arc<dyn ModelLoader>,
    class_map_source: Option<Arc<dyn ClassMapSource>>,
    telemetry: Option<Arc<TelemetryHub>>,
    model: Mutex<Option<Arc<dyn InferenceModel>>>,
    heuristic_marker: AtomicBool,
    loading: AtomicBool,
    status: watch::Sender<BackendStatus>,
    class_map: OnceCell<Option<Arc<ClassMap>>>,
    load_sequences: AtomicUsize,
    generation: AtomicU64,
}

impl ModelManager {
    /// Create a manager in the `Uninitialized` state
    ///
    /// # Arguments
    /// * `config` - Model sources and input geometry
    /// * `loader` - Backend that turns a location into a handle
    pub fn new(config: ModelConfig, loader: Arc<dyn ModelLoader>) -> Self {
        let (status, _) = watch::channel(BackendStatus::Uninitialized);
        Self {
            config,
            loader,
            class_map_source: None,
            telemetry: None,
            model: Mutex::new(None),
            heuristic_marker: AtomicBool::new(false),
            loading: AtomicBool::new(false),
            status,
            class_map: OnceCell::new(),
            load_sequences: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_class_map_source(mut self, source: Arc<dyn ClassMapSource>) -> Self {
        self.class_map_source = Some(source);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryHub>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn status(&self) -> BackendStatus {
        *self.status.borrow()
    }

    /// Watch backend transitions
    pub fn subscribe_status(&self) -> watch::Receiver<BackendStatus> {
        self.status.subscribe()
    }

    /// Number of load sequences started since creation
    pub fn load_sequences(&self) -> usize {
        self.load_sequences.load(Ordering::Acquire)
    }

    /// Sources in the order they are attempted
    pub fn locations(&self) -> Vec<ModelLocation> {
        self.config
            .local_path
            .iter()
            .cloned()
            .map(ModelLocation::Local)
            .chain(
                self.config
                    .remote_mirrors
                    .iter()
                    .cloned()
                    .map(ModelLocation::Remote),
            )
            .collect()
    }

    /// Bring the manager to a terminal state
    ///
    /// Never fails: every load error degrades to `HeuristicReady`. A call
    /// made while another activation is loading waits for that load to
    /// finish instead of starting a second one. If that load is cancelled
    /// before it settles, the waiter starts its own.
    ///
    /// # Returns
    /// The terminal status reached, or `Uninitialized` when `release` ran
    /// while this call was loading or waiting
    pub async fn activate(&self) -> BackendStatus {
        loop {
            if let Some(status) = self.settled_status() {
                return self.set_status(status);
            }

            if self
                .loading
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                tracing::debug!("[ModelManager] Load already in progress, waiting");
                let generation = self.generation.load(Ordering::Acquire);
                self.wait_for_idle().await;
                if self.generation.load(Ordering::Acquire) != generation {
                    return self.status();
                }
                continue;
            }

            let sequence = LoadSequence::begin(self);

            // Another sequence may have finished between the checks and the CAS
            if let Some(status) = self.settled_status() {
                return sequence.settle(status);
            }

            self.set_status(BackendStatus::Loading);
            self.load_sequences.fetch_add(1, Ordering::AcqRel);
            let loaded = self.load_first_available().await;
            return sequence.finish(loaded);
        }
    }

    /// Load the class map once; later calls return the cached outcome
    ///
    /// # Returns
    /// The map, or `None` if no source is configured or the fetch failed
    pub async fn ensure_class_map(&self) -> Option<Arc<ClassMap>> {
        self.class_map
            .get_or_init(|| async {
                let source = self.class_map_source.as_ref()?;
                match source.fetch().await {
                    Ok(map) => {
                        tracing::info!(
                            "[ModelManager] Loaded {} classes from {}",
                            map.len(),
                            source.describe()
                        );
                        Some(Arc::new(map))
                    }
                    Err(err) => {
                        log_model_error(&err, "ensure_class_map");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Currently loaded class map, without fetching
    pub fn class_map(&self) -> Option<Arc<ClassMap>> {
        self.class_map.get().cloned().flatten()
    }

    /// Tagged backend for the current state
    pub fn active_backend(&self) -> ActiveBackend {
        match self.lock_model().as_ref() {
            Some(model) if self.status() == BackendStatus::NeuralReady => {
                ActiveBackend::Neural(NeuralClassifier::new(
                    Arc::clone(model),
                    self.class_map(),
                    &self.config,
                ))
            }
            _ => ActiveBackend::Heuristic,
        }
    }

    /// Release the model handle and reset to `Uninitialized`
    ///
    /// Clears the heuristic marker as well, so the next activation loads
    /// again. A load still in flight discards its handle when it finishes.
    /// The class map stays cached.
    pub fn release(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let model = {
            let mut slot = self.lock_model();
            self.heuristic_marker.store(false, Ordering::Release);
            if !self.loading.load(Ordering::Acquire) {
                self.set_status(BackendStatus::Uninitialized);
            }
            slot.take()
        };
        if let Some(model) = model {
            model.release();
            tracing::info!("[ModelManager] Model handle released");
        }
    }

    async fn load_first_available(&self) -> Result<Arc<dyn InferenceModel>, ModelError> {
        let locations = self.locations();

        for location in &locations {
            tracing::info!("[ModelManager] Loading model from {}", location);
            match self.loader.load(location).await {
                Ok(model) => {
                    self.warm_up(&model).await.inspect_err(|_| model.release())?;
                    return Ok(model);
                }
                Err(err) => log_model_error(&err, "load_first_available"),
            }
        }

        Err(ModelError::AllSourcesFailed {
            attempted: locations.len(),
        })
    }

    async fn warm_up(&self, model: &Arc<dyn InferenceModel>) -> Result<(), ModelError> {
        let model = Arc::clone(model);
        let input = vec![0.0f32; self.config.input_samples];
        tokio::task::spawn_blocking(move || model.predict(&input))
            .await
            .map_err(|err| ModelError::WarmupFailed {
                reason: err.to_string(),
            })?
            .map(|_| ())
            .map_err(|err| ModelError::WarmupFailed {
                reason: err.message(),
            })
    }

    /// Terminal status implied by a held handle or the heuristic marker
    fn settled_status(&self) -> Option<BackendStatus> {
        if self.lock_model().is_some() {
            Some(BackendStatus::NeuralReady)
        } else if self.heuristic_marker.load(Ordering::Acquire) {
            Some(BackendStatus::HeuristicReady)
        } else {
            None
        }
    }

    /// Wait until no load sequence holds the loading flag
    ///
    /// The flag is cleared before the closing status is published, so the
    /// publish always wakes this waiter.
    async fn wait_for_idle(&self) {
        let mut rx = self.status.subscribe();
        let idle = rx
            .wait_for(|_| !self.loading.load(Ordering::Acquire))
            .await
            .is_ok();
        if !idle {
            tracing::debug!("[ModelManager] Status channel closed while waiting");
        }
    }

    fn set_status(&self, status: BackendStatus) -> BackendStatus {
        self.status.send_replace(status);
        status
    }

    /// The handle is only ever swapped whole, so a poisoned lock still
    /// holds a consistent value.
    fn lock_model(&self) -> MutexGuard<'_, Option<Arc<dyn InferenceModel>>> {
        self.model
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Owns the loading flag for one load sequence
///
/// Dropping it without `finish`/`settle` (the activating future was
/// cancelled) clears the flag and publishes `Uninitialized`.
struct LoadSequence<'a> {
    manager: &'a ModelManager,
    generation: u64,
    closed: bool,
}

impl<'a> LoadSequence<'a> {
    fn begin(manager: &'a ModelManager) -> Self {
        Self {
            manager,
            generation: manager.generation.load(Ordering::Acquire),
            closed: false,
        }
    }

    /// Close without loading; another sequence already settled the state
    fn settle(mut self, status: BackendStatus) -> BackendStatus {
        let manager = self.manager;
        let _slot = manager.lock_model();
        self.close(status)
    }

    /// Store the outcome of a load
    ///
    /// An outcome from before a `release` is discarded and the sequence
    /// closes as `Uninitialized`.
    fn finish(mut self, loaded: Result<Arc<dyn InferenceModel>, ModelError>) -> BackendStatus {
        let manager = self.manager;
        let mut slot = manager.lock_model();
        let current = manager.generation.load(Ordering::Acquire) == self.generation;

        let (status, discarded) = match loaded {
            Ok(model) if current => {
                tracing::info!("[ModelManager] Neural backend ready ({})", model.describe());
                *slot = Some(model);
                (BackendStatus::NeuralReady, None)
            }
            Ok(model) => {
                tracing::info!("[ModelManager] Released during load, discarding handle");
                (BackendStatus::Uninitialized, Some(model))
            }
            Err(err) => {
                log_model_error(&err, "activate");
                if let Some(telemetry) = &manager.telemetry {
                    telemetry.record_error(&err, "activate");
                }
                if current {
                    tracing::warn!("[ModelManager] Falling back to heuristic classifier");
                    manager.heuristic_marker.store(true, Ordering::Release);
                    (BackendStatus::HeuristicReady, None)
                } else {
                    (BackendStatus::Uninitialized, None)
                }
            }
        };

        self.close(status);
        drop(slot);

        if let Some(model) = discarded {
            model.release();
        }
        if status.is_terminal() {
            if let Some(telemetry) = &manager.telemetry {
                telemetry.record_backend_ready(status);
            }
        }
        status
    }

    /// Callers hold the model lock, which orders this against `release`
    fn close(&mut self, status: BackendStatus) -> BackendStatus {
        self.closed = true;
        self.manager.loading.store(false, Ordering::Release);
        self.manager.set_status(status)
    }
}

impl Drop for LoadSequence<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        tracing::warn!("[ModelManager] Load cancelled before completion");
        let manager = self.manager;
        let _slot = manager.lock_model();
        self.close(BackendStatus::Uninitialized);
    }
}

impl Drop for ModelManager {
    fn drop(&mut self) {
        if let Some(model) = self.lock_model().take() {
            model.release();
        }
    }
}
