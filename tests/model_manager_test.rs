//! Integration tests for model acquisition and heuristic fallback
//!
//! These tests drive ModelManager through scripted loaders:
//! - Source order (local path before remote mirrors)
//! - Single load sequence under concurrent activation
//! - Warm-up inference before neural_ready
//! - Class-map failures never blocking readiness
//! - Cancelled or released loads leaving the manager usable

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use timbre_detector::config::ModelConfig;
use timbre_detector::error::ModelError;
use timbre_detector::managers::{ActiveBackend, BackendStatus, ModelManager};
use timbre_detector::neural::{
    ClassMap, ClassMapSource, InferenceModel, ModelLoader, ModelLocation,
};

// ============================================================================
// TEST DOUBLES
// ============================================================================

#[derive(Default)]
struct StubModel {
    predictions: AtomicUsize,
    released: AtomicBool,
    fail_predict: bool,
}

impl InferenceModel for StubModel {
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>, ModelError> {
        self.predictions.fetch_add(1, Ordering::SeqCst);
        if self.fail_predict {
            return Err(ModelError::InferenceFailed {
                reason: "bad graph".to_string(),
            });
        }
        assert!(input.iter().all(|&x| x == 0.0), "warm-up input is silence");
        Ok(vec![0.0; 521])
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Loader that succeeds only for the listed locations
struct ScriptedLoader {
    succeed_for: Vec<ModelLocation>,
    model: Arc<StubModel>,
    attempts: Mutex<Vec<ModelLocation>>,
    delay: Duration,
}

impl ScriptedLoader {
    fn new(succeed_for: Vec<ModelLocation>, model: Arc<StubModel>) -> Arc<Self> {
        Self::with_delay(succeed_for, model, Duration::ZERO)
    }

    fn slow(succeed_for: Vec<ModelLocation>, model: Arc<StubModel>) -> Arc<Self> {
        Self::with_delay(succeed_for, model, Duration::from_millis(50))
    }

    fn with_delay(
        succeed_for: Vec<ModelLocation>,
        model: Arc<StubModel>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            succeed_for,
            model,
            attempts: Mutex::new(Vec::new()),
            delay,
        })
    }

    fn attempts(&self) -> Vec<ModelLocation> {
        self.attempts.lock().unwrap().clone()
    }
}

impl ModelLoader for ScriptedLoader {
    fn load<'a>(
        &'a self,
        location: &'a ModelLocation,
    ) -> BoxFuture<'a, Result<Arc<dyn InferenceModel>, ModelError>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(location.clone());
            tokio::time::sleep(self.delay).await;
            if self.succeed_for.contains(location) {
                let model: Arc<dyn InferenceModel> = self.model.clone();
                Ok(model)
            } else {
                Err(ModelError::LocalLoadFailed {
                    path: location.to_string(),
                    reason: "not found".to_string(),
                })
            }
        })
    }
}

struct CountingClassMapSource {
    fetches: AtomicUsize,
    fail: bool,
}

impl ClassMapSource for CountingClassMapSource {
    fn fetch(&self) -> BoxFuture<'_, Result<ClassMap, ModelError>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ModelError::ClassMapUnavailable {
                    reason: "offline".to_string(),
                })
            } else {
                ClassMap::parse("index,mid,display_name\n0,/m/09x0r,Speech\n1,/m/0342h,Guitar\n")
            }
        })
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

fn local() -> ModelLocation {
    ModelLocation::Local(PathBuf::from("models/yamnet.onnx"))
}

fn mirror(n: usize) -> ModelLocation {
    ModelLocation::Remote(format!("https://mirror-{n}.invalid/yamnet.onnx"))
}

fn config() -> ModelConfig {
    ModelConfig {
        local_path: Some(PathBuf::from("models/yamnet.onnx")),
        remote_mirrors: vec![
            "https://mirror-1.invalid/yamnet.onnx".to_string(),
            "https://mirror-2.invalid/yamnet.onnx".to_string(),
        ],
        class_map_url: None,
        ..ModelConfig::default()
    }
}

// ============================================================================
// ACTIVATION
// ============================================================================

#[tokio::test]
async fn test_sources_tried_local_then_mirrors_in_order() {
    let model = Arc::new(StubModel::default());
    let loader = ScriptedLoader::new(vec![mirror(2)], model.clone());
    let manager = ModelManager::new(config(), loader.clone());

    assert_eq!(manager.activate().await, BackendStatus::NeuralReady);
    assert_eq!(loader.attempts(), vec![local(), mirror(1), mirror(2)]);
}

#[tokio::test]
async fn test_warm_up_runs_before_neural_ready() {
    let model = Arc::new(StubModel::default());
    let loader = ScriptedLoader::new(vec![local()], model.clone());
    let manager = ModelManager::new(config(), loader.clone());

    assert_eq!(manager.status(), BackendStatus::Uninitialized);
    assert_eq!(manager.activate().await, BackendStatus::NeuralReady);
    assert_eq!(model.predictions.load(Ordering::SeqCst), 1);
    assert_eq!(loader.attempts(), vec![local()]);
    assert!(matches!(manager.active_backend(), ActiveBackend::Neural(_)));
}

#[tokio::test]
async fn test_all_sources_failing_selects_heuristic() {
    let model = Arc::new(StubModel::default());
    let loader = ScriptedLoader::new(Vec::new(), model.clone());
    let manager = ModelManager::new(config(), loader.clone());

    assert_eq!(manager.activate().await, BackendStatus::HeuristicReady);
    assert_eq!(loader.attempts().len(), 3);
    assert!(matches!(manager.active_backend(), ActiveBackend::Heuristic));

    // Marker held: no retry
    assert_eq!(manager.activate().await, BackendStatus::HeuristicReady);
    assert_eq!(loader.attempts().len(), 3);
    assert_eq!(manager.load_sequences(), 1);
}

#[tokio::test]
async fn test_warm_up_failure_releases_model() {
    let model = Arc::new(StubModel {
        fail_predict: true,
        ..StubModel::default()
    });
    let loader = ScriptedLoader::new(vec![local()], model.clone());
    let manager = ModelManager::new(config(), loader);

    assert_eq!(manager.activate().await, BackendStatus::HeuristicReady);
    assert!(model.released.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_activation_loads_once() {
    let model = Arc::new(StubModel::default());
    let loader = ScriptedLoader::slow(vec![local()], model.clone());
    let manager = Arc::new(ModelManager::new(config(), loader.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.activate().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), BackendStatus::NeuralReady);
    }
    assert_eq!(manager.load_sequences(), 1);
    assert_eq!(loader.attempts(), vec![local()]);
    assert_eq!(model.predictions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_release_resets_to_uninitialized() {
    let model = Arc::new(StubModel::default());
    let loader = ScriptedLoader::new(vec![local()], model.clone());
    let manager = ModelManager::new(config(), loader.clone());

    manager.activate().await;
    manager.release();
    assert!(model.released.load(Ordering::SeqCst));
    assert_eq!(manager.status(), BackendStatus::Uninitialized);
    assert!(matches!(manager.active_backend(), ActiveBackend::Heuristic));

    assert_eq!(manager.activate().await, BackendStatus::NeuralReady);
    assert_eq!(manager.load_sequences(), 2);
}

#[tokio::test]
async fn test_status_watch_sees_loading() {
    let model = Arc::new(StubModel::default());
    let loader = ScriptedLoader::slow(vec![local()], model);
    let manager = Arc::new(ModelManager::new(config(), loader));
    let mut status = manager.subscribe_status();

    let activating = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.activate().await })
    };

    status
        .wait_for(|s| *s == BackendStatus::Loading)
        .await
        .unwrap();
    assert_eq!(activating.await.unwrap(), BackendStatus::NeuralReady);
}

#[tokio::test]
async fn test_cancelled_activation_does_not_block_the_next() {
    let model = Arc::new(StubModel::default());
    let loader = ScriptedLoader::with_delay(vec![local()], model, Duration::from_millis(300));
    let manager = ModelManager::new(config(), loader.clone());

    let cancelled = tokio::time::timeout(Duration::from_millis(50), manager.activate()).await;
    assert!(cancelled.is_err());
    assert_eq!(manager.status(), BackendStatus::Uninitialized);

    let status = tokio::time::timeout(Duration::from_secs(3), manager.activate())
        .await
        .expect("second activation finishes");
    assert_eq!(status, BackendStatus::NeuralReady);
    assert_eq!(manager.load_sequences(), 2);
}

#[tokio::test]
async fn test_waiter_takes_over_aborted_load() {
    let model = Arc::new(StubModel::default());
    let loader = ScriptedLoader::with_delay(vec![local()], model, Duration::from_millis(300));
    let manager = Arc::new(ModelManager::new(config(), loader.clone()));
    let mut status = manager.subscribe_status();

    let first = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.activate().await })
    };
    status
        .wait_for(|s| *s == BackendStatus::Loading)
        .await
        .unwrap();
    let waiter = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.activate().await })
    };
    tokio::task::yield_now().await;

    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());

    let settled = tokio::time::timeout(Duration::from_secs(3), waiter)
        .await
        .expect("waiter finishes")
        .unwrap();
    assert_eq!(settled, BackendStatus::NeuralReady);
    assert_eq!(loader.attempts(), vec![local(), local()]);
}

#[tokio::test]
async fn test_release_during_load_discards_handle() {
    let model = Arc::new(StubModel::default());
    let loader =
        ScriptedLoader::with_delay(vec![local()], model.clone(), Duration::from_millis(100));
    let manager = Arc::new(ModelManager::new(config(), loader));
    let mut status = manager.subscribe_status();

    let activating = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.activate().await })
    };
    status
        .wait_for(|s| *s == BackendStatus::Loading)
        .await
        .unwrap();
    manager.release();

    assert_eq!(activating.await.unwrap(), BackendStatus::Uninitialized);
    assert!(model.released.load(Ordering::SeqCst));
    assert_eq!(manager.status(), BackendStatus::Uninitialized);
    assert!(matches!(manager.active_backend(), ActiveBackend::Heuristic));

    assert_eq!(manager.activate().await, BackendStatus::NeuralReady);
    assert_eq!(manager.load_sequences(), 2);
}

// ============================================================================
// CLASS MAP
// ============================================================================

#[tokio::test]
async fn test_class_map_failure_does_not_block_readiness() {
    let model = Arc::new(StubModel::default());
    let source = Arc::new(CountingClassMapSource {
        fetches: AtomicUsize::new(0),
        fail: true,
    });
    let manager = ModelManager::new(config(), ScriptedLoader::new(vec![local()], model))
        .with_class_map_source(source.clone());

    assert_eq!(manager.activate().await, BackendStatus::NeuralReady);
    assert!(manager.ensure_class_map().await.is_none());
    assert!(manager.ensure_class_map().await.is_none());
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(manager.status(), BackendStatus::NeuralReady);
}

#[tokio::test]
async fn test_class_map_loaded_once() {
    let model = Arc::new(StubModel::default());
    let source = Arc::new(CountingClassMapSource {
        fetches: AtomicUsize::new(0),
        fail: false,
    });
    let manager = ModelManager::new(config(), ScriptedLoader::new(vec![local()], model))
        .with_class_map_source(source.clone());

    let map = manager.ensure_class_map().await.unwrap();
    assert_eq!(map.name(1), Some("Guitar"));
    manager.ensure_class_map().await;
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert!(manager.class_map().is_some());
}
