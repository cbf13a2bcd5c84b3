//! Integration tests for the detection loop
//!
//! These tests run whole sessions through DetectionEngine with injected
//! collaborators:
//! - Start/stop lifecycle and display clearing
//! - Silence gating at the threshold boundary
//! - Per-tick heuristic fallback on inference errors
//! - Results finishing after stop being dropped
//! - Timer-driven ticks

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use timbre_detector::audio::BufferedAudioSource;
use timbre_detector::config::AppConfig;
use timbre_detector::error::ModelError;
use timbre_detector::neural::{InferenceModel, ModelLoader, ModelLocation, UnavailableModelLoader};
use timbre_detector::telemetry::MetricEvent;
use timbre_detector::{
    BackendKind, BackendStatus, DetectionEngine, DetectionResult, DisplaySink, EngineParts,
    TickOutcome,
};

// ============================================================================
// TEST DOUBLES
// ============================================================================

#[derive(Default)]
struct RecordingSink {
    updates: Mutex<Vec<Option<DetectionResult>>>,
}

impl RecordingSink {
    fn updates(&self) -> Vec<Option<DetectionResult>> {
        self.updates.lock().unwrap().clone()
    }
}

impl DisplaySink for RecordingSink {
    fn show(&self, result: Option<&DetectionResult>) {
        self.updates.lock().unwrap().push(result.cloned());
    }
}

/// Guitar-heavy scores; optionally slow or failing after warm-up
#[derive(Default)]
struct GuitarModel {
    calls: AtomicUsize,
    fail_after_warm_up: AtomicBool,
    speech_only: AtomicBool,
    delay_ms: u64,
}

impl InferenceModel for GuitarModel {
    fn predict(&self, _input: &[f32]) -> Result<Vec<f32>, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            return Ok(vec![0.0; 521]);
        }
        if self.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.delay_ms));
        }
        if self.fail_after_warm_up.load(Ordering::SeqCst) {
            return Err(ModelError::InferenceFailed {
                reason: "execution provider lost".to_string(),
            });
        }
        let mut scores = vec![0.0; 521];
        if self.speech_only.load(Ordering::SeqCst) {
            scores[0] = 0.9;
        } else {
            scores[135] = 0.7;
            scores[148] = 0.2;
        }
        Ok(scores)
    }

    fn release(&self) {}
}

struct FixedLoader(Arc<GuitarModel>);

impl ModelLoader for FixedLoader {
    fn load<'a>(
        &'a self,
        _location: &'a ModelLocation,
    ) -> BoxFuture<'a, Result<Arc<dyn InferenceModel>, ModelError>> {
        let model: Arc<dyn InferenceModel> = self.0.clone();
        Box::pin(async move { Ok(model) })
    }
}

struct Session {
    engine: DetectionEngine,
    source: Arc<BufferedAudioSource>,
    sink: Arc<RecordingSink>,
}

fn session(loader: Arc<dyn ModelLoader>, interval_ms: u64) -> Session {
    let mut config = AppConfig::default();
    config.model.class_map_url = None;
    config.detection.interval_ms = interval_ms;

    let source = Arc::new(BufferedAudioSource::with_window(16000, 1600, 512));
    let sink = Arc::new(RecordingSink::default());
    let engine = DetectionEngine::with_parts(
        config,
        EngineParts {
            loader: Some(loader),
            display: Some(sink.clone()),
            audio_source: Some(source.clone()),
            ..EngineParts::default()
        },
    );
    Session {
        engine,
        source,
        sink,
    }
}

fn heuristic_session() -> Session {
    session(Arc::new(UnavailableModelLoader), 1500)
}

/// Fill the window with a sine peaking at `amplitude`
fn play(source: &BufferedAudioSource, amplitude: f32) {
    let samples: Vec<f32> = (0..1600)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
        .collect();
    source.push(&samples);
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_start_twice_then_stop_twice() {
    let s = heuristic_session();
    play(&s.source, 0.5);

    assert!(s.engine.start().await.unwrap());
    assert!(!s.engine.start().await.unwrap(), "second start is a no-op");
    assert_eq!(s.engine.backend_status(), BackendStatus::HeuristicReady);

    assert!(s.engine.stop());
    assert!(!s.engine.stop(), "second stop is a no-op");
    assert_eq!(s.sink.updates(), vec![None]);
}

#[tokio::test]
async fn test_stop_clears_result_and_notifies_display() {
    let s = heuristic_session();
    play(&s.source, 0.5);
    s.engine.start_manual().await.unwrap();

    assert!(matches!(s.engine.tick().await, TickOutcome::Published(_)));
    assert!(s.engine.state().unwrap().last_result.is_some());

    s.engine.stop();
    let state = s.engine.state().unwrap();
    assert_eq!(state.last_result, None);
    assert!(!state.enabled);
    assert_eq!(s.sink.updates().last(), Some(&None));
}

#[tokio::test]
async fn test_missing_source_declines_to_start() {
    let s = heuristic_session();
    s.engine.set_audio_source(None).unwrap();

    assert!(!s.engine.start().await.unwrap());
    assert!(!s.engine.start().await.unwrap());
    assert!(!s.engine.controller().is_running());
    assert!(s.sink.updates().is_empty());
}

// ============================================================================
// TICKS
// ============================================================================

#[tokio::test]
async fn test_silence_threshold_boundary() {
    let s = heuristic_session();
    s.engine.start_manual().await.unwrap();

    play(&s.source, 0.009);
    assert!(matches!(s.engine.tick().await, TickOutcome::Silent { .. }));
    assert!(s.sink.updates().is_empty());

    play(&s.source, 0.011);
    assert!(matches!(s.engine.tick().await, TickOutcome::Published(_)));
    assert_eq!(s.sink.updates().len(), 1);
}

#[tokio::test]
async fn test_neural_session_publishes_neural_results() {
    let model = Arc::new(GuitarModel::default());
    let s = session(Arc::new(FixedLoader(model)), 1500);
    play(&s.source, 0.5);
    s.engine.start_manual().await.unwrap();
    assert_eq!(s.engine.backend_status(), BackendStatus::NeuralReady);

    let TickOutcome::Published(result) = s.engine.tick().await else {
        panic!("expected a published result");
    };
    assert_eq!(result.backend, BackendKind::Neural);
    assert_eq!(result.tag, "guitar");
    assert!((result.confidence - 0.7).abs() < 1e-6);
    assert_eq!(result.alternatives[0].tag, "piano");
}

#[tokio::test]
async fn test_inference_error_uses_heuristic_for_that_tick() {
    let model = Arc::new(GuitarModel::default());
    let s = session(Arc::new(FixedLoader(model.clone())), 1500);
    let mut telemetry = s.engine.subscribe_telemetry();
    play(&s.source, 0.5);
    s.engine.start_manual().await.unwrap();

    model.fail_after_warm_up.store(true, Ordering::SeqCst);
    let TickOutcome::Published(result) = s.engine.tick().await else {
        panic!("expected a heuristic result");
    };
    assert_eq!(result.backend, BackendKind::Heuristic);
    assert_eq!(s.engine.backend_status(), BackendStatus::NeuralReady);

    let mut saw_fallback = false;
    while let Ok(event) = telemetry.try_recv() {
        saw_fallback |= matches!(event, MetricEvent::InferenceFallback { .. });
    }
    assert!(saw_fallback);
}

#[tokio::test]
async fn test_empty_neural_result_leaves_display_unchanged() {
    let model = Arc::new(GuitarModel::default());
    let s = session(Arc::new(FixedLoader(model.clone())), 1500);
    play(&s.source, 0.5);
    s.engine.start_manual().await.unwrap();

    let TickOutcome::Published(first) = s.engine.tick().await else {
        panic!("expected a published result");
    };

    model.speech_only.store(true, Ordering::SeqCst);
    assert_eq!(s.engine.tick().await, TickOutcome::Empty);
    assert_eq!(s.engine.state().unwrap().last_result, Some(first.clone()));
    assert_eq!(s.sink.updates(), vec![Some(first)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_result_finishing_after_stop_is_dropped() {
    let model = Arc::new(GuitarModel {
        delay_ms: 200,
        ..GuitarModel::default()
    });
    let s = session(Arc::new(FixedLoader(model)), 1500);
    play(&s.source, 0.5);
    s.engine.start_manual().await.unwrap();

    let controller = Arc::clone(s.engine.controller());
    let in_flight = tokio::spawn(async move { controller.run_tick().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    s.engine.stop();

    assert_eq!(in_flight.await.unwrap(), TickOutcome::Disabled);
    assert_eq!(s.engine.state().unwrap().last_result, None);
    assert_eq!(s.sink.updates(), vec![None]);
}

#[tokio::test]
async fn test_timer_drives_ticks() {
    let s = session(Arc::new(UnavailableModelLoader), 50);
    let mut updates = s.engine.subscribe_detection().unwrap();
    play(&s.source, 0.5);
    s.engine.start().await.unwrap();

    for _ in 0..2 {
        let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
            .await
            .expect("tick within timeout")
            .unwrap();
        assert!(update.is_some());
    }

    s.engine.stop();
    let published = s.sink.updates().iter().filter(|u| u.is_some()).count();
    assert!(published >= 2);
}
