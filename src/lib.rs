// Timbre Detector Core - real-time instrument classification
// Periodic detection loop with a neural backend and a heuristic fallback

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod context;
pub mod display;
pub mod engine;
pub mod error;
pub mod managers;
pub mod neural;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{BackendKind, DetectionResult};
pub use config::AppConfig;
pub use context::{ClassifierState, DetectionContext};
pub use display::{DisplaySink, PromptFeed};
pub use engine::{DetectionController, DetectionEngine, EngineParts, TickOutcome};
pub use managers::{BackendStatus, ModelManager};

/// Install the tracing subscriber used by the binaries
///
/// `RUST_LOG` overrides `default_filter`. Safe to call more than once; only
/// the first call installs a subscriber.
pub fn init_logging(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    // Err means a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
