// Analysis module - signal-level side of instrument detection
//
// Everything in here is synchronous and pure: it turns one AudioFrame into
// ranked classification candidates and a DetectionResult. Scheduling, model
// state and publishing live in engine/ and managers/.
//
// Pipeline (heuristic path):
//   AudioFrame → FeatureExtractor → HeuristicClassifier → DetectionResult
//
// The neural path reuses `resample` and `detection` from here; see neural/.

pub mod classifier;
pub mod detection;
pub mod features;
pub mod frame;
pub mod labels;
pub mod resample;

pub use classifier::{HeuristicClassifier, Rule, DEFAULT_RULES};
pub use detection::{Alternative, BackendKind, Candidate, DetectionResult, MAX_ALTERNATIVES};
pub use features::{FeatureExtractor, FeatureSet, FftProcessor};
pub use frame::AudioFrame;
pub use labels::LabelCatalog;
pub use resample::resample_linear;
