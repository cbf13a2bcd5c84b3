// Neural module - pretrained audio-event model behind a narrow contract
//
// The network is an opaque classifier: a [1, input_samples] window in, one
// score per class out. Loading and inference sit behind two traits so the
// model manager and detection loop never see a concrete runtime:
//
// - ModelLoader: resolves a ModelLocation into a loaded InferenceModel
// - InferenceModel: synchronous predict + release on a loaded handle
//
// Concrete backends:
// - onnx: ONNX Runtime via `ort` (feature "onnx")
// - UnavailableModelLoader: reports BackendUnavailable for every location,
//   which sends the manager straight to the heuristic path

pub mod adapter;
pub mod class_map;
#[cfg(feature = "onnx")]
pub mod onnx;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::ModelConfig;
use crate::error::ModelError;

pub use adapter::NeuralClassifier;
pub use class_map::{
    is_instrument_class, ClassMap, ClassMapSource, FileClassMapSource, HttpClassMapSource,
};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxModel, OnnxModelLoader};

/// Loaded inference handle
///
/// `predict` is blocking and may be slow; callers run it on a blocking
/// thread. Implementations must tolerate concurrent calls.
pub trait InferenceModel: Send + Sync {
    /// Run one forward pass over `input` (exactly `input_len()` samples)
    ///
    /// # Returns
    /// One score per class, indexed by class index
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>, ModelError>;

    /// Free runtime resources; later `predict` calls fail
    fn release(&self);

    /// Short backend description for logs
    fn describe(&self) -> String {
        "model".to_string()
    }
}

/// Where a model can be loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLocation {
    Local(PathBuf),
    Remote(String),
}

impl fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelLocation::Local(path) => write!(f, "{}", path.display()),
            ModelLocation::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Resolves a location into a loaded model
pub trait ModelLoader: Send + Sync {
    fn load<'a>(
        &'a self,
        location: &'a ModelLocation,
    ) -> BoxFuture<'a, Result<Arc<dyn InferenceModel>, ModelError>>;
}

/// Loader used when no inference runtime is compiled in
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableModelLoader;

impl ModelLoader for UnavailableModelLoader {
    fn load<'a>(
        &'a self,
        _location: &'a ModelLocation,
    ) -> BoxFuture<'a, Result<Arc<dyn InferenceModel>, ModelError>> {
        Box::pin(async { Err(ModelError::BackendUnavailable) })
    }
}

/// Default loader for this build: ONNX when enabled, otherwise unavailable
pub fn default_model_loader(config: &ModelConfig) -> Arc<dyn ModelLoader> {
    #[cfg(feature = "onnx")]
    {
        Arc::new(OnnxModelLoader::with_input_samples(config.input_samples))
    }
    #[cfg(not(feature = "onnx"))]
    {
        let _ = config;
        Arc::new(UnavailableModelLoader)
    }
}
