// ONNX backend - ONNX Runtime session behind InferenceModel
//
// Sessions are created with one intra-op thread; inference already runs on
// a tokio blocking thread and the detection cadence is slow. Remote mirrors
// are downloaded into memory with reqwest and committed from bytes, so no
// model cache is written to disk.

use std::path::Path;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use ort::session::Session;
use ort::value::Tensor;

use super::{InferenceModel, ModelLocation, ModelLoader};
use crate::error::ModelError;

/// Loaded ONNX session
pub struct OnnxModel {
    session: Mutex<Option<Session>>,
    input_samples: usize,
    label: String,
}

impl OnnxModel {
    fn new(session: Session, input_samples: usize, label: String) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            input_samples,
            label,
        }
    }
}

impl InferenceModel for OnnxModel {
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>, ModelError> {
        if input.len() != self.input_samples {
            return Err(ModelError::InvalidInput {
                expected: self.input_samples,
                actual: input.len(),
            });
        }

        let failed = |reason: String| ModelError::InferenceFailed { reason };

        let mut guard = self
            .session
            .lock()
            .map_err(|_| failed("session lock poisoned".to_string()))?;
        let session = guard
            .as_mut()
            .ok_or_else(|| failed("session released".to_string()))?;

        let tensor = Tensor::from_array(([1usize, input.len()], input.to_vec()))
            .map_err(|e| failed(e.to_string()))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| failed(e.to_string()))?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| failed(e.to_string()))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        Ok(mean_over_frames(&dims, data))
    }

    fn release(&self) {
        if let Ok(mut guard) = self.session.lock() {
            if guard.take().is_some() {
                tracing::info!("[OnnxModel] Released session for {}", self.label);
            }
        }
    }

    fn describe(&self) -> String {
        format!("onnx:{}", self.label)
    }
}

/// Collapse a [frames, classes] score matrix into per-class means
///
/// Event models score overlapping patches; a window of exactly one patch
/// yields a single row and passes through unchanged.
fn mean_over_frames(dims: &[usize], data: &[f32]) -> Vec<f32> {
    match dims {
        [frames, classes] if *frames > 1 && frames * classes == data.len() => {
            let mut means = vec![0.0f32; *classes];
            for row in data.chunks(*classes) {
                for (mean, &score) in means.iter_mut().zip(row) {
                    *mean += score;
                }
            }
            let count = *frames as f32;
            means.iter_mut().for_each(|mean| *mean /= count);
            means
        }
        _ => data.to_vec(),
    }
}

enum ModelBytes<'a> {
    File(&'a Path),
    Memory(Vec<u8>),
}

fn build_session(source: ModelBytes<'_>) -> Result<Session, String> {
    let builder = Session::builder()
        .map_err(|e| format!("Failed to create session builder: {e}"))?
        .with_intra_threads(1)
        .map_err(|e| format!("Failed to set intra threads: {e}"))?;

    match source {
        ModelBytes::File(path) => builder
            .commit_from_file(path)
            .map_err(|e| format!("Failed to load model: {e}")),
        ModelBytes::Memory(bytes) => builder
            .commit_from_memory(&bytes)
            .map_err(|e| format!("Failed to load model: {e}")),
    }
}

/// Loads ONNX models from disk or over HTTP(S)
pub struct OnnxModelLoader {
    client: reqwest::Client,
    input_samples: usize,
}

impl OnnxModelLoader {
    pub fn new() -> Self {
        Self::with_input_samples(crate::config::ModelConfig::default().input_samples)
    }

    pub fn with_input_samples(input_samples: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            input_samples,
        }
    }

    async fn load_local(&self, path: &Path) -> Result<Arc<dyn InferenceModel>, ModelError> {
        let local_failed = |reason: String| ModelError::LocalLoadFailed {
            path: path.display().to_string(),
            reason,
        };

        if !path.exists() {
            return Err(local_failed("file not found".to_string()));
        }

        let owned = path.to_path_buf();
        let session =
            tokio::task::spawn_blocking(move || build_session(ModelBytes::File(&owned)))
                .await
                .map_err(|e| local_failed(e.to_string()))?
                .map_err(local_failed)?;

        let model: Arc<dyn InferenceModel> = Arc::new(OnnxModel::new(
            session,
            self.input_samples,
            path.display().to_string(),
        ));
        Ok(model)
    }

    async fn load_remote(&self, url: &str) -> Result<Arc<dyn InferenceModel>, ModelError> {
        let remote_failed = |reason: String| ModelError::RemoteLoadFailed {
            url: url.to_string(),
            reason,
        };

        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| remote_failed(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| remote_failed(e.to_string()))?
            .to_vec();

        tracing::info!("[OnnxModelLoader] Downloaded {} bytes from {}", bytes.len(), url);

        let session = tokio::task::spawn_blocking(move || build_session(ModelBytes::Memory(bytes)))
            .await
            .map_err(|e| remote_failed(e.to_string()))?
            .map_err(remote_failed)?;

        let model: Arc<dyn InferenceModel> =
            Arc::new(OnnxModel::new(session, self.input_samples, url.to_string()));
        Ok(model)
    }
}

impl Default for OnnxModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load<'a>(
        &'a self,
        location: &'a ModelLocation,
    ) -> BoxFuture<'a, Result<Arc<dyn InferenceModel>, ModelError>> {
        Box::pin(async move {
            match location {
                ModelLocation::Local(path) => self.load_local(path).await,
                ModelLocation::Remote(url) => self.load_remote(url).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_over_frames() {
        let data = [0.2, 0.4, 0.6, 0.8];
        let means = mean_over_frames(&[2, 2], &data);
        assert!((means[0] - 0.4).abs() < 1e-6);
        assert!((means[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_single_row_passes_through() {
        let data = [0.1, 0.9, 0.3];
        assert_eq!(mean_over_frames(&[1, 3], &data), data.to_vec());
        assert_eq!(mean_over_frames(&[3], &data), data.to_vec());
    }

    #[tokio::test]
    async fn test_missing_local_file_fails() {
        let loader = OnnxModelLoader::new();
        let location = ModelLocation::Local("/nonexistent/yamnet.onnx".into());
        let result = loader.load(&location).await;
        assert!(matches!(result, Err(ModelError::LocalLoadFailed { .. })));
    }
}
