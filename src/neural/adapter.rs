// NeuralClassifier - adapter from AudioFrame to the pretrained model
//
// Per tick:
// 1. Resample the time-domain window to the model rate and fixed length
// 2. Run one forward pass on a blocking thread
// 3. Keep the top-k scores, then only the instrument-relevant classes
// 4. Resolve names through the class map (or the built-in table) and build
//    a DetectionResult
//
// An empty filtered list is not an error: the caller publishes nothing.

use std::sync::Arc;

use super::class_map::{is_instrument_class, resolve_class_name, ClassMap};
use super::InferenceModel;
use crate::analysis::{
    resample_linear, AudioFrame, BackendKind, Candidate, DetectionResult, LabelCatalog,
};
use crate::config::ModelConfig;
use crate::error::ModelError;

/// Neural path of the detection loop
#[derive(Clone)]
pub struct NeuralClassifier {
    model: Arc<dyn InferenceModel>,
    class_map: Option<Arc<ClassMap>>,
    catalog: &'static LabelCatalog,
    sample_rate: u32,
    input_samples: usize,
    top_k: usize,
}

impl NeuralClassifier {
    /// # Arguments
    /// * `model` - Loaded handle (owned by the ModelManager)
    /// * `class_map` - Loaded class map, if the one-time fetch succeeded
    /// * `config` - Model rate, input length and top-k
    pub fn new(
        model: Arc<dyn InferenceModel>,
        class_map: Option<Arc<ClassMap>>,
        config: &ModelConfig,
    ) -> Self {
        Self {
            model,
            class_map,
            catalog: LabelCatalog::shared(),
            sample_rate: config.sample_rate,
            input_samples: config.input_samples,
            top_k: config.top_k,
        }
    }

    /// Resample the frame to the model's fixed input window
    pub fn prepare_input(&self, frame: &AudioFrame) -> Vec<f32> {
        resample_linear(
            &frame.time_domain,
            frame.sample_rate,
            self.sample_rate,
            self.input_samples,
        )
    }

    /// Run inference and return instrument-relevant candidates, best first
    pub async fn rank(&self, frame: &AudioFrame) -> Result<Vec<Candidate>, ModelError> {
        let input = self.prepare_input(frame);
        let model = Arc::clone(&self.model);

        let scores = tokio::task::spawn_blocking(move || model.predict(&input))
            .await
            .map_err(|err| ModelError::InferenceFailed {
                reason: err.to_string(),
            })??;

        let class_map = self.class_map.as_deref();
        let candidates = top_k(&scores, self.top_k)
            .into_iter()
            .filter_map(|(index, score)| {
                let name = resolve_class_name(class_map, index);
                if is_instrument_class(index, name.as_deref()) {
                    name.map(|name| Candidate::new(name, score))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "[NeuralClassifier] {} of top {} classes are instruments",
            candidates.len(),
            self.top_k
        );

        Ok(candidates)
    }

    /// Classify one frame
    ///
    /// # Returns
    /// `Ok(None)` when no top-k class is instrument-relevant
    pub async fn classify(&self, frame: &AudioFrame) -> Result<Option<DetectionResult>, ModelError> {
        let candidates = self.rank(frame).await?;
        Ok(DetectionResult::from_ranked(
            &candidates,
            self.catalog,
            BackendKind::Neural,
        ))
    }
}

/// Indices and values of the `k` largest scores, descending
///
/// Equal scores keep ascending index order.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed.truncate(k);
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedScores {
        scores: Vec<f32>,
        last_input_len: Mutex<Option<usize>>,
    }

    impl FixedScores {
        fn new(pairs: &[(usize, f32)]) -> Self {
            let mut scores = vec![0.0; 521];
            for &(index, score) in pairs {
                scores[index] = score;
            }
            Self {
                scores,
                last_input_len: Mutex::new(None),
            }
        }
    }

    impl InferenceModel for FixedScores {
        fn predict(&self, input: &[f32]) -> Result<Vec<f32>, ModelError> {
            *self.last_input_len.lock().unwrap() = Some(input.len());
            Ok(self.scores.clone())
        }

        fn release(&self) {}
    }

    struct FailingModel;

    impl InferenceModel for FailingModel {
        fn predict(&self, _input: &[f32]) -> Result<Vec<f32>, ModelError> {
            Err(ModelError::InferenceFailed {
                reason: "session closed".to_string(),
            })
        }

        fn release(&self) {}
    }

    fn frame() -> AudioFrame {
        AudioFrame::new(vec![0.2; 48000], vec![0; 1024], 48000)
    }

    #[test]
    fn test_top_k_orders_and_truncates() {
        let scores = [0.1, 0.9, 0.3, 0.9, 0.05];
        assert_eq!(top_k(&scores, 3), vec![(1, 0.9), (3, 0.9), (2, 0.3)]);
        assert_eq!(top_k(&scores, 10).len(), 5);
    }

    #[tokio::test]
    async fn test_input_is_resampled_to_model_window() {
        let model = Arc::new(FixedScores::new(&[(148, 0.8)]));
        let classifier =
            NeuralClassifier::new(model.clone(), None, &ModelConfig::default());

        classifier.classify(&frame()).await.unwrap();
        assert_eq!(*model.last_input_len.lock().unwrap(), Some(15_600));
    }

    #[tokio::test]
    async fn test_non_instrument_classes_are_filtered() {
        // Speech (0) scores highest but is not an instrument
        let model = Arc::new(FixedScores::new(&[(0, 0.95), (148, 0.6), (135, 0.4)]));
        let classifier = NeuralClassifier::new(model, None, &ModelConfig::default());

        let result = classifier.classify(&frame()).await.unwrap().unwrap();
        assert_eq!(result.tag, "piano");
        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.backend, BackendKind::Neural);
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0].tag, "guitar");
    }

    #[tokio::test]
    async fn test_no_instrument_in_top_k_yields_none() {
        let model = Arc::new(FixedScores::new(&[
            (0, 0.9),
            (1, 0.8),
            (2, 0.7),
            (3, 0.6),
            (4, 0.5),
            (148, 0.4),
        ]));
        let classifier = NeuralClassifier::new(model, None, &ModelConfig::default());

        assert!(classifier.classify(&frame()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_loaded_class_map_names_are_used() {
        let model = Arc::new(FixedScores::new(&[(400, 0.7)]));
        let map = Arc::new(ClassMap::from_entries(vec![(400, "Electric guitar")]));
        let classifier = NeuralClassifier::new(model, Some(map), &ModelConfig::default());

        let result = classifier.classify(&frame()).await.unwrap().unwrap();
        assert_eq!(result.tag, "electric guitar");
    }

    #[tokio::test]
    async fn test_inference_error_is_returned() {
        let classifier =
            NeuralClassifier::new(Arc::new(FailingModel), None, &ModelConfig::default());
        let result = classifier.classify(&frame()).await;
        assert!(matches!(result, Err(ModelError::InferenceFailed { .. })));
    }
}
