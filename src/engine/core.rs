//! DetectionEngine: one detection session.
//!
//! Wires the session-scoped pieces together: telemetry hub, model manager,
//! detection context, broadcast channels and the loop controller. CLI
//! commands and embedders talk to this handle only.

use std::sync::Arc;

use crate::audio::AudioSource;
use crate::config::AppConfig;
use crate::context::{ClassifierState, DetectionContext};
use crate::display::{DisplaySink, PromptFeed, TracingDisplaySink};
use crate::engine::controller::{DetectionController, TickOutcome};
use crate::error::DetectionError;
use crate::managers::{BackendStatus, BroadcastChannelManager, ModelManager};
use crate::neural::{default_model_loader, ClassMapSource, HttpClassMapSource, ModelLoader};
use crate::telemetry::TelemetryHub;

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

/// Collaborators a session can be built with
///
/// Anything left `None` gets the default for this build.
#[derive(Default)]
pub struct EngineParts {
    pub loader: Option<Arc<dyn ModelLoader>>,
    pub class_map_source: Option<Arc<dyn ClassMapSource>>,
    pub display: Option<Arc<dyn DisplaySink>>,
    pub audio_source: Option<Arc<dyn AudioSource>>,
}

/// DetectionEngine orchestrates one detection session
pub struct DetectionEngine {
    config: AppConfig,
    telemetry: Arc<TelemetryHub>,
    model_manager: Arc<ModelManager>,
    context: Arc<DetectionContext>,
    pub(crate) broadcasts: Arc<BroadcastChannelManager>,
    controller: Arc<DetectionController>,
}

impl DetectionEngine {
    /// Create a session from the config file (or defaults)
    pub fn new() -> Self {
        Self::from_config(AppConfig::load())
    }

    pub fn from_config(config: AppConfig) -> Self {
        Self::with_parts(config, EngineParts::default())
    }

    /// Create a session with injected collaborators
    pub fn with_parts(config: AppConfig, parts: EngineParts) -> Self {
        let telemetry = Arc::new(TelemetryHub::default());

        let loader = parts
            .loader
            .unwrap_or_else(|| default_model_loader(&config.model));
        let class_map_source = parts.class_map_source.or_else(|| {
            config
                .model
                .class_map_url
                .clone()
                .map(|url| Arc::new(HttpClassMapSource::new(url)) as Arc<dyn ClassMapSource>)
        });

        let mut model_manager = ModelManager::new(config.model.clone(), loader)
            .with_telemetry(Arc::clone(&telemetry));
        if let Some(source) = class_map_source {
            model_manager = model_manager.with_class_map_source(source);
        }
        let model_manager = Arc::new(model_manager);

        let context = Arc::new(DetectionContext::new(
            Arc::clone(&model_manager),
            &config.detection,
        ));

        let broadcasts = Arc::new(BroadcastChannelManager::new());
        broadcasts.init_detection();

        let display = parts
            .display
            .unwrap_or_else(|| Arc::new(TracingDisplaySink) as Arc<dyn DisplaySink>);
        let controller = Arc::new(
            DetectionController::new(
                Arc::clone(&context),
                &config,
                display,
                Arc::clone(&telemetry),
            )
            .with_updates(Arc::clone(&broadcasts)),
        );

        if let Some(source) = parts.audio_source {
            if let Err(err) = controller.set_audio_source(Some(source)) {
                crate::error::log_detection_error(&err, "with_parts");
            }
        }

        Self {
            config,
            telemetry,
            model_manager,
            context,
            broadcasts,
            controller,
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<TelemetryHub> {
        &self.telemetry
    }

    pub fn model_manager(&self) -> &Arc<ModelManager> {
        &self.model_manager
    }

    pub fn context(&self) -> &Arc<DetectionContext> {
        &self.context
    }

    pub fn controller(&self) -> &Arc<DetectionController> {
        &self.controller
    }

    pub fn backend_status(&self) -> BackendStatus {
        self.model_manager.status()
    }

    /// Current classifier state for status displays
    pub fn state(&self) -> Result<ClassifierState, DetectionError> {
        self.context.snapshot()
    }

    /// Pull-based English tag feed for prompt builders
    pub fn prompt_feed(&self) -> PromptFeed {
        PromptFeed::new(Arc::clone(&self.context))
    }

    pub fn set_prompt_feed_enabled(&self, enabled: bool) {
        self.context.set_prompt_feed_enabled(enabled);
    }

    pub fn set_audio_source(
        &self,
        source: Option<Arc<dyn AudioSource>>,
    ) -> Result<(), DetectionError> {
        self.controller.set_audio_source(source)
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Start the periodic detection loop
    ///
    /// # Returns
    /// `Ok(true)` if the loop was started by this call
    pub async fn start(&self) -> Result<bool, DetectionError> {
        self.controller.start().await
    }

    /// Start without the timer; drive ticks with [`Self::tick`]
    pub async fn start_manual(&self) -> Result<bool, DetectionError> {
        self.controller.start_manual().await
    }

    /// Run one tick now
    pub async fn tick(&self) -> TickOutcome {
        self.controller.run_tick().await
    }

    /// Stop the loop and clear the display; the model stays loaded
    pub fn stop(&self) -> bool {
        self.controller.stop()
    }

    /// Stop and release everything the session holds
    pub fn shutdown(&self) {
        self.controller.stop();
        self.model_manager.release();
        self.broadcasts.close_detection();
        tracing::info!("[DetectionEngine] Session shut down");
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new()
    }
}
