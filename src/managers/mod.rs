// Managers Module
//
// Focused managers owned by a detection session. Each handles one concern:
// - ModelManager: neural model acquisition, warm-up and heuristic fallback
// - BroadcastChannelManager: Tokio broadcast channel for detection updates

pub mod broadcast_manager;
pub mod model_manager;

pub use broadcast_manager::{BroadcastChannelManager, DetectionUpdate};
pub use model_manager::{ActiveBackend, BackendStatus, ModelManager};
