// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::analysis::DetectionResult;

/// One display update: a new detection, or `None` when detection stops
pub type DetectionUpdate = Option<DetectionResult>;

/// Manages the detection broadcast channel
///
/// Single Responsibility: Broadcast channel lifecycle and subscription
///
/// The detection loop publishes every display update here as well as to its
/// display sink, so any number of consumers (CLI printer, prompt feed
/// bridge, tests) can follow along without the loop knowing about them.
///
/// # Channel Types
/// - Detection: `Some(result)` per published tick, `None` on stop
pub struct BroadcastChannelManager {
    detection: Mutex<Option<broadcast::Sender<DetectionUpdate>>>,
}

impl BroadcastChannelManager {
    /// Create a new BroadcastChannelManager with the channel uninitialized
    ///
    /// The channel must be explicitly initialized via `init_detection` before use.
    pub fn new() -> Self {
        Self {
            detection: Mutex::new(None),
        }
    }

    // ========================================================================
    // DETECTION CHANNEL
    // ========================================================================

    /// Initialize the detection broadcast channel
    ///
    /// Calling this again replaces the sender; existing receivers keep the
    /// old channel and see it close once its sender is dropped.
    ///
    /// # Returns
    /// `broadcast::Sender<DetectionUpdate>` - Sender for publishing updates
    ///
    /// # Notes
    /// - Buffer size: 32 messages (~48 seconds at the default tick period)
    /// - Old messages dropped if buffer fills (lagged subscribers)
    pub fn init_detection(&self) -> broadcast::Sender<DetectionUpdate> {
        let (tx, _) = broadcast::channel(32);
        *self.lock_detection() = Some(tx.clone());
        tx
    }

    /// Sender for the detection channel, if initialized
    pub fn detection_sender(&self) -> Option<broadcast::Sender<DetectionUpdate>> {
        self.lock_detection().clone()
    }

    /// Subscribe to detection updates
    ///
    /// # Returns
    /// `Option<broadcast::Receiver<DetectionUpdate>>` - Receiver or None if not initialized
    pub fn subscribe_detection(&self) -> Option<broadcast::Receiver<DetectionUpdate>> {
        self.lock_detection().as_ref().map(|tx| tx.subscribe())
    }

    /// Drop the sender; subscribers observe the channel closing
    pub fn close_detection(&self) {
        self.lock_detection().take();
    }

    fn lock_detection(&self) -> MutexGuard<'_, Option<broadcast::Sender<DetectionUpdate>>> {
        self.detection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new()
    }
}
