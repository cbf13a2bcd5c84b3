use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

use super::DetectionEngine;
use crate::managers::{BackendStatus, DetectionUpdate};
use crate::telemetry::MetricEvent;

impl DetectionEngine {
    // ========================================================================
    // CHANNEL SUBSCRIPTIONS
    // ========================================================================

    /// Display updates: `Some` per publish, `None` on stop
    ///
    /// `None` once the session has shut down.
    pub fn subscribe_detection(&self) -> Option<broadcast::Receiver<DetectionUpdate>> {
        self.broadcasts.subscribe_detection()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<BackendStatus> {
        self.model_manager.subscribe_status()
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<MetricEvent> {
        self.telemetry.collector().subscribe()
    }

    // ========================================================================
    // ASYNC STREAM ADAPTERS
    // ========================================================================

    /// Display updates as a stream; lagged updates are skipped
    pub fn detection_stream(&self) -> impl Stream<Item = DetectionUpdate> + Unpin {
        let receiver = self.subscribe_detection();
        futures::stream::iter(receiver)
            .flat_map(BroadcastStream::new)
            .filter_map(|update| futures::future::ready(update.ok()))
    }

    /// Backend transitions, starting with the current status
    pub fn status_stream(&self) -> impl Stream<Item = BackendStatus> + Unpin {
        WatchStream::new(self.subscribe_status())
    }

    pub fn telemetry_stream(&self) -> impl Stream<Item = MetricEvent> + Unpin {
        BroadcastStream::new(self.subscribe_telemetry())
            .filter_map(|event| futures::future::ready(event.ok()))
    }
}
