// Display sink and prompt feed - consumers of published detections
//
// The detection loop hands every published result (and a `None` on stop)
// to a DisplaySink. The prompt feed is pull-based: downstream prompt
// builders ask for the current English tag and only get one when the user
// opted in and the detection is confident enough.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::analysis::DetectionResult;
use crate::context::DetectionContext;

/// Receives display updates from the detection loop
///
/// Called with the detection-state lock held; implementations must not
/// block.
pub trait DisplaySink: Send + Sync {
    /// `None` means "no detection" (loop stopped)
    fn show(&self, result: Option<&DetectionResult>);
}

/// Colour band for the confidence percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    Green,
    Yellow,
    Red,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence > 0.5 {
            ConfidenceBand::Green
        } else if confidence > 0.3 {
            ConfidenceBand::Yellow
        } else {
            ConfidenceBand::Red
        }
    }
}

/// Render-ready form of a detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub label: String,
    pub tag: String,
    pub percent: u32,
    pub band: ConfidenceBand,
    /// Alternatives joined as "label NN%, label NN%"
    pub alternatives: String,
}

fn percent(score: f32) -> u32 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u32
}

impl From<&DetectionResult> for DisplayRecord {
    fn from(result: &DetectionResult) -> Self {
        let alternatives = result
            .alternatives
            .iter()
            .map(|alt| format!("{} {}%", alt.label, percent(alt.score)))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            label: result.label.clone(),
            tag: result.tag.clone(),
            percent: percent(result.confidence),
            band: ConfidenceBand::from_confidence(result.confidence),
            alternatives,
        }
    }
}

impl fmt::Display for DisplayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}% [{:?}]", self.label, self.tag, self.percent, self.band)?;
        if !self.alternatives.is_empty() {
            write!(f, " | {}", self.alternatives)?;
        }
        Ok(())
    }
}

/// Display sink that writes updates to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDisplaySink;

impl DisplaySink for TracingDisplaySink {
    fn show(&self, result: Option<&DetectionResult>) {
        match result {
            Some(result) => {
                tracing::info!("[Display] {}", DisplayRecord::from(result));
            }
            None => tracing::info!("[Display] no detection"),
        }
    }
}

/// Pull-based access to the current label for prompt building
#[derive(Clone)]
pub struct PromptFeed {
    context: Arc<DetectionContext>,
}

impl PromptFeed {
    pub fn new(context: Arc<DetectionContext>) -> Self {
        Self { context }
    }

    /// Canonical English tag of the current detection
    ///
    /// # Returns
    /// `None` unless the feed is opted in, a result is present and its
    /// confidence reaches the gate
    pub fn current_label(&self) -> Option<String> {
        if !self.context.prompt_feed_enabled() {
            return None;
        }

        let gate = self.context.confidence_gate();
        self.context
            .last_result()
            .ok()
            .flatten()
            .filter(|result| result.confidence >= gate)
            .map(|result| result.tag)
    }
}
