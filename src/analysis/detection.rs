// Detection records - ranked candidates and the published result

use serde::{Deserialize, Serialize};

use super::labels::LabelCatalog;

/// Maximum number of secondary labels carried by a result
pub const MAX_ALTERNATIVES: usize = 3;

/// Which classifier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Neural,
    Heuristic,
}

/// One ranked classifier output: canonical English class name + score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub class_name: String,
    pub score: f32,
}

impl Candidate {
    pub fn new(class_name: impl Into<String>, score: f32) -> Self {
        Self {
            class_name: class_name.into(),
            score,
        }
    }
}

/// Secondary (label, score) pair shown next to the primary label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub label: String,
    pub tag: String,
    pub score: f32,
}

/// Published detection
///
/// Replaced wholesale on every tick that publishes; never merged with the
/// previous result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Localized display name
    pub label: String,
    /// Canonical English tag for prompt use
    pub tag: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Up to three alternatives, descending by score
    pub alternatives: Vec<Alternative>,
    pub backend: BackendKind,
}

impl DetectionResult {
    /// Build a result from candidates already ranked by descending score
    ///
    /// Returns `None` for an empty candidate list.
    pub fn from_ranked(
        ranked: &[Candidate],
        catalog: &LabelCatalog,
        backend: BackendKind,
    ) -> Option<Self> {
        let (primary, rest) = ranked.split_first()?;
        let (label, tag) = catalog.resolve(&primary.class_name);

        let alternatives = rest
            .iter()
            .take(MAX_ALTERNATIVES)
            .map(|candidate| {
                let (label, tag) = catalog.resolve(&candidate.class_name);
                Alternative {
                    label,
                    tag,
                    score: candidate.score.clamp(0.0, 1.0),
                }
            })
            .collect();

        Some(Self {
            label,
            tag,
            confidence: primary.score.clamp(0.0, 1.0),
            alternatives,
            backend,
        })
    }
}
