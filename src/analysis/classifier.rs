// Classifier - heuristic rule-based instrument classification
//
// This module maps a FeatureSet to ranked instrument candidates using a flat
// table of independent rules. Each rule is a pure predicate over feature
// thresholds paired with a fixed confidence weight. Every rule is evaluated
// for every frame, all matches become candidates, and the candidates are
// ranked by confidence (stable sort, so table order breaks ties).
//
// When nothing matches, a single low-confidence candidate is derived from
// coarse band dominance so the result is never empty.

use crate::analysis::detection::Candidate;
use crate::analysis::features::FeatureSet;

/// A single classification rule
#[derive(Clone, Copy)]
pub struct Rule {
    /// Identifier for logs and tests
    pub name: &'static str,
    /// Canonical English class name emitted on match
    pub class_name: &'static str,
    /// Fixed confidence weight (0.45-0.8)
    pub confidence: f32,
    pub predicate: fn(&FeatureSet) -> bool,
}

impl Rule {
    pub fn matches(&self, features: &FeatureSet) -> bool {
        (self.predicate)(features)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("confidence", &self.confidence)
            .finish()
    }
}

// Percussion: attack plus a characteristic band profile
fn bass_drum(f: &FeatureSet) -> bool {
    f.transient && f.bands.sub_bass >= 0.3
}

fn snare_drum(f: &FeatureSet) -> bool {
    f.transient && f.bands.mid + f.bands.high_mid >= 0.4 && f.flatness >= 0.3
}

fn cymbal(f: &FeatureSet) -> bool {
    f.transient && f.bands.high() >= 0.35
}

// Vocals: mid/high-mid dominance, harmonic, sustained
fn vocals(f: &FeatureSet) -> bool {
    !f.transient
        && f.bands.mid + f.bands.high_mid >= 0.5
        && f.harmonic_ratio >= 0.3
        && (800.0..3500.0).contains(&f.centroid)
}

fn sustained_strings(f: &FeatureSet) -> bool {
    !f.transient && f.harmonic_ratio >= 0.45 && f.bands.low_mid + f.bands.mid >= 0.3
}

fn violin(f: &FeatureSet) -> bool {
    sustained_strings(f) && f.centroid >= 1000.0
}

fn cello(f: &FeatureSet) -> bool {
    sustained_strings(f) && f.centroid < 1000.0
}

// Winds: harmonic, bright, no low end
fn winds(f: &FeatureSet) -> bool {
    !f.transient && f.harmonic_ratio >= 0.35 && f.centroid >= 1500.0 && f.bands.low() < 0.1
}

// Piano: struck and harmonically rich across several bands
fn piano(f: &FeatureSet) -> bool {
    f.transient && f.harmonic_ratio >= 0.4 && f.bands.active_bands(0.1) >= 3
}

fn guitar(f: &FeatureSet) -> bool {
    f.transient
        && (0.2..0.6).contains(&f.harmonic_ratio)
        && f.bands.low_mid + f.bands.mid >= 0.45
        && (200.0..2500.0).contains(&f.centroid)
}

fn bass(f: &FeatureSet) -> bool {
    !f.transient && f.bands.low() >= 0.5
}

fn synthesizer(f: &FeatureSet) -> bool {
    f.flatness >= 0.5
}

/// Built-in rule table, in evaluation order
pub static DEFAULT_RULES: &[Rule] = &[
    Rule {
        name: "bass_drum",
        class_name: "Bass drum",
        confidence: 0.8,
        predicate: bass_drum,
    },
    Rule {
        name: "snare_drum",
        class_name: "Snare drum",
        confidence: 0.7,
        predicate: snare_drum,
    },
    Rule {
        name: "cymbal",
        class_name: "Cymbal",
        confidence: 0.7,
        predicate: cymbal,
    },
    Rule {
        name: "vocals",
        class_name: "Singing",
        confidence: 0.65,
        predicate: vocals,
    },
    Rule {
        name: "violin",
        class_name: "Violin",
        confidence: 0.6,
        predicate: violin,
    },
    Rule {
        name: "cello",
        class_name: "Cello",
        confidence: 0.6,
        predicate: cello,
    },
    Rule {
        name: "winds",
        class_name: "Flute",
        confidence: 0.55,
        predicate: winds,
    },
    Rule {
        name: "piano",
        class_name: "Piano",
        confidence: 0.65,
        predicate: piano,
    },
    Rule {
        name: "guitar",
        class_name: "Guitar",
        confidence: 0.6,
        predicate: guitar,
    },
    Rule {
        name: "bass",
        class_name: "Bass guitar",
        confidence: 0.6,
        predicate: bass,
    },
    Rule {
        name: "synthesizer",
        class_name: "Synthesizer",
        confidence: 0.45,
        predicate: synthesizer,
    },
];

/// Classifier applies the rule table to a FeatureSet
pub struct HeuristicClassifier {
    rules: &'static [Rule],
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES)
    }

    /// Classifier over a custom rule table
    pub fn with_rules(rules: &'static [Rule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    /// Classify a feature set
    ///
    /// # Returns
    /// Candidates sorted by descending confidence; never empty
    pub fn classify(&self, features: &FeatureSet) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(features))
            .map(|rule| Candidate::new(rule.class_name, rule.confidence))
            .collect();

        if candidates.is_empty() {
            candidates.push(Self::fallback(features));
        }

        // Vec::sort_by is stable: equal confidences keep rule-table order
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::debug!(
            "[HeuristicClassifier] {} candidate(s), top={} ({:.2})",
            candidates.len(),
            candidates[0].class_name,
            candidates[0].score
        );

        candidates
    }

    /// Coarse band-dominance guess used when no rule matches
    fn fallback(features: &FeatureSet) -> Candidate {
        if features.bands.low() > 0.4 {
            Candidate::new("low frequency", 0.3)
        } else if features.bands.high() > 0.3 {
            Candidate::new("high frequency", 0.3)
        } else {
            Candidate::new("music", 0.25)
        }
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
