// Label catalog - English class names to display labels
//
// Classifier outputs are canonical English class names ("Bass drum",
// "Acoustic guitar", "Marimba, xylophone"). The display shows a localized
// name and the prompt feed wants a short English tag. Lookup is a substring
// match over an ordered table, so more specific entries come first.

use once_cell::sync::Lazy;

/// One catalog entry: lowercase keyword, localized label, canonical tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelEntry {
    pub keyword: &'static str,
    pub localized: &'static str,
    pub tag: &'static str,
}

const fn entry(keyword: &'static str, localized: &'static str, tag: &'static str) -> LabelEntry {
    LabelEntry {
        keyword,
        localized,
        tag,
    }
}

static DEFAULT_ENTRIES: &[LabelEntry] = &[
    entry("bass drum", "バスドラム", "bass drum"),
    entry("snare drum", "スネアドラム", "snare drum"),
    entry("hi-hat", "ハイハット", "hi-hat"),
    entry("cymbal", "シンバル", "cymbal"),
    entry("drum kit", "ドラムセット", "drum kit"),
    entry("drum machine", "ドラムマシン", "drum machine"),
    entry("drum", "ドラム", "drum"),
    entry("percussion", "パーカッション", "percussion"),
    entry("double bass", "コントラバス", "double bass"),
    entry("bass guitar", "ベース", "bass guitar"),
    entry("electric guitar", "エレキギター", "electric guitar"),
    entry("acoustic guitar", "アコースティックギター", "acoustic guitar"),
    entry("guitar", "ギター", "guitar"),
    entry("electric piano", "エレクトリックピアノ", "electric piano"),
    entry("piano", "ピアノ", "piano"),
    entry("organ", "オルガン", "organ"),
    entry("synthesizer", "シンセサイザー", "synthesizer"),
    entry("violin", "バイオリン", "violin"),
    entry("cello", "チェロ", "cello"),
    entry("string", "弦楽器", "strings"),
    entry("flute", "フルート", "flute"),
    entry("saxophone", "サックス", "saxophone"),
    entry("clarinet", "クラリネット", "clarinet"),
    entry("trumpet", "トランペット", "trumpet"),
    entry("trombone", "トロンボーン", "trombone"),
    entry("brass", "金管楽器", "brass"),
    entry("wind instrument", "管楽器", "wind instrument"),
    entry("harp", "ハープ", "harp"),
    entry("singing", "歌声", "singing"),
    entry("choir", "合唱", "choir"),
    entry("vocal", "ボーカル", "vocals"),
    entry("low frequency", "低音域", "low frequency"),
    entry("high frequency", "高音域", "high frequency"),
    entry("bass", "低音", "bass"),
    entry("musical instrument", "楽器", "instrument"),
    entry("music", "音楽", "music"),
];

static DEFAULT_CATALOG: Lazy<LabelCatalog> = Lazy::new(|| LabelCatalog::new(DEFAULT_ENTRIES));

/// Ordered English -> localized lookup table
#[derive(Debug, Clone)]
pub struct LabelCatalog {
    entries: &'static [LabelEntry],
}

impl LabelCatalog {
    pub fn new(entries: &'static [LabelEntry]) -> Self {
        Self { entries }
    }

    /// Process-wide default catalog
    pub fn shared() -> &'static LabelCatalog {
        &DEFAULT_CATALOG
    }

    /// First entry whose keyword occurs in `class_name` (case-insensitive)
    pub fn lookup(&self, class_name: &str) -> Option<&LabelEntry> {
        let lowered = class_name.to_lowercase();
        self.entries
            .iter()
            .find(|entry| lowered.contains(entry.keyword))
    }

    /// Resolve (localized label, canonical English tag) for a class name
    ///
    /// Unknown names display as-is and are tagged with their slug.
    pub fn resolve(&self, class_name: &str) -> (String, String) {
        match self.lookup(class_name) {
            Some(entry) => (entry.localized.to_string(), entry.tag.to_string()),
            None => (class_name.to_string(), slug(class_name)),
        }
    }
}

/// Lowercase, alphanumeric words joined by single hyphens
pub fn slug(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_entries_win_over_generic() {
        let catalog = LabelCatalog::shared();
        assert_eq!(catalog.resolve("Bass drum").1, "bass drum");
        assert_eq!(catalog.resolve("Bass guitar").1, "bass guitar");
        assert_eq!(catalog.resolve("Double bass").1, "double bass");
        assert_eq!(catalog.resolve("Snare drum").1, "snare drum");
        assert_eq!(catalog.resolve("Drum").1, "drum");
    }

    #[test]
    fn test_substring_match_is_case_insensitive() {
        let catalog = LabelCatalog::shared();
        let (label, tag) = catalog.resolve("Electric GUITAR");
        assert_eq!(label, "エレキギター");
        assert_eq!(tag, "electric guitar");

        let (_, tag) = catalog.resolve("Plucked string instrument");
        assert_eq!(tag, "strings");
    }

    #[test]
    fn test_unknown_class_falls_back_to_slug() {
        let (label, tag) = LabelCatalog::shared().resolve("Marimba, xylophone");
        assert_eq!(label, "Marimba, xylophone");
        assert_eq!(tag, "marimba-xylophone");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("  Steel guitar, slide guitar "), "steel-guitar-slide-guitar");
        assert_eq!(slug("Tapping (guitar technique)"), "tapping-guitar-technique");
        assert_eq!(slug(""), "");
    }
}
