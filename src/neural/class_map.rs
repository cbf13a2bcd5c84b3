// Class map - model output index to canonical class name
//
// The reference file is the model's published class table:
//
//   index,mid,display_name
//   0,/m/09x0r,Speech
//   175,/m/0dwsp,"Marimba, xylophone"
//
// It is fetched once per process (see ModelManager) and is immutable after
// load. When it is absent, a small built-in table covering the instrument
// and singing classes stands in for it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use futures::future::BoxFuture;

use crate::error::ModelError;

/// Built-in (index, class name) pairs for instrument-relevant classes
///
/// Doubles as the instrument-index allow list for filtering.
pub static BUILTIN_INSTRUMENT_CLASSES: &[(usize, &str)] = &[
    (24, "Singing"),
    (25, "Choir"),
    (132, "Music"),
    (133, "Musical instrument"),
    (134, "Plucked string instrument"),
    (135, "Guitar"),
    (136, "Electric guitar"),
    (137, "Bass guitar"),
    (138, "Acoustic guitar"),
    (142, "Banjo"),
    (146, "Ukulele"),
    (147, "Keyboard (musical)"),
    (148, "Piano"),
    (149, "Electric piano"),
    (150, "Organ"),
    (153, "Synthesizer"),
    (156, "Percussion"),
    (157, "Drum kit"),
    (158, "Drum machine"),
    (159, "Drum"),
    (160, "Snare drum"),
    (163, "Bass drum"),
    (166, "Cymbal"),
    (167, "Hi-hat"),
    (175, "Marimba, xylophone"),
    (179, "Orchestra"),
    (180, "Brass instrument"),
    (182, "Trumpet"),
    (183, "Trombone"),
    (184, "Bowed string instrument"),
    (185, "String section"),
    (186, "Violin, fiddle"),
    (188, "Cello"),
    (189, "Double bass"),
    (190, "Wind instrument, woodwind instrument"),
    (191, "Flute"),
    (192, "Saxophone"),
    (193, "Clarinet"),
    (194, "Harp"),
];

/// Lowercase keywords marking a class name as instrument-relevant
pub static INSTRUMENT_KEYWORDS: &[&str] = &[
    "guitar", "bass", "piano", "keyboard", "organ", "synth", "string", "violin", "cello",
    "fiddle", "harp", "drum", "percussion", "cymbal", "hi-hat", "marimba", "flute",
    "saxophone", "clarinet", "trumpet", "trombone", "horn", "brass", "wind", "singing",
    "choir", "vocal", "orchestra", "music", "instrument",
];

/// Name of a class in the built-in table
pub fn builtin_class_name(index: usize) -> Option<&'static str> {
    BUILTIN_INSTRUMENT_CLASSES
        .iter()
        .find(|(i, _)| *i == index)
        .map(|(_, name)| *name)
}

/// Whether a class counts as an instrument for detection purposes
///
/// True when the resolved name contains an instrument keyword, or when the
/// index is in the built-in instrument table.
pub fn is_instrument_class(index: usize, name: Option<&str>) -> bool {
    let keyword_match = name
        .map(|name| {
            let lowered = name.to_lowercase();
            INSTRUMENT_KEYWORDS
                .iter()
                .any(|keyword| lowered.contains(keyword))
        })
        .unwrap_or(false);

    keyword_match || builtin_class_name(index).is_some()
}

/// Index → canonical class name table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap {
    names: BTreeMap<usize, String>,
}

impl ClassMap {
    /// Parse the line-oriented reference table
    ///
    /// The first line is a header and is skipped. Each following line is
    /// `index,mid,display_name`; the display name may be double-quoted and
    /// contain commas. Lines that do not start with an integer index are
    /// ignored.
    ///
    /// # Errors
    /// `ClassMapUnavailable` if no entry could be parsed
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let names: BTreeMap<usize, String> = text
            .lines()
            .skip(1)
            .filter_map(parse_line)
            .collect();

        if names.is_empty() {
            return Err(ModelError::ClassMapUnavailable {
                reason: "no class entries found".to_string(),
            });
        }

        Ok(Self { names })
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        Self {
            names: entries
                .into_iter()
                .map(|(index, name)| (index, name.into()))
                .collect(),
        }
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(|(index, name)| (*index, name.as_str()))
    }
}

/// Resolve a class name, preferring the loaded map over the built-in table
pub fn resolve_class_name(map: Option<&ClassMap>, index: usize) -> Option<String> {
    map.and_then(|map| map.name(index))
        .or_else(|| builtin_class_name(index))
        .map(str::to_string)
}

fn parse_line(line: &str) -> Option<(usize, String)> {
    let line = line.trim();
    let (index, rest) = line.split_once(',')?;
    let index = index.trim().parse::<usize>().ok()?;
    let (_mid, name) = rest.split_once(',')?;
    let name = unquote(name.trim());
    if name.is_empty() {
        return None;
    }
    Some((index, name))
}

fn unquote(field: &str) -> String {
    match field
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => field.to_string(),
    }
}

/// Fetchable class map reference
pub trait ClassMapSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<ClassMap, ModelError>>;

    /// Where the map comes from, for logs
    fn describe(&self) -> String;
}

/// Class map fetched over HTTP(S)
pub struct HttpClassMapSource {
    url: String,
    client: reqwest::Client,
}

impl HttpClassMapSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl ClassMapSource for HttpClassMapSource {
    fn fetch(&self) -> BoxFuture<'_, Result<ClassMap, ModelError>> {
        Box::pin(async move {
            let unavailable = |err: reqwest::Error| ModelError::ClassMapUnavailable {
                reason: err.to_string(),
            };
            let text = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(unavailable)?
                .error_for_status()
                .map_err(unavailable)?
                .text()
                .await
                .map_err(unavailable)?;
            ClassMap::parse(&text)
        })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Class map read from a local file
pub struct FileClassMapSource {
    path: PathBuf,
}

impl FileClassMapSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ClassMapSource for FileClassMapSource {
    fn fetch(&self) -> BoxFuture<'_, Result<ClassMap, ModelError>> {
        let path = self.path.clone();
        Box::pin(async move {
            let text = tokio::task::spawn_blocking(move || std::fs::read_to_string(path))
                .await
                .map_err(|err| ModelError::ClassMapUnavailable {
                    reason: err.to_string(),
                })?
                .map_err(|err| ModelError::ClassMapUnavailable {
                    reason: err.to_string(),
                })?;
            ClassMap::parse(&text)
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
