// Types module - Data structures for instrument features
//
// This module defines the per-tick feature set shared by the heuristic
// classifier and diagnostics. Every value is derived once per detection
// tick and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Named frequency bands used for energy partitioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    SubBass,
    Bass,
    LowMid,
    Mid,
    HighMid,
    Presence,
    Brilliance,
}

impl Band {
    /// All bands in ascending frequency order
    pub const ALL: [Band; 7] = [
        Band::SubBass,
        Band::Bass,
        Band::LowMid,
        Band::Mid,
        Band::HighMid,
        Band::Presence,
        Band::Brilliance,
    ];

    /// Frequency range in Hz, lower bound inclusive, upper bound exclusive
    pub fn range_hz(self) -> (f32, f32) {
        match self {
            Band::SubBass => (20.0, 60.0),
            Band::Bass => (60.0, 250.0),
            Band::LowMid => (250.0, 500.0),
            Band::Mid => (500.0, 2000.0),
            Band::HighMid => (2000.0, 4000.0),
            Band::Presence => (4000.0, 6000.0),
            Band::Brilliance => (6000.0, 20000.0),
        }
    }

    /// Band containing `freq_hz`, if any
    pub fn containing(freq_hz: f32) -> Option<Band> {
        Band::ALL.iter().copied().find(|band| {
            let (lo, hi) = band.range_hz();
            freq_hz >= lo && freq_hz < hi
        })
    }
}

/// Sum-normalized energy per band
///
/// Each value is the band's share of total spectral energy, so every value
/// lies in [0, 1] and the sum never exceeds 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandEnergies {
    pub sub_bass: f32,
    pub bass: f32,
    pub low_mid: f32,
    pub mid: f32,
    pub high_mid: f32,
    pub presence: f32,
    pub brilliance: f32,
}

impl BandEnergies {
    pub fn get(&self, band: Band) -> f32 {
        match band {
            Band::SubBass => self.sub_bass,
            Band::Bass => self.bass,
            Band::LowMid => self.low_mid,
            Band::Mid => self.mid,
            Band::HighMid => self.high_mid,
            Band::Presence => self.presence,
            Band::Brilliance => self.brilliance,
        }
    }

    pub fn get_mut(&mut self, band: Band) -> &mut f32 {
        match band {
            Band::SubBass => &mut self.sub_bass,
            Band::Bass => &mut self.bass,
            Band::LowMid => &mut self.low_mid,
            Band::Mid => &mut self.mid,
            Band::HighMid => &mut self.high_mid,
            Band::Presence => &mut self.presence,
            Band::Brilliance => &mut self.brilliance,
        }
    }

    /// Sub-bass plus bass
    pub fn low(&self) -> f32 {
        self.sub_bass + self.bass
    }

    /// Presence plus brilliance
    pub fn high(&self) -> f32 {
        self.presence + self.brilliance
    }

    /// Number of bands holding at least `min_share` of the energy
    pub fn active_bands(&self, min_share: f32) -> usize {
        Band::ALL
            .iter()
            .filter(|&&band| self.get(band) >= min_share)
            .count()
    }
}

/// Features extracted from one audio frame
///
/// These features drive the heuristic instrument classifier. Each captures a
/// different property of the signal's timbre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Per-band share of total spectral energy
    pub bands: BandEnergies,

    /// Sharp attack in the time-domain frame
    pub transient: bool,

    /// Spectral centroid in Hz (energy-weighted mean frequency)
    ///
    /// Measures the "brightness" of the sound.
    pub centroid: f32,

    /// Spectral flatness (0.0 to 1.0, geometric/arithmetic mean ratio)
    ///
    /// 0.0 = pure tone, towards 1.0 = noise-like
    pub flatness: f32,

    /// Mean energy at harmonics 2x-6x relative to the fundamental (0.0 to 1.0)
    pub harmonic_ratio: f32,
}
