// Spectral module - Frequency-domain feature extraction
//
// This module computes spectral features from normalized analyser magnitudes
// (byte bins divided by 255). Bin `i` sits at `i * bin_width` Hz where
// `bin_width = nyquist / bin_count`.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

use super::types::{Band, BandEnergies};

/// Floor applied to every magnitude before taking logarithms
const FLATNESS_EPSILON: f64 = 1e-10;

/// Fundamental search range in Hz
const FUNDAMENTAL_MIN_HZ: f32 = 80.0;
const FUNDAMENTAL_MAX_HZ: f32 = 1000.0;

/// Harmonic multiples inspected relative to the fundamental
const HARMONIC_MULTIPLES: std::ops::RangeInclusive<usize> = 2..=6;

/// Half-width of the local peak search around each expected harmonic
const HARMONIC_SEARCH_RADIUS: usize = 2;

/// Spectral feature computation functions
pub struct SpectralFeatures {
    bin_width: f32,
}

impl SpectralFeatures {
    /// Create a new spectral features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `bin_count` - Number of frequency bins covering 0..nyquist
    pub fn new(sample_rate: u32, bin_count: usize) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        Self {
            bin_width: nyquist / bin_count.max(1) as f32,
        }
    }

    pub fn bin_width(&self) -> f32 {
        self.bin_width
    }

    fn bin_frequency(&self, index: usize) -> f32 {
        index as f32 * self.bin_width
    }

    /// Partition spectral energy into named bands
    ///
    /// Each band accumulates the magnitude of the bins it contains and is
    /// divided by the total magnitude across all bins, including bins that
    /// fall outside every band. All bands are zero when the total is zero.
    pub fn compute_band_energies(&self, spectrum: &[f32]) -> BandEnergies {
        let mut bands = BandEnergies::default();
        let mut total = 0.0f32;

        for (i, &mag) in spectrum.iter().enumerate() {
            total += mag;
            if let Some(band) = Band::containing(self.bin_frequency(i)) {
                *bands.get_mut(band) += mag;
            }
        }

        if total <= 0.0 {
            return BandEnergies::default();
        }

        for band in Band::ALL {
            let share = bands.get(band) / total;
            *bands.get_mut(band) = share.clamp(0.0, 1.0);
        }
        bands
    }

    /// Compute spectral centroid (weighted mean frequency)
    ///
    /// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]|
    ///
    /// # Returns
    /// Spectral centroid in Hz, 0 for an empty spectrum
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f32 {
        let weighted_sum: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &mag)| self.bin_frequency(i) * mag)
            .sum();

        let magnitude_sum: f32 = spectrum.iter().sum();

        if magnitude_sum > 0.0 {
            (weighted_sum / magnitude_sum).max(0.0)
        } else {
            0.0
        }
    }

    /// Compute spectral flatness (tonality measure)
    ///
    /// Formula: flatness = geometric_mean(|X[i]|) / arithmetic_mean(|X[i]|)
    ///
    /// Every magnitude is floored at a small epsilon so silent bins pull the
    /// geometric mean towards zero instead of producing `ln(0)`.
    ///
    /// # Returns
    /// Spectral flatness (0.0 to 1.0), 0 when there is no energy
    pub fn compute_flatness(&self, spectrum: &[f32]) -> f32 {
        if spectrum.is_empty() {
            return 0.0;
        }

        let n = spectrum.len() as f64;
        let arithmetic_mean = spectrum.iter().map(|&m| m as f64).sum::<f64>() / n;
        if arithmetic_mean <= 0.0 {
            return 0.0;
        }

        let log_sum: f64 = spectrum
            .iter()
            .map(|&m| (m as f64).max(FLATNESS_EPSILON).ln())
            .sum();
        let geometric_mean = (log_sum / n).exp();

        ((geometric_mean / arithmetic_mean) as f32).clamp(0.0, 1.0)
    }

    /// Compute harmonic ratio relative to the strongest low-register bin
    ///
    /// The fundamental is the loudest bin between 80 Hz and 1 kHz. For each
    /// multiple 2x-6x that lies inside the spectrum, the local peak within
    /// ±2 bins of the expected position is taken; the mean of those peaks
    /// divided by the fundamental's magnitude is the ratio.
    ///
    /// # Arguments
    /// * `spectrum` - Normalized magnitudes
    /// * `fundamental_floor` - Minimum magnitude for the fundamental to count
    ///
    /// # Returns
    /// Harmonic ratio (0.0 to 1.0)
    pub fn compute_harmonic_ratio(&self, spectrum: &[f32], fundamental_floor: f32) -> f32 {
        let Some((f0_bin, f0_mag)) = self.find_fundamental(spectrum) else {
            return 0.0;
        };
        if f0_bin == 0 || f0_mag < fundamental_floor || f0_mag <= 0.0 {
            return 0.0;
        }

        let peaks: Vec<f32> = HARMONIC_MULTIPLES
            .map(|k| f0_bin * k)
            .filter(|&center| center < spectrum.len())
            .map(|center| {
                let lo = center.saturating_sub(HARMONIC_SEARCH_RADIUS);
                let hi = (center + HARMONIC_SEARCH_RADIUS).min(spectrum.len() - 1);
                spectrum[lo..=hi].iter().copied().fold(0.0f32, f32::max)
            })
            .collect();

        if peaks.is_empty() {
            return 0.0;
        }

        let mean_peak = peaks.iter().sum::<f32>() / peaks.len() as f32;
        (mean_peak / f0_mag).clamp(0.0, 1.0)
    }

    fn find_fundamental(&self, spectrum: &[f32]) -> Option<(usize, f32)> {
        spectrum
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let freq = self.bin_frequency(*i);
                (FUNDAMENTAL_MIN_HZ..=FUNDAMENTAL_MAX_HZ).contains(&freq)
            })
            .fold(None, |best: Option<(usize, f32)>, (i, &mag)| match best {
                Some((_, best_mag)) if best_mag >= mag => best,
                _ => Some((i, mag)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 44.1 kHz over 1024 bins (~21.5 Hz per bin)
    fn processor() -> SpectralFeatures {
        SpectralFeatures::new(44100, 1024)
    }

    #[test]
    fn test_uniform_spectrum_is_flat() {
        let spectrum = vec![0.5; 1024];
        let flatness = processor().compute_flatness(&spectrum);
        assert!(
            (flatness - 1.0).abs() < 1e-4,
            "uniform spectrum flatness should be ~1.0, got {}",
            flatness
        );
    }

    #[test]
    fn test_single_peak_is_tonal() {
        let mut spectrum = vec![0.0; 1024];
        spectrum[40] = 1.0;
        let flatness = processor().compute_flatness(&spectrum);
        assert!(flatness < 0.01, "single peak flatness {}", flatness);
    }

    #[test]
    fn test_flatness_zero_without_energy() {
        assert_eq!(processor().compute_flatness(&vec![0.0; 64]), 0.0);
        assert_eq!(processor().compute_flatness(&[]), 0.0);
    }

    #[test]
    fn test_centroid_tracks_peak() {
        let p = processor();
        let mut spectrum = vec![0.0; 1024];
        spectrum[100] = 1.0;
        let centroid = p.compute_centroid(&spectrum);
        assert!((centroid - 100.0 * p.bin_width()).abs() < 1e-3);
        assert_eq!(p.compute_centroid(&vec![0.0; 1024]), 0.0);
    }

    #[test]
    fn test_band_energies_are_normalized() {
        let p = processor();
        let spectrum: Vec<f32> = (0..1024).map(|i| (i % 7) as f32 / 7.0).collect();
        let bands = p.compute_band_energies(&spectrum);

        let sum: f32 = Band::ALL.iter().map(|&b| bands.get(b)).sum();
        assert!(sum <= 1.0 + 1e-5, "band sum {} exceeds 1", sum);
        for band in Band::ALL {
            let v = bands.get(band);
            assert!((0.0..=1.0).contains(&v), "{:?} = {}", band, v);
        }
    }

    #[test]
    fn test_sub_bass_bin_lands_in_sub_bass() {
        let p = processor();
        let mut spectrum = vec![0.0; 1024];
        // bin 2 = ~43 Hz
        spectrum[2] = 1.0;
        let bands = p.compute_band_energies(&spectrum);
        assert_eq!(bands.sub_bass, 1.0);
        assert_eq!(bands.bass, 0.0);
    }

    #[test]
    fn test_harmonic_ratio_for_harmonic_series() {
        let p = processor();
        let mut spectrum = vec![0.0; 1024];
        // fundamental at bin 10 (~215 Hz) with decaying harmonics
        spectrum[10] = 1.0;
        for k in 2..=6 {
            spectrum[10 * k] = 0.5;
        }
        let ratio = p.compute_harmonic_ratio(&spectrum, 0.1);
        assert!((ratio - 0.5).abs() < 1e-5, "ratio {}", ratio);
    }

    #[test]
    fn test_harmonic_ratio_tolerates_detuned_harmonics() {
        let p = processor();
        let mut spectrum = vec![0.0; 1024];
        spectrum[10] = 1.0;
        for k in 2..=6 {
            spectrum[10 * k + 2] = 0.8;
        }
        let ratio = p.compute_harmonic_ratio(&spectrum, 0.1);
        assert!((ratio - 0.8).abs() < 1e-5, "ratio {}", ratio);
    }

    #[test]
    fn test_harmonic_ratio_zero_below_floor() {
        let p = processor();
        let mut spectrum = vec![0.0; 1024];
        spectrum[10] = 0.05;
        spectrum[20] = 0.05;
        assert_eq!(p.compute_harmonic_ratio(&spectrum, 0.1), 0.0);
    }
}
