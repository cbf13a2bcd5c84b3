// Audio module - audio-source collaborators for the detection loop
//
// The loop never talks to a device directly. It pulls one AudioFrame per
// tick from an AudioSource:
// - BufferedAudioSource: rolling window fed by the caller
// - WavAudioSource: steps through a WAV file one tick hop per pull
// - CaptureAudioSource: live microphone via cpal + rtrb (feature "capture")
//
// PCM-only sources synthesize the byte spectrum with FftProcessor.

pub mod buffered;
#[cfg(feature = "capture")]
pub mod capture;
pub mod wav;

pub use buffered::BufferedAudioSource;
#[cfg(feature = "capture")]
pub use capture::{CaptureAudioSource, CaptureStream};
pub use wav::{read_wav, WavAudioSource};

use crate::analysis::AudioFrame;

/// Live audio exposed to the detection loop
pub trait AudioSource: Send + Sync {
    /// Capture sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Current time-domain window on the [-1, 1] scale (fixed size)
    fn time_domain(&self) -> Vec<f32>;

    /// Current byte spectrum, 0-255 per bin (fixed bin count)
    fn frequency_data(&self) -> Vec<u8>;

    /// One tick's frame
    ///
    /// Sources that advance per pull override this so both arrays describe
    /// the same moment.
    fn snapshot(&self) -> AudioFrame {
        AudioFrame::new(self.time_domain(), self.frequency_data(), self.sample_rate())
    }
}
