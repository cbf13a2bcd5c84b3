// CaptureAudioSource - live microphone input via cpal
//
// The cpal callback de-interleaves the first channel and pushes samples into
// a lock-free SPSC ring buffer. The detection loop side drains the ring into
// a rolling window whenever a frame is read, so the audio callback never
// takes a lock.
//
// The cpal stream itself is returned separately as CaptureStream: it is not
// Send on every platform and stays with the thread that opened it. Dropping
// it stops capture.

use std::sync::{Mutex, MutexGuard, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{AudioSource, BufferedAudioSource};
use crate::analysis::AudioFrame;
use crate::config::AudioConfig;
use crate::error::{log_audio_error, AudioError};

/// Seconds of audio the ring buffer can hold between reads
const RING_SECONDS: u32 = 4;

/// Running input stream; drop to stop capture
pub struct CaptureStream {
    _stream: cpal::Stream,
}

pub struct CaptureAudioSource {
    consumer: Mutex<rtrb::Consumer<f32>>,
    window: BufferedAudioSource,
}

impl CaptureAudioSource {
    /// Open the default input device and start capturing
    ///
    /// # Returns
    /// The running stream handle and the source reading from it
    ///
    /// # Errors
    /// - No default input device
    /// - Device config query, stream build or play failure
    /// - Non-f32 device sample format
    pub fn open(config: &AudioConfig) -> Result<(CaptureStream, Self), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;

        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to get default input config: {:?}", e),
            })?;

        let sample_rate = supported.sample_rate().0;
        let stream_config: cpal::StreamConfig = supported.clone().into();
        let channels_count = (stream_config.channels as usize).max(1);

        let (mut producer, consumer) =
            rtrb::RingBuffer::<f32>::new((sample_rate * RING_SECONDS) as usize);

        let err_fn = |err: cpal::StreamError| {
            let err = AudioError::StreamFailure {
                reason: format!("{}", err),
            };
            log_audio_error(&err, "capture_callback");
        };

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // De-interleave: take first channel; drop samples when full
                    for frame in data.chunks(channels_count) {
                        let sample = frame.first().copied().unwrap_or(0.0);
                        if producer.push(sample).is_err() {
                            break;
                        }
                    }
                },
                err_fn,
                None,
            ),
            other => {
                return Err(AudioError::StreamOpenFailed {
                    reason: format!("Unsupported input sample format {:?}", other),
                })
            }
        }
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        stream.play().map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Input start failed: {}", e),
        })?;

        tracing::info!(
            "[CaptureAudioSource] Capturing {} channel(s) at {} Hz",
            channels_count,
            sample_rate
        );

        let source = Self {
            consumer: Mutex::new(consumer),
            window: BufferedAudioSource::new(sample_rate, config),
        };
        Ok((CaptureStream { _stream: stream }, source))
    }

    /// Move everything the callback produced into the rolling window
    fn drain(&self) {
        let mut consumer = self.lock_consumer();
        let available = consumer.slots();
        if available == 0 {
            return;
        }
        let samples: Vec<f32> = std::iter::from_fn(|| consumer.pop().ok())
            .take(available)
            .collect();
        self.window.push(&samples);
    }

    fn lock_consumer(&self) -> MutexGuard<'_, rtrb::Consumer<f32>> {
        self.consumer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioSource for CaptureAudioSource {
    fn sample_rate(&self) -> u32 {
        self.window.sample_rate()
    }

    fn time_domain(&self) -> Vec<f32> {
        self.drain();
        self.window.time_domain()
    }

    fn frequency_data(&self) -> Vec<u8> {
        self.drain();
        self.window.frequency_data()
    }

    fn snapshot(&self) -> AudioFrame {
        self.drain();
        self.window.snapshot()
    }
}
