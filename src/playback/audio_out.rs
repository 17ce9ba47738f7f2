use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::LoadedAudio;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no audio output device found")]
    NoOutputDevice,
    #[error("failed to query audio output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Plays a decoded mono buffer through the default output device while
/// tracking how far playback has advanced through the source samples.
pub struct AudioPlayer {
    _stream: cpal::Stream,
    position: Arc<AtomicUsize>,
    total: usize,
    sample_rate: u32,
}

impl AudioPlayer {
    pub fn start(audio: &LoadedAudio) -> Result<AudioPlayer, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoOutputDevice)?;
        let config = device.default_output_config()?;

        log::debug!(
            "Audio out: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate().0
        );

        let out_rate = config.sample_rate().0.max(1);
        let channels = (config.channels() as usize).max(1);
        let samples: Arc<Vec<f32>> = Arc::new(audio.samples.clone());
        let src_rate = audio.sample_rate;
        let total = samples.len();

        let position = Arc::new(AtomicUsize::new(0));
        let position_cb = Arc::clone(&position);

        // Source samples consumed per output frame
        let step = src_rate as f64 / out_rate as f64;
        let mut cursor = 0f64;

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let idx = cursor as usize;
                    let value = if idx + 1 < samples.len() {
                        // Linear interpolation between neighboring samples
                        let frac = (cursor - idx as f64) as f32;
                        samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
                    } else if idx < samples.len() {
                        samples[idx]
                    } else {
                        0.0
                    };
                    for slot in frame.iter_mut() {
                        *slot = value;
                    }
                    cursor += step;
                }
                position_cb.store((cursor as usize).min(total), Ordering::Relaxed);
            },
            |err| log::error!("Audio stream error: {err}"),
            None,
        )?;

        stream.play()?;

        Ok(AudioPlayer {
            _stream: stream,
            position,
            total,
            sample_rate: src_rate,
        })
    }

    /// Playback position in seconds of source audio.
    pub fn position_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.position.load(Ordering::Relaxed) as f32 / self.sample_rate as f32
    }

    pub fn is_finished(&self) -> bool {
        self.position.load(Ordering::Relaxed) >= self.total
    }
}
