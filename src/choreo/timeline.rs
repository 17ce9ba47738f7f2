use std::sync::Arc;

use image::RgbaImage;
use rand_pcg::Pcg32;

use crate::audio::AudioFeatureSample;
use crate::frames::FrameSet;

use super::{ChoreoError, ChoreographyConfig, StepContext, StyleState};

/// A fully materialized choreography: one combined frame index per output
/// tick, plus everything needed to resolve those indices to pixels.
#[derive(Clone, Debug)]
pub struct FrameTimeline {
    frame_indices: Vec<usize>,
    fps: u32,
    duration: f32,
    frames: Arc<FrameSet>,
}

impl FrameTimeline {
    pub fn len(&self) -> usize {
        self.frame_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_indices.is_empty()
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn frame_set(&self) -> &FrameSet {
        &self.frames
    }

    pub fn indices(&self) -> &[usize] {
        &self.frame_indices
    }

    /// Image shown at an output tick.
    pub fn frame(&self, tick: usize) -> &RgbaImage {
        self.frames.frame(self.frame_indices[tick])
    }

    /// Map a playback position in seconds to a tick, clamped to the end.
    pub fn index_at_position(&self, position: f32) -> usize {
        if self.frame_indices.is_empty() {
            return 0;
        }
        ((position.max(0.0) * self.fps as f32) as usize).min(self.frame_indices.len() - 1)
    }
}

/// Run the configured style over the feature sequence and produce the
/// complete timeline. Continuity state starts from zeros on every call.
pub fn generate_timeline(
    features: &[AudioFeatureSample],
    frames: Arc<FrameSet>,
    cfg: &ChoreographyConfig,
    rng: &mut Pcg32,
) -> Result<FrameTimeline, ChoreoError> {
    if cfg.fps == 0 {
        return Err(ChoreoError::InvalidConfig("fps must be positive".into()));
    }
    if !cfg.duration.is_finite() || cfg.duration <= 0.0 {
        return Err(ChoreoError::InvalidConfig(format!(
            "duration must be positive, got {}",
            cfg.duration
        )));
    }
    if features.is_empty() {
        return Err(ChoreoError::InsufficientAudioData);
    }
    if frames.total() == 0 {
        return Err(ChoreoError::EmptyFrameSet);
    }

    let intensity = cfg.intensity.clamp(0.0, 1.0);
    let ticks = (cfg.duration * cfg.fps as f32).ceil() as usize;
    let policy = cfg.style.policy();

    log::debug!(
        "Generating {:?} timeline: {} ticks at {} fps over {:.1}s",
        cfg.style,
        ticks,
        cfg.fps,
        cfg.duration
    );

    let mut state = StyleState::default();
    let mut frame_indices = Vec::with_capacity(ticks);

    for tick in 0..ticks {
        let elapsed = tick as f32 / cfg.fps as f32;
        // Nearest feature sample by proportional position in the track
        let feature_index =
            ((elapsed / cfg.duration * features.len() as f32) as usize).min(features.len() - 1);

        let mut cx = StepContext {
            sample: features[feature_index],
            tick,
            elapsed,
            intensity,
            fps: cfg.fps,
            anchors: frames.anchor_count(),
            animated: frames.animated_count(),
            rng: &mut *rng,
        };
        let (index, next) = policy.choose(&mut cx, state);
        state = next;
        frame_indices.push(index);
    }

    Ok(FrameTimeline {
        frame_indices,
        fps: cfg.fps,
        duration: cfg.duration,
        frames,
    })
}
