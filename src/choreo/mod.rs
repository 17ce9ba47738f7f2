mod styles;
mod timeline;

pub use timeline::{generate_timeline, FrameTimeline};

use clap::ValueEnum;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::AudioFeatureSample;

#[derive(Debug, Error)]
pub enum ChoreoError {
    #[error("audio analysis produced no feature samples")]
    InsufficientAudioData,
    #[error("frame set has no frames")]
    EmptyFrameSet,
    #[error("invalid choreography config: {0}")]
    InvalidConfig(String),
}

/// The seven choreography behaviors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChoreoStyle {
    /// Gentle anchor cycling, animated frames only on strong beats
    Chill,
    /// Bass-driven jumps with a mid-driven anchor sweep
    Bounce,
    /// Random animated flashes on beats and loud passages
    Strobe,
    /// Maximally static; brand-safe
    LogoSafe,
    /// Random jumps with probability scaled by loudness, holds otherwise
    Glitch,
    /// Expand/contract cadence locked to the tempo estimate
    Pulse,
    /// Continuous cycling whose speed follows loudness
    Wave,
}

impl ChoreoStyle {
    pub fn policy(&self) -> &'static dyn StylePolicy {
        match self {
            ChoreoStyle::Chill => &styles::Chill,
            ChoreoStyle::Bounce => &styles::Bounce,
            ChoreoStyle::Strobe => &styles::Strobe,
            ChoreoStyle::LogoSafe => &styles::LogoSafe,
            ChoreoStyle::Glitch => &styles::Glitch,
            ChoreoStyle::Pulse => &styles::Pulse,
            ChoreoStyle::Wave => &styles::Wave,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ChoreographyConfig {
    pub style: ChoreoStyle,
    /// Clamped to 0.0..=1.0 before any style sees it
    pub intensity: f32,
    pub fps: u32,
    pub duration: f32,
}

/// Continuity state threaded through a style's per-tick calls. Reset to
/// zeros at the start of every timeline generation, never shared across
/// generations.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StyleState {
    /// Phase accumulator in [0, 1)
    pub phase: f32,
    /// Last chosen index, for styles that hold
    pub held: usize,
}

/// Everything one tick's decision may look at.
pub struct StepContext<'a> {
    pub sample: AudioFeatureSample,
    pub tick: usize,
    /// Output time in seconds, tick / fps
    pub elapsed: f32,
    pub intensity: f32,
    pub fps: u32,
    pub anchors: usize,
    pub animated: usize,
    pub rng: &'a mut Pcg32,
}

impl StepContext<'_> {
    /// Anchor frame chosen proportionally by `t` in 0..1.
    pub fn anchor_at(&self, t: f32) -> usize {
        if self.anchors == 0 {
            return 0;
        }
        ((t * self.anchors as f32) as usize).min(self.anchors - 1)
    }

    /// Animated frame chosen proportionally by `t`, as a combined index.
    /// Falls back to anchors when no animated frames exist.
    pub fn animated_at(&self, t: f32) -> usize {
        if self.animated == 0 {
            return self.anchor_at(t);
        }
        self.anchors + ((t * self.animated as f32) as usize).min(self.animated - 1)
    }

    /// Any frame across the combined array, chosen proportionally by `t`.
    pub fn combined_at(&self, t: f32) -> usize {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        ((t * total as f32) as usize).min(total - 1)
    }

    /// First animated frame as a combined index; anchor 0 when none exist.
    pub fn first_animated(&self) -> usize {
        if self.animated == 0 {
            0
        } else {
            self.anchors
        }
    }

    /// Uniformly random animated frame, as a combined index.
    pub fn random_animated(&mut self) -> usize {
        if self.animated == 0 {
            return 0;
        }
        self.anchors + self.rng.gen_range(0..self.animated)
    }

    /// Uniformly random frame across the combined array.
    pub fn random_combined(&mut self) -> usize {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        self.rng.gen_range(0..total)
    }

    pub fn total(&self) -> usize {
        self.anchors + self.animated
    }
}

/// One choreography policy: a pure per-tick decision. The same context and
/// state always produce the same choice; randomness comes in only through
/// the context's seeded generator.
pub trait StylePolicy: Sync {
    fn choose(&self, cx: &mut StepContext, state: StyleState) -> (usize, StyleState);
}
