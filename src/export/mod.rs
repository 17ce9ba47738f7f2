mod ffmpeg;
mod gif;
mod sidecar;
mod video;

pub use ffmpeg::{ffmpeg_available, FfmpegEncoder};
pub use self::gif::export_gif;
pub use sidecar::{write_sidecar, SidecarMetadata};
pub use video::export_video;

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::LoadedAudio;
use crate::choreo::FrameTimeline;
use crate::playback::CancelToken;
use crate::render::TextOverlay;

/// Output container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Mp4,
    Webm,
    Gif,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Webm => "webm",
            ExportFormat::Gif => "gif",
        }
    }
}

/// Resolution and bitrate tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    Low,
    Medium,
    High,
}

impl ExportQuality {
    /// Longest output edge in pixels.
    pub fn max_dimension(&self) -> u32 {
        match self {
            ExportQuality::Low => 480,
            ExportQuality::Medium => 720,
            ExportQuality::High => 1080,
        }
    }

    /// Video bitrate handed to the encoder.
    pub fn bitrate(&self) -> &'static str {
        match self {
            ExportQuality::Low => "1M",
            ExportQuality::Medium => "2.5M",
            ExportQuality::High => "5M",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Encoding,
    Complete,
    Failed,
}

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub quality: ExportQuality,
    pub fps: u32,
    pub include_audio: bool,
    pub output: PathBuf,
    /// Caption burned into the frames when an overlay font is available
    pub title: Option<String>,
}

/// One progress report. A fresh instance per update; emitted, never stored.
#[derive(Clone, Debug)]
pub struct ExportProgress {
    pub stage: ExportStage,
    pub progress: f32,
    pub current_frame: Option<usize>,
    pub total_frames: Option<usize>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("ffmpeg not found on PATH; install it to export {0} video")]
    EncoderUnavailable(&'static str),
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error("export failed while {stage:?}: {reason}")]
    Stage { stage: ExportStage, reason: String },
    #[error("timeline index {index} outside frame set of {available}")]
    BadTimeline { index: usize, available: usize },
    #[error("export cancelled")]
    Cancelled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Output dimensions for a source frame at a quality tier: the longest edge
/// lands on the tier's preset, aspect preserved, both sides even so yuv420p
/// subsampling works.
pub fn output_dimensions(frame: (u32, u32), quality: ExportQuality) -> (u32, u32) {
    let (w, h) = (frame.0.max(1), frame.1.max(1));
    let scale = quality.max_dimension() as f32 / w.max(h) as f32;
    let even = |v: f32| ((v.round() as u32).max(2) + 1) & !1;
    (even(w as f32 * scale), even(h as f32 * scale))
}

/// Route the timeline to the container-appropriate encoder.
pub fn export_timeline(
    timeline: &FrameTimeline,
    audio: Option<&LoadedAudio>,
    overlay: Option<&TextOverlay>,
    opts: &ExportOptions,
    on_progress: impl Fn(ExportProgress),
    token: &CancelToken,
) -> Result<PathBuf, ExportError> {
    match opts.format {
        ExportFormat::Gif => export_gif(timeline, opts, on_progress, token),
        ExportFormat::Mp4 | ExportFormat::Webm => {
            export_video(timeline, audio, overlay, opts, on_progress, token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_frames_land_on_the_preset_edge() {
        assert_eq!(output_dimensions((321, 321), ExportQuality::Low), (480, 480));
        assert_eq!(
            output_dimensions((321, 321), ExportQuality::High),
            (1080, 1080)
        );
    }

    #[test]
    fn dimensions_preserve_aspect_and_stay_even() {
        let (w, h) = output_dimensions((1920, 1080), ExportQuality::Medium);
        assert_eq!(w, 720);
        assert_eq!(h, 406); // 405 rounded up to even
    }

    #[test]
    fn degenerate_frames_still_produce_valid_dimensions() {
        let (w, h) = output_dimensions((1, 1), ExportQuality::Low);
        assert!(w >= 2 && w % 2 == 0);
        assert!(h >= 2 && h % 2 == 0);
    }

    #[test]
    fn format_extensions_match_containers() {
        assert_eq!(ExportFormat::Mp4.extension(), "mp4");
        assert_eq!(ExportFormat::Webm.extension(), "webm");
        assert_eq!(ExportFormat::Gif.extension(), "gif");
    }
}
