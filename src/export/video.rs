use std::path::PathBuf;

use image::RgbaImage;

use crate::audio::LoadedAudio;
use crate::choreo::FrameTimeline;
use crate::playback::CancelToken;
use crate::render::{compose_frame, TextOverlay};

use super::ffmpeg::FfmpegEncoder;
use super::{
    ffmpeg_available, output_dimensions, ExportError, ExportFormat, ExportOptions, ExportProgress,
    ExportStage,
};

/// Drive the timeline through ffmpeg into a video container.
///
/// Stages run preparing -> rendering -> encoding -> complete; a failure at
/// any point reports the failed stage and removes the partial output file,
/// so a retry starts clean from preparing.
pub fn export_video(
    timeline: &FrameTimeline,
    audio: Option<&LoadedAudio>,
    overlay: Option<&TextOverlay>,
    opts: &ExportOptions,
    on_progress: impl Fn(ExportProgress),
    token: &CancelToken,
) -> Result<PathBuf, ExportError> {
    match run_export(timeline, audio, overlay, opts, &on_progress, token) {
        Ok(path) => Ok(path),
        Err(err) => {
            // Never leave a partial artifact behind.
            let _ = std::fs::remove_file(&opts.output);
            report(&on_progress, ExportStage::Failed, 0.0, None, None, &err.to_string());
            Err(err)
        }
    }
}

fn run_export(
    timeline: &FrameTimeline,
    audio: Option<&LoadedAudio>,
    overlay: Option<&TextOverlay>,
    opts: &ExportOptions,
    on_progress: &impl Fn(ExportProgress),
    token: &CancelToken,
) -> Result<PathBuf, ExportError> {
    report(
        on_progress,
        ExportStage::Preparing,
        0.0,
        None,
        None,
        "Preparing export",
    );

    if token.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    if opts.format == ExportFormat::Gif {
        return Err(ExportError::UnsupportedFormat(
            "gif goes through the gif encoder, not ffmpeg".into(),
        ));
    }
    if !ffmpeg_available() {
        return Err(ExportError::EncoderUnavailable(opts.format.extension()));
    }

    let frames = timeline.frame_set();
    if let Some(&bad) = timeline.indices().iter().find(|&&i| i >= frames.total()) {
        return Err(ExportError::BadTimeline {
            index: bad,
            available: frames.total(),
        });
    }
    if timeline.is_empty() {
        return Err(ExportError::Stage {
            stage: ExportStage::Preparing,
            reason: "timeline has no frames".into(),
        });
    }

    let (width, height) = output_dimensions(timeline.frame(0).dimensions(), opts.quality);

    let audio_path = if opts.include_audio {
        let path = audio.and_then(|a| a.metadata.path.as_deref());
        if path.is_none() {
            log::warn!("Audio muxing requested but the source has no file path; exporting silent");
        }
        path
    } else {
        None
    };

    let fps = opts.fps.max(1);
    let mut encoder = FfmpegEncoder::new(
        &opts.output,
        audio_path,
        width,
        height,
        fps,
        opts.format,
        opts.quality.bitrate(),
    )
    .map_err(|e| ExportError::Stage {
        stage: ExportStage::Preparing,
        reason: format!("{e:#}"),
    })?;

    let total = timeline.len();
    for tick in 0..total {
        if token.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let mut composed = compose_frame(timeline.frame(tick), width, height);
        if let (Some(overlay), Some(title)) = (overlay, opts.title.as_deref()) {
            draw_title(overlay, &mut composed, title);
        }

        encoder
            .write_frame(composed.as_raw())
            .map_err(|e| ExportError::Stage {
                stage: ExportStage::Rendering,
                reason: format!("{e:#}"),
            })?;

        report(
            on_progress,
            ExportStage::Rendering,
            (tick + 1) as f32 / total as f32 * 0.9,
            Some(tick + 1),
            Some(total),
            &format!("Rendering frame {}/{}", tick + 1, total),
        );
    }

    report(
        on_progress,
        ExportStage::Encoding,
        0.95,
        Some(total),
        Some(total),
        "Finalizing container",
    );

    encoder.finish().map_err(|e| ExportError::Stage {
        stage: ExportStage::Encoding,
        reason: format!("{e:#}"),
    })?;

    report(
        on_progress,
        ExportStage::Complete,
        1.0,
        Some(total),
        Some(total),
        "Export complete",
    );

    Ok(opts.output.clone())
}

/// Centered near the bottom edge with a margin of one line height.
fn draw_title(overlay: &TextOverlay, image: &mut RgbaImage, title: &str) {
    let text_width = overlay.measure_width(title);
    let x = image.width().saturating_sub(text_width) / 2;
    let y = image
        .height()
        .saturating_sub(overlay.font_size() as u32 * 2);
    overlay.composite(image, title, x, y, [255, 255, 255, 230]);
}

fn report(
    on_progress: &impl Fn(ExportProgress),
    stage: ExportStage,
    progress: f32,
    current_frame: Option<usize>,
    total_frames: Option<usize>,
    message: &str,
) {
    on_progress(ExportProgress {
        stage,
        progress,
        current_frame,
        total_frames,
        message: message.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::super::ExportQuality;
    use super::*;
    use crate::audio::AudioFeatureSample;
    use crate::choreo::{generate_timeline, ChoreoStyle, ChoreographyConfig};
    use crate::frames::FrameSet;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::cell::RefCell;
    use std::sync::Arc;

    fn tiny_timeline() -> FrameTimeline {
        let img = || RgbaImage::new(2, 2);
        let frames = Arc::new(FrameSet::new(vec![img()], vec![img(), img()]));
        let features: Vec<AudioFeatureSample> = (0..10)
            .map(|i| AudioFeatureSample {
                time: i as f32 / 10.0,
                bass: 0.5,
                mid: 0.5,
                high: 0.5,
                low_mid: 0.5,
                rms: 0.5,
                beat: i % 3 == 0,
                bpm: 120,
            })
            .collect();
        let mut rng = Pcg32::seed_from_u64(0);
        generate_timeline(
            &features,
            frames,
            &ChoreographyConfig {
                style: ChoreoStyle::Wave,
                intensity: 0.5,
                fps: 5,
                duration: 1.0,
            },
            &mut rng,
        )
        .unwrap()
    }

    fn opts(format: ExportFormat, output: PathBuf) -> ExportOptions {
        ExportOptions {
            format,
            quality: ExportQuality::Low,
            fps: 5,
            include_audio: false,
            output,
            title: None,
        }
    }

    #[test]
    fn gif_format_is_rejected_by_the_video_path() {
        let timeline = tiny_timeline();
        let dir = tempfile::tempdir().unwrap();
        let err = export_video(
            &timeline,
            None,
            None,
            &opts(ExportFormat::Gif, dir.path().join("out.gif")),
            |_| {},
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(_)));
    }

    #[test]
    fn cancelled_token_stops_before_any_work() {
        let timeline = tiny_timeline();
        let dir = tempfile::tempdir().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let err = export_video(
            &timeline,
            None,
            None,
            &opts(ExportFormat::Mp4, dir.path().join("out.mp4")),
            |_| {},
            &token,
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::Cancelled));
        assert!(!dir.path().join("out.mp4").exists());
    }

    #[test]
    fn failures_remove_partial_output_and_report_failed() {
        let timeline = tiny_timeline();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.gif");
        // Simulate a partial artifact from the failed run.
        std::fs::write(&output, b"partial").unwrap();

        let stages = RefCell::new(Vec::new());
        let result = export_video(
            &timeline,
            None,
            None,
            &opts(ExportFormat::Gif, output.clone()),
            |p| stages.borrow_mut().push(p.stage),
            &CancelToken::new(),
        );

        assert!(result.is_err());
        assert!(!output.exists());
        assert_eq!(
            stages.into_inner(),
            vec![ExportStage::Preparing, ExportStage::Failed]
        );
    }
}
