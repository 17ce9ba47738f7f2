use std::fs::File;
use std::path::PathBuf;

use gif::{Encoder, Frame, Repeat};

use crate::choreo::FrameTimeline;
use crate::playback::CancelToken;
use crate::render::compose_frame;

use super::{output_dimensions, ExportError, ExportOptions, ExportProgress, ExportStage};

/// Encode the timeline as a looping GIF.
///
/// GIF has no audio track; an `include_audio` request is honored by
/// logging a warning and producing the silent animation. Stages and the
/// partial-output cleanup mirror the video path.
pub fn export_gif(
    timeline: &FrameTimeline,
    opts: &ExportOptions,
    on_progress: impl Fn(ExportProgress),
    token: &CancelToken,
) -> Result<PathBuf, ExportError> {
    match run_gif(timeline, opts, &on_progress, token) {
        Ok(path) => Ok(path),
        Err(err) => {
            let _ = std::fs::remove_file(&opts.output);
            on_progress(ExportProgress {
                stage: ExportStage::Failed,
                progress: 0.0,
                current_frame: None,
                total_frames: None,
                message: err.to_string(),
            });
            Err(err)
        }
    }
}

fn run_gif(
    timeline: &FrameTimeline,
    opts: &ExportOptions,
    on_progress: &impl Fn(ExportProgress),
    token: &CancelToken,
) -> Result<PathBuf, ExportError> {
    on_progress(ExportProgress {
        stage: ExportStage::Preparing,
        progress: 0.0,
        current_frame: None,
        total_frames: None,
        message: "Preparing export".to_string(),
    });

    if token.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    if opts.include_audio {
        log::warn!("GIF output has no audio track; exporting silent animation");
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
    let fps = opts.fps.max(1);
    // GIF delays are in hundredths of a second and zero means "as fast
    // as the decoder likes", so floor at one tick.
    let delay = (100 / fps).max(1) as u16;

    let file = File::create(&opts.output)?;
    let mut encoder =
        Encoder::new(file, width as u16, height as u16, &[]).map_err(|e| ExportError::Stage {
            stage: ExportStage::Preparing,
            reason: e.to_string(),
        })?;
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| ExportError::Stage {
            stage: ExportStage::Preparing,
            reason: e.to_string(),
        })?;

    let total = timeline.len();
    for tick in 0..total {
        if token.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let composed = compose_frame(timeline.frame(tick), width, height);
        let mut buffer = composed.into_raw();
        let mut frame = Frame::from_rgba_speed(width as u16, height as u16, &mut buffer, 10);
        frame.delay = delay;
        encoder.write_frame(&frame).map_err(|e| ExportError::Stage {
            stage: ExportStage::Rendering,
            reason: e.to_string(),
        })?;

        on_progress(ExportProgress {
            stage: ExportStage::Rendering,
            progress: (tick + 1) as f32 / total as f32 * 0.9,
            current_frame: Some(tick + 1),
            total_frames: Some(total),
            message: format!("Rendering frame {}/{}", tick + 1, total),
        });
    }

    on_progress(ExportProgress {
        stage: ExportStage::Encoding,
        progress: 0.95,
        current_frame: Some(total),
        total_frames: Some(total),
        message: "Finalizing container".to_string(),
    });

    // Writes the trailer and hands the file back.
    encoder.into_inner().map_err(|e| ExportError::Stage {
        stage: ExportStage::Encoding,
        reason: e.to_string(),
    })?;

    on_progress(ExportProgress {
        stage: ExportStage::Complete,
        progress: 1.0,
        current_frame: Some(total),
        total_frames: Some(total),
        message: "Export complete".to_string(),
    });

    Ok(opts.output.clone())
}
