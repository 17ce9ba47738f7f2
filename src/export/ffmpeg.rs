use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};

use super::ExportFormat;

/// True when an ffmpeg binary is reachable on PATH.
pub fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok()
}

/// Codec triple (video, pixel format, audio) for a container, or None when
/// the format does not go through ffmpeg.
fn codecs_for(format: ExportFormat) -> Option<(&'static str, &'static str, &'static str)> {
    match format {
        ExportFormat::Mp4 => Some(("libx264", "yuv420p", "aac")),
        ExportFormat::Webm => Some(("libvpx-vp9", "yuv420p", "libopus")),
        ExportFormat::Gif => None,
    }
}

/// Argument list for one encode run. Split out so the audio and codec wiring
/// stays testable without spawning anything.
fn encoder_args(
    output: &Path,
    audio: Option<&Path>,
    width: u32,
    height: u32,
    fps: u32,
    codec: &str,
    pix_fmt: &str,
    audio_codec: &str,
    bitrate: &str,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-f".into(),
        "rawvideo".into(),
        "-pixel_format".into(),
        "rgba".into(),
        "-video_size".into(),
        format!("{width}x{height}"),
        "-framerate".into(),
        fps.to_string(),
        "-i".into(),
        "pipe:0".into(),
    ];

    if let Some(audio) = audio {
        args.extend(["-i".into(), audio.display().to_string()]);
    }

    args.extend([
        "-c:v".into(),
        codec.to_string(),
        "-pix_fmt".into(),
        pix_fmt.to_string(),
        "-b:v".into(),
        bitrate.to_string(),
    ]);

    if audio.is_some() {
        args.extend([
            "-c:a".into(),
            audio_codec.to_string(),
            "-b:a".into(),
            "192k".into(),
            "-shortest".into(),
        ]);
    } else {
        args.push("-an".into());
    }

    args.push(output.display().to_string());
    args
}

/// Streams raw RGBA frames into an ffmpeg child process over stdin.
pub struct FfmpegEncoder {
    child: Child,
}

impl FfmpegEncoder {
    pub fn new(
        output: &Path,
        audio: Option<&Path>,
        width: u32,
        height: u32,
        fps: u32,
        format: ExportFormat,
        bitrate: &str,
    ) -> Result<Self> {
        let (codec, pix_fmt, audio_codec) = codecs_for(format).with_context(|| {
            format!("{} is not an ffmpeg export format", format.extension())
        })?;

        let args = encoder_args(
            output,
            audio,
            width,
            height,
            fps,
            codec,
            pix_fmt,
            audio_codec,
            bitrate,
        );

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}, audio={}",
            width,
            height,
            fps,
            codec,
            audio.is_some()
        );

        Ok(Self { child })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let stdin = self
            .child
            .stdin
            .as_mut()
            .context("FFmpeg stdin not available")?;
        stdin
            .write_all(rgba_pixels)
            .context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let output = self
            .child
            .wait_with_output()
            .context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}
