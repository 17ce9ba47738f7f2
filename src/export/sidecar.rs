use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::choreo::ChoreoStyle;

use super::{ExportFormat, ExportQuality};

/// Reproducibility record written next to an exported animation.
///
/// Everything needed to regenerate the exact output is here: the input
/// knobs, the seed, and the resolved per-tick frame choices.
#[derive(Debug, Serialize)]
pub struct SidecarMetadata {
    pub tool_version: String,
    pub output: PathBuf,
    pub format: ExportFormat,
    pub quality: ExportQuality,
    pub fps: u32,
    pub duration: f32,
    pub style: ChoreoStyle,
    pub intensity: f32,
    pub seed: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub anchor_frames: usize,
    pub animated_frames: usize,
    pub stabilized: bool,
    pub average_bpm: u32,
    pub beat_times: Vec<f32>,
    pub frame_indices: Vec<usize>,
}

/// Write the metadata as pretty JSON beside the export, returning the
/// sidecar path (`out.mp4` gets `out.mp4.json`).
pub fn write_sidecar(meta: &SidecarMetadata) -> Result<PathBuf> {
    let path = sidecar_path(&meta.output);
    let json = serde_json::to_string_pretty(meta).context("Failed to serialize sidecar")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write sidecar {}", path.display()))?;
    Ok(path)
}

fn sidecar_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}
