use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::choreo::ChoreoStyle;
use crate::export::{ExportFormat, ExportQuality};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub choreo: ChoreoConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_format")]
    pub format: ExportFormat,
    #[serde(default = "default_quality")]
    pub quality: ExportQuality,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_analysis_rate")]
    pub analysis_rate_hz: u32,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChoreoConfig {
    #[serde(default = "default_style")]
    pub style: ChoreoStyle,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct OverlayConfig {
    pub font: Option<PathBuf>,
    pub font_url: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            format: default_format(),
            quality: default_quality(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            analysis_rate_hz: default_analysis_rate(),
            max_size_mb: default_max_size_mb(),
        }
    }
}

impl Default for ChoreoConfig {
    fn default() -> Self {
        Self {
            style: default_style(),
            intensity: default_intensity(),
            seed: 0,
        }
    }
}

fn default_fps() -> u32 { 30 }
fn default_format() -> ExportFormat { ExportFormat::Mp4 }
fn default_quality() -> ExportQuality { ExportQuality::Medium }
fn default_analysis_rate() -> u32 { 30 }
fn default_max_size_mb() -> u64 { 100 }
fn default_style() -> ChoreoStyle { ChoreoStyle::Bounce }
fn default_intensity() -> f32 { 0.5 }

/// Explicit --config path, or auto-detect beatsheet.toml / global config.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("beatsheet.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("beatsheet").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("beatsheet").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

/// A config file that exists but does not parse is an error, not a shrug;
/// silently ignoring a typo'd config makes runs irreproducible.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.output.fps, 30);
        assert_eq!(cfg.output.format, ExportFormat::Mp4);
        assert_eq!(cfg.choreo.style, ChoreoStyle::Bounce);
        assert_eq!(cfg.choreo.seed, 0);
        assert!(cfg.overlay.font.is_none());
    }

    #[test]
    fn partial_sections_keep_unset_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [output]
            fps = 24
            format = "webm"

            [choreo]
            style = "logo-safe"
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(cfg.output.fps, 24);
        assert_eq!(cfg.output.format, ExportFormat::Webm);
        assert_eq!(cfg.output.quality, ExportQuality::Medium);
        assert_eq!(cfg.choreo.style, ChoreoStyle::LogoSafe);
        assert_eq!(cfg.choreo.seed, 7);
        assert_eq!(cfg.audio.analysis_rate_hz, 30);
        assert_eq!(cfg.audio.max_size_mb, 100);
    }

    #[test]
    fn unknown_style_is_a_parse_error() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
            [choreo]
            style = "frantic"
            "#,
        );
        assert!(result.is_err());
    }
}
