use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::choreo::ChoreoStyle;
use crate::export::{ExportFormat, ExportQuality};
use crate::frames::DEFAULT_CELL_MARGIN;

#[derive(Parser, Debug)]
#[command(name = "beatsheet", about = "Music-driven choreography for sprite-sheet animations")]
pub struct Cli {
    /// Config file (default: beatsheet.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Slice, analyze, choreograph and export a finished animation
    Render(RenderArgs),
    /// Play the track while rendering the animation in the terminal
    Preview(PreviewArgs),
    /// Run audio analysis alone and emit the feature sequence as JSON
    Analyze(AnalyzeArgs),
    /// Slice a sprite sheet into numbered frame images
    Slice(SliceArgs),
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Input audio file (WAV, MP3, OGG, M4A)
    pub audio: PathBuf,

    /// Sprite sheet image holding a square grid of frames
    pub sheet: PathBuf,

    /// Number of frames on the sheet (must be a perfect square)
    #[arg(long, default_value_t = 9)]
    pub frames: usize,

    /// How many leading frames are resting anchors
    #[arg(long, default_value_t = 3)]
    pub anchors: usize,

    /// Choreography style
    #[arg(long, value_enum, default_value_t = ChoreoStyle::Bounce)]
    pub style: ChoreoStyle,

    /// Movement intensity (0.0-1.0)
    #[arg(long, default_value_t = 0.5)]
    pub intensity: f32,

    /// Output frame rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Animation length in seconds (defaults to the audio length)
    #[arg(long)]
    pub duration: Option<f32>,

    /// Output container
    #[arg(long, value_enum, default_value_t = ExportFormat::Mp4)]
    pub format: ExportFormat,

    /// Resolution and bitrate tier
    #[arg(long, value_enum, default_value_t = ExportQuality::Medium)]
    pub quality: ExportQuality,

    /// Export silent video without the audio track
    #[arg(long)]
    pub no_audio: bool,

    /// Align frame content across the grid to remove jitter
    #[arg(long)]
    pub stabilize: bool,

    /// Pixels cropped from each cell edge
    #[arg(long, default_value_t = DEFAULT_CELL_MARGIN)]
    pub margin: u32,

    /// Seed for stochastic styles; the same seed reproduces the timeline
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Output file (defaults to the audio name with the format extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a JSON metadata sidecar next to the output
    #[arg(long)]
    pub sidecar: bool,

    /// Title text burned into the exported frames
    #[arg(long)]
    pub title: Option<String>,

    /// TTF/OTF font file for the title overlay
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Download the title font from a URL
    #[arg(long)]
    pub font_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Input audio file (WAV, MP3, OGG, M4A)
    pub audio: PathBuf,

    /// Sprite sheet image holding a square grid of frames
    pub sheet: PathBuf,

    /// Number of frames on the sheet (must be a perfect square)
    #[arg(long, default_value_t = 9)]
    pub frames: usize,

    /// How many leading frames are resting anchors
    #[arg(long, default_value_t = 3)]
    pub anchors: usize,

    /// Choreography style
    #[arg(long, value_enum, default_value_t = ChoreoStyle::Bounce)]
    pub style: ChoreoStyle,

    /// Movement intensity (0.0-1.0)
    #[arg(long, default_value_t = 0.5)]
    pub intensity: f32,

    /// Timeline frame rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Seed for stochastic styles
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Align frame content across the grid to remove jitter
    #[arg(long)]
    pub stabilize: bool,

    /// Pixels cropped from each cell edge
    #[arg(long, default_value_t = DEFAULT_CELL_MARGIN)]
    pub margin: u32,

    /// Terminal width of the preview in character cells
    #[arg(long, default_value_t = 80)]
    pub cols: u32,

    /// Screen refresh rate while previewing
    #[arg(long, default_value_t = 30)]
    pub refresh_hz: u32,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input audio file (WAV, MP3, OGG, M4A)
    pub audio: PathBuf,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Feature samples per second
    #[arg(long, default_value_t = 30)]
    pub rate: u32,
}

#[derive(Args, Debug)]
pub struct SliceArgs {
    /// Sprite sheet image holding a square grid of frames
    pub sheet: PathBuf,

    /// Number of frames on the sheet (must be a perfect square)
    #[arg(long, default_value_t = 9)]
    pub frames: usize,

    /// Pixels cropped from each cell edge
    #[arg(long, default_value_t = DEFAULT_CELL_MARGIN)]
    pub margin: u32,

    /// Align frame content across the grid to remove jitter
    #[arg(long)]
    pub stabilize: bool,

    /// Directory for the numbered frame images
    #[arg(long, default_value = "frames")]
    pub out_dir: PathBuf,
}
