mod audio;
mod choreo;
mod cli;
mod config;
mod engine;
mod export;
mod frames;
mod playback;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use audio::{AnalysisStrategy, AudioSource, AudioStats, OfflineAnalyzer};
use choreo::{ChoreoStyle, ChoreographyConfig};
use cli::{AnalyzeArgs, Cli, Commands, PreviewArgs, RenderArgs, SliceArgs};
use config::Config;
use engine::ChoreoEngine;
use export::{ExportFormat, ExportOptions, ExportQuality, SidecarMetadata};
use frames::FrameSet;
use playback::{CancelToken, TerminalSurface};
use render::TextOverlay;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match config::find_config_path(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    match cli.command {
        Commands::Render(args) => run_render(args, &config),
        Commands::Preview(args) => run_preview(args, &config),
        Commands::Analyze(args) => run_analyze(args, &config),
        Commands::Slice(args) => run_slice(args),
    }
}

fn run_render(mut args: RenderArgs, config: &Config) -> Result<()> {
    // Merge: config values apply only when CLI is at its default
    if args.fps == 30 { args.fps = config.output.fps; }
    if args.format == ExportFormat::Mp4 { args.format = config.output.format; }
    if args.quality == ExportQuality::Medium { args.quality = config.output.quality; }
    if args.style == ChoreoStyle::Bounce { args.style = config.choreo.style; }
    if args.intensity == 0.5 { args.intensity = config.choreo.intensity; }
    if args.seed == 0 { args.seed = config.choreo.seed; }
    if args.font.is_none() { args.font = config.overlay.font.clone(); }
    if args.font_url.is_none() { args.font_url = config.overlay.font_url.clone(); }

    log::info!("beatsheet - music-driven sprite sheet choreography");
    log::info!("Audio: {}", args.audio.display());
    log::info!("Sheet: {}", args.sheet.display());
    log::info!("Style: {:?} @ intensity {:.2}", args.style, args.intensity);

    // 1. Slice the sprite sheet
    log::info!("Slicing sprite sheet...");
    let frame_set = prepare_frames(&args.sheet, args.frames, args.margin, args.stabilize, args.anchors)?;
    log::info!(
        "Frames: {} anchors + {} animated",
        frame_set.anchor_count(),
        frame_set.animated_count()
    );

    // 2. Decode audio
    log::info!("Decoding audio...");
    let loaded = AudioSource::File(args.audio.clone())
        .load_with_limit(config.audio.max_size_mb * 1024 * 1024)?;
    log::info!("Decoded {:.1}s at {} Hz", loaded.duration(), loaded.sample_rate);

    let duration = match args.duration {
        Some(requested) => requested.min(loaded.duration()),
        None => loaded.duration(),
    };

    // 3. Analyze and choreograph
    log::info!("Analyzing audio...");
    let mut engine = ChoreoEngine::new(config.audio.analysis_rate_hz, args.seed);
    let choreo_cfg = ChoreographyConfig {
        style: args.style,
        intensity: args.intensity,
        fps: args.fps,
        duration,
    };
    let timeline = engine.generate_animation(&loaded, Arc::clone(&frame_set), &choreo_cfg, |p| {
        log::debug!("[{:?}] {:.0}% {}", p.stage, p.progress * 100.0, p.message);
    })?;
    log::info!(
        "Timeline: {} ticks at {} fps, average {} BPM",
        timeline.len(),
        timeline.fps(),
        engine.average_bpm()
    );

    // 4. Title overlay font
    let overlay = if args.title.is_some() {
        let (w, h) = export::output_dimensions(frame_set.frame(0).dimensions(), args.quality);
        let font_size = (w.min(h) as f32 * 0.046).max(24.0);
        resolve_overlay(args.font.as_deref(), args.font_url.as_deref(), font_size)
    } else {
        None
    };

    let output = args.output.clone().unwrap_or_else(|| {
        let stem = args
            .audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".into());
        PathBuf::from(format!("{}.{}", stem, args.format.extension()))
    });
    if output == args.audio {
        anyhow::bail!("Output {} would overwrite the input audio", output.display());
    }

    // 5. Export
    log::info!("Exporting {}...", output.display());
    let pb = ProgressBar::new(timeline.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .unwrap()
            .progress_chars("=>-"),
    );

    let opts = ExportOptions {
        format: args.format,
        quality: args.quality,
        fps: args.fps,
        include_audio: !args.no_audio,
        output,
        title: args.title.clone(),
    };
    let token = CancelToken::new();
    let exported = export::export_timeline(
        &timeline,
        Some(&loaded),
        overlay.as_ref(),
        &opts,
        |p| {
            if let Some(frame) = p.current_frame {
                pb.set_position(frame as u64);
            }
        },
        &token,
    );
    let path = match exported {
        Ok(path) => {
            pb.finish_with_message("Rendering complete");
            path
        }
        Err(err) => {
            pb.abandon();
            return Err(err.into());
        }
    };

    // 6. Sidecar metadata
    if args.sidecar {
        let (frame_width, frame_height) = frame_set.frame(0).dimensions();
        let meta = SidecarMetadata {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            output: path.clone(),
            format: args.format,
            quality: args.quality,
            fps: args.fps,
            duration,
            style: args.style,
            intensity: args.intensity,
            seed: args.seed,
            frame_width,
            frame_height,
            anchor_frames: frame_set.anchor_count(),
            animated_frames: frame_set.animated_count(),
            stabilized: args.stabilize,
            average_bpm: engine.average_bpm(),
            beat_times: engine.beat_times().to_vec(),
            frame_indices: timeline.indices().to_vec(),
        };
        let sidecar = export::write_sidecar(&meta)?;
        log::info!("Sidecar: {}", sidecar.display());
    }

    log::info!("Done! Output: {}", path.display());
    Ok(())
}

fn run_preview(mut args: PreviewArgs, config: &Config) -> Result<()> {
    // Merge: config values apply only when CLI is at its default
    if args.style == ChoreoStyle::Bounce { args.style = config.choreo.style; }
    if args.intensity == 0.5 { args.intensity = config.choreo.intensity; }
    if args.seed == 0 { args.seed = config.choreo.seed; }

    // 1. Slice the sprite sheet
    log::info!("Slicing sprite sheet...");
    let frame_set = prepare_frames(&args.sheet, args.frames, args.margin, args.stabilize, args.anchors)?;

    // 2. Decode audio
    log::info!("Decoding audio...");
    let loaded = AudioSource::File(args.audio.clone())
        .load_with_limit(config.audio.max_size_mb * 1024 * 1024)?;

    // 3. Analyze and choreograph
    log::info!("Analyzing audio...");
    let mut engine = ChoreoEngine::new(config.audio.analysis_rate_hz, args.seed);
    let choreo_cfg = ChoreographyConfig {
        style: args.style,
        intensity: args.intensity,
        fps: args.fps,
        duration: loaded.duration(),
    };
    let timeline = engine.generate_animation(&loaded, Arc::clone(&frame_set), &choreo_cfg, |p| {
        log::debug!("[{:?}] {:.0}% {}", p.stage, p.progress * 100.0, p.message);
    })?;

    // 4. Play through the default output device, drawing in lockstep
    log::info!(
        "Previewing {:.1}s at {} BPM (ctrl-c to stop)",
        loaded.duration(),
        engine.average_bpm()
    );
    let mut surface = TerminalSurface::new(args.cols);
    let token = CancelToken::new();
    playback::run_preview(&timeline, &loaded, &mut surface, args.refresh_hz, &token)
}

fn run_analyze(args: AnalyzeArgs, config: &Config) -> Result<()> {
    let rate = if args.rate == 30 { config.audio.analysis_rate_hz } else { args.rate };

    log::info!("Decoding audio...");
    let loaded = AudioSource::File(args.audio.clone())
        .load_with_limit(config.audio.max_size_mb * 1024 * 1024)?;

    log::info!("Analyzing audio at {} Hz...", rate);
    let features = OfflineAnalyzer.analyze(&loaded, rate)?;
    let stats = AudioStats::from_samples(&features, loaded.duration(), loaded.sample_rate);

    let doc = serde_json::json!({
        "stats": stats,
        "features": features,
    });
    let json = serde_json::to_string_pretty(&doc).context("Failed to serialize analysis")?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write analysis {}", path.display()))?;
            log::info!("Wrote analysis to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_slice(args: SliceArgs) -> Result<()> {
    log::info!("Slicing sprite sheet...");
    let sheet = frames::load_sheet(&args.sheet)?;
    let mut cells = frames::slice_sheet(&sheet, args.frames, args.margin)?;
    if args.stabilize {
        log::info!("Stabilizing frame alignment...");
        cells = frames::stabilize_frames(cells);
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;
    for (i, cell) in cells.iter().enumerate() {
        let path = args.out_dir.join(format!("frame_{i:03}.png"));
        cell.save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    log::info!("Wrote {} frames to {}", cells.len(), args.out_dir.display());
    Ok(())
}

fn prepare_frames(
    sheet_path: &Path,
    frame_count: usize,
    margin: u32,
    stabilize: bool,
    anchors: usize,
) -> Result<Arc<FrameSet>> {
    let sheet = frames::load_sheet(sheet_path)?;
    let mut cells = frames::slice_sheet(&sheet, frame_count, margin)?;
    if stabilize {
        log::info!("Stabilizing frame alignment...");
        cells = frames::stabilize_frames(cells);
    }
    Ok(Arc::new(FrameSet::split(cells, anchors)))
}

fn resolve_overlay(
    font: Option<&Path>,
    font_url: Option<&str>,
    font_size: f32,
) -> Option<TextOverlay> {
    let bytes = if let Some(path) = font {
        match render::load_font_file(path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("Failed to load font {}: {err:#}", path.display());
                None
            }
        }
    } else if let Some(url) = font_url {
        match render::load_font_from_url(url) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("Failed to load font from URL: {err:#}");
                None
            }
        }
    } else {
        log::warn!("Title requested but no font given; skipping overlay");
        None
    };

    match TextOverlay::new(&bytes?, font_size) {
        Ok(overlay) => Some(overlay),
        Err(err) => {
            log::warn!("Failed to rasterize font: {err:#}");
            None
        }
    }
}
