use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use thiserror::Error;

use crate::audio::{
    AnalysisStrategy, AudioError, AudioFeatureSample, AudioStats, LoadedAudio, OfflineAnalyzer,
};
use crate::choreo::{self, ChoreoError, ChoreographyConfig, FrameTimeline};
use crate::frames::FrameSet;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Choreo(#[from] ChoreoError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Analyzing,
    Choreographing,
    Complete,
}

/// One progress report. Emitted at coarse milestones, never stored.
#[derive(Clone, Debug)]
pub struct PipelineProgress {
    pub stage: PipelineStage,
    /// Fraction 0..1 across the whole pipeline
    pub progress: f32,
    pub message: String,
}

/// Sequences analysis then choreography and keeps the analysis products
/// around for stats accessors. One engine per session; calls to
/// `generate_animation` are serialized by `&mut self`.
pub struct ChoreoEngine {
    analyzer: Box<dyn AnalysisStrategy>,
    analysis_rate_hz: u32,
    seed: u64,
    features: Vec<AudioFeatureSample>,
    stats: Option<AudioStats>,
}

impl ChoreoEngine {
    pub fn new(analysis_rate_hz: u32, seed: u64) -> Self {
        Self::with_analyzer(Box::new(OfflineAnalyzer), analysis_rate_hz, seed)
    }

    pub fn with_analyzer(
        analyzer: Box<dyn AnalysisStrategy>,
        analysis_rate_hz: u32,
        seed: u64,
    ) -> Self {
        ChoreoEngine {
            analyzer,
            analysis_rate_hz,
            seed,
            features: Vec::new(),
            stats: None,
        }
    }

    /// Analyze the track, then run the style over it. The callback is
    /// fire-and-forget; it must not block.
    pub fn generate_animation(
        &mut self,
        audio: &LoadedAudio,
        frames: Arc<FrameSet>,
        cfg: &ChoreographyConfig,
        on_progress: impl Fn(PipelineProgress),
    ) -> Result<FrameTimeline, EngineError> {
        on_progress(PipelineProgress {
            stage: PipelineStage::Analyzing,
            progress: 0.0,
            message: "Analyzing audio".into(),
        });

        self.features = self.analyzer.analyze(audio, self.analysis_rate_hz)?;
        self.stats = Some(AudioStats::from_samples(
            &self.features,
            audio.duration(),
            self.analysis_rate_hz,
        ));

        on_progress(PipelineProgress {
            stage: PipelineStage::Choreographing,
            progress: 0.6,
            message: "Choreographing frames".into(),
        });

        let mut rng = Pcg32::seed_from_u64(self.seed);
        let timeline = choreo::generate_timeline(&self.features, frames, cfg, &mut rng)?;

        on_progress(PipelineProgress {
            stage: PipelineStage::Complete,
            progress: 1.0,
            message: "Timeline ready".into(),
        });

        Ok(timeline)
    }

    pub fn features(&self) -> &[AudioFeatureSample] {
        &self.features
    }

    pub fn stats(&self) -> Option<&AudioStats> {
        self.stats.as_ref()
    }

    /// Mean of the nonzero per-sample tempo estimates, 120 before analysis.
    pub fn average_bpm(&self) -> u32 {
        self.stats.as_ref().map(|s| s.average_bpm).unwrap_or(120)
    }

    pub fn beat_times(&self) -> &[f32] {
        self.stats
            .as_ref()
            .map(|s| s.beat_times.as_slice())
            .unwrap_or(&[])
    }

    pub fn rms_curve(&self) -> &[f32] {
        self.stats
            .as_ref()
            .map(|s| s.rms_curve.as_slice())
            .unwrap_or(&[])
    }

    pub fn bass_curve(&self) -> &[f32] {
        self.stats
            .as_ref()
            .map(|s| s.bass_curve.as_slice())
            .unwrap_or(&[])
    }

    /// Drop the analysis products. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.features = Vec::new();
        self.stats = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioMetadata;
    use crate::choreo::ChoreoStyle;
    use image::RgbaImage;
    use std::cell::RefCell;

    fn test_audio() -> LoadedAudio {
        let sr = 8000u32;
        let samples: Vec<f32> = (0..sr as usize * 2)
            .map(|i| {
                // 50ms bursts twice a second
                if i % 4000 < 400 {
                    (2.0 * std::f32::consts::PI * 800.0 * i as f32 / sr as f32).sin()
                } else {
                    0.0
                }
            })
            .collect();
        LoadedAudio {
            samples,
            sample_rate: sr,
            metadata: AudioMetadata {
                duration: 2.0,
                title: None,
                format: "wav".into(),
                path: None,
            },
        }
    }

    fn test_frames() -> Arc<FrameSet> {
        let img = || RgbaImage::new(1, 1);
        Arc::new(FrameSet::new(
            (0..2).map(|_| img()).collect(),
            (0..4).map(|_| img()).collect(),
        ))
    }

    fn test_config() -> ChoreographyConfig {
        ChoreographyConfig {
            style: ChoreoStyle::Bounce,
            intensity: 0.7,
            fps: 24,
            duration: 2.0,
        }
    }

    #[test]
    fn progress_reports_stages_in_order() {
        let mut engine = ChoreoEngine::new(20, 0);
        let stages = RefCell::new(Vec::new());

        let timeline = engine
            .generate_animation(&test_audio(), test_frames(), &test_config(), |p| {
                stages.borrow_mut().push((p.stage, p.progress));
            })
            .unwrap();

        assert_eq!(timeline.len(), 48);
        let stages = stages.into_inner();
        assert_eq!(
            stages.iter().map(|(s, _)| *s).collect::<Vec<_>>(),
            vec![
                PipelineStage::Analyzing,
                PipelineStage::Choreographing,
                PipelineStage::Complete
            ]
        );
        assert!(stages.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn stats_populate_after_generation() {
        let mut engine = ChoreoEngine::new(20, 0);
        engine
            .generate_animation(&test_audio(), test_frames(), &test_config(), |_| {})
            .unwrap();

        assert_eq!(engine.features().len(), 40);
        assert_eq!(engine.rms_curve().len(), 40);
        assert_eq!(engine.bass_curve().len(), 40);
        assert!(engine.average_bpm() >= 60 && engine.average_bpm() <= 200);
        let beats = engine.features().iter().filter(|s| s.beat).count();
        assert_eq!(engine.beat_times().len(), beats);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut engine = ChoreoEngine::new(20, 0);
        engine
            .generate_animation(&test_audio(), test_frames(), &test_config(), |_| {})
            .unwrap();

        engine.dispose();
        assert!(engine.features().is_empty());
        assert!(engine.stats().is_none());
        engine.dispose();
        assert!(engine.features().is_empty());
        assert_eq!(engine.average_bpm(), 120);
    }

    #[test]
    fn engine_can_generate_again_after_dispose() {
        let mut engine = ChoreoEngine::new(20, 9);
        let first = engine
            .generate_animation(&test_audio(), test_frames(), &test_config(), |_| {})
            .unwrap();
        engine.dispose();
        let second = engine
            .generate_animation(&test_audio(), test_frames(), &test_config(), |_| {})
            .unwrap();
        assert_eq!(first.indices(), second.indices());
    }
}
