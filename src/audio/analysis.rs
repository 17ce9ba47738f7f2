use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use super::features::AudioFeatureSample;
use super::{AudioError, LoadedAudio};

const FFT_SIZE: usize = 2048;

/// How many preceding samples the onset detector averages over.
const ONSET_WINDOW: usize = 8;

// Band edges in Hz. Monotonic and non-overlapping.
const BASS_HZ: (f32, f32) = (20.0, 250.0);
const MID_HZ: (f32, f32) = (250.0, 2000.0);
const HIGH_HZ: (f32, f32) = (2000.0, 8000.0);

/// A feature-extraction strategy. Implementations must return the complete,
/// evenly spaced sample sequence or fail; partial results are never returned.
pub trait AnalysisStrategy {
    fn analyze(
        &self,
        audio: &LoadedAudio,
        rate_hz: u32,
    ) -> Result<Vec<AudioFeatureSample>, AudioError>;
}

/// Walks the decoded buffer with a windowed FFT per output sample, so the
/// run time is bounded by compute rather than track length.
pub struct OfflineAnalyzer;

impl AnalysisStrategy for OfflineAnalyzer {
    fn analyze(
        &self,
        audio: &LoadedAudio,
        rate_hz: u32,
    ) -> Result<Vec<AudioFeatureSample>, AudioError> {
        let samples = &audio.samples;
        let sr = audio.sample_rate;
        if samples.is_empty() || sr == 0 || rate_hz == 0 {
            return Ok(Vec::new());
        }

        let duration = samples.len() as f32 / sr as f32;
        let total = (duration * rate_hz as f32).ceil() as usize;

        log::info!(
            "Analyzing {:.1}s of audio at {} Hz ({} feature samples)...",
            duration,
            rate_hz,
            total
        );

        let spectral = spectral_pass(samples, sr, rate_hz, total);
        Ok(rhythm_pass(&spectral, rate_hz))
    }
}

struct SpectralSample {
    bass: f32,
    mid: f32,
    high: f32,
    rms: f32,
}

fn spectral_pass(samples: &[f32], sr: u32, rate_hz: u32, total: usize) -> Vec<SpectralSample> {
    let samples_per_tick = sr as f32 / rate_hz as f32;
    let freq_resolution = sr as f32 / FFT_SIZE as f32;
    let hann = hann_window(FFT_SIZE);

    (0..total)
        .into_par_iter()
        .map(|idx| {
            let center = (idx as f32 * samples_per_tick) as usize;
            let start = center.saturating_sub(FFT_SIZE / 2);
            let end = (start + FFT_SIZE).min(samples.len());

            let mut fft_input: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); FFT_SIZE];
            for i in 0..(end - start) {
                fft_input[i] = Complex::new(samples[start + i] * hann[i], 0.0);
            }

            // Per-thread FFT planner (rayon-safe)
            let mut planner = FftPlanner::<f32>::new();
            let fft = planner.plan_fft_forward(FFT_SIZE);
            fft.process(&mut fft_input);

            let half = FFT_SIZE / 2;
            let magnitudes: Vec<f32> = fft_input[..half].iter().map(|c| c.norm()).collect();
            let max_mag = magnitudes.iter().copied().fold(0.0f32, f32::max).max(1e-10);

            // Band energy = mean magnitude over the band, normalized by the
            // loudest bin in this window so every field lands in 0..1.
            let band_energy = |low_hz: f32, high_hz: f32| -> f32 {
                let low_bin = (low_hz / freq_resolution) as usize;
                let high_bin = ((high_hz / freq_resolution) as usize).min(half);
                if low_bin >= high_bin {
                    return 0.0;
                }
                let sum: f32 = magnitudes[low_bin..high_bin].iter().sum();
                sum / (high_bin - low_bin) as f32 / max_mag
            };

            let bass = band_energy(BASS_HZ.0, BASS_HZ.1);
            let mid = band_energy(MID_HZ.0, MID_HZ.1);
            let high = band_energy(HIGH_HZ.0, HIGH_HZ.1);

            let rms = (magnitudes
                .iter()
                .map(|m| (m / max_mag) * (m / max_mag))
                .sum::<f32>()
                / half as f32)
                .sqrt();

            SpectralSample {
                bass,
                mid,
                high,
                rms,
            }
        })
        .collect()
}

/// Sequential pass: onset flags need their neighbors, and the rolling BPM
/// estimate needs every onset seen so far.
fn rhythm_pass(spectral: &[SpectralSample], rate_hz: u32) -> Vec<AudioFeatureSample> {
    let mut onsets: Vec<f32> = Vec::new();
    let mut out = Vec::with_capacity(spectral.len());

    for (i, s) in spectral.iter().enumerate() {
        let time = i as f32 / rate_hz as f32;

        let beat = if i == 0 {
            false
        } else {
            let start = i.saturating_sub(ONSET_WINDOW);
            let local_mean =
                spectral[start..i].iter().map(|s| s.rms).sum::<f32>() / (i - start) as f32;
            let prev = spectral[i - 1].rms;
            s.rms > local_mean * 1.5 + 0.01 && s.rms > prev * 1.2
        };

        if beat {
            onsets.push(time);
        }

        // Tempo stays 0 (undetermined) until two onsets exist.
        let bpm = if onsets.len() < 2 {
            0
        } else {
            calculate_bpm(&onsets)
        };

        out.push(AudioFeatureSample {
            time,
            bass: s.bass,
            mid: s.mid,
            high: s.high,
            low_mid: 0.5 * (s.bass + s.mid),
            rms: s.rms,
            beat,
            bpm,
        });
    }

    if !out.is_empty() {
        log::info!(
            "Detected {} onsets, final tempo estimate {} BPM",
            onsets.len(),
            out.last().map(|s| s.bpm).unwrap_or(0)
        );
    }

    out
}

/// Median inter-onset interval converted to BPM, clamped to [60, 200].
/// Fewer than two onsets reports the 120 BPM default.
fn calculate_bpm(onsets: &[f32]) -> u32 {
    if onsets.len() < 2 {
        return 120;
    }

    let mut intervals: Vec<f32> = onsets.windows(2).map(|w| w[1] - w[0]).collect();
    intervals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = intervals[intervals.len() / 2];

    let bpm = (60.0 / median).round();
    (bpm as u32).clamp(60, 200)
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}
