use serde::Serialize;

/// Per-tick audio features sampled at the analysis rate (Pass 2 output).
#[derive(Clone, Copy, Debug, Serialize)]
pub struct AudioFeatureSample {
    /// Time in seconds from the start of the audio
    pub time: f32,
    /// Bass band energy, 20-250 Hz (0.0-1.0)
    pub bass: f32,
    /// Mid band energy, 250-2000 Hz (0.0-1.0)
    pub mid: f32,
    /// High band energy, 2-8 kHz (0.0-1.0)
    pub high: f32,
    /// Blend of bass and mid, used by styles that want body without thump
    pub low_mid: f32,
    /// RMS energy across the whole spectrum (0.0-1.0)
    pub rms: f32,
    /// Is this sample on a detected onset?
    pub beat: bool,
    /// Rolling tempo estimate in BPM; 0 until enough onsets accumulate
    pub bpm: u32,
}

/// Whole-track summary derived from the per-sample features.
#[derive(Clone, Debug, Serialize)]
pub struct AudioStats {
    /// Track length in seconds
    pub duration: f32,
    /// Feature sampling rate the curves below were built at
    pub sample_rate_hz: u32,
    /// Mean of all nonzero per-sample tempo estimates; 120 when none exist
    pub average_bpm: u32,
    /// Times (seconds) of every detected onset
    pub beat_times: Vec<f32>,
    /// RMS energy per sample
    pub rms_curve: Vec<f32>,
    /// Bass energy per sample
    pub bass_curve: Vec<f32>,
}

impl AudioStats {
    pub fn from_samples(samples: &[AudioFeatureSample], duration: f32, rate_hz: u32) -> Self {
        let mut bpm_sum: u64 = 0;
        let mut bpm_count: u64 = 0;
        for s in samples {
            if s.bpm > 0 {
                bpm_sum += s.bpm as u64;
                bpm_count += 1;
            }
        }
        let average_bpm = if bpm_count > 0 {
            (bpm_sum / bpm_count) as u32
        } else {
            120
        };
        AudioStats {
            duration,
            sample_rate_hz: rate_hz,
            average_bpm,
            beat_times: samples.iter().filter(|s| s.beat).map(|s| s.time).collect(),
            rms_curve: samples.iter().map(|s| s.rms).collect(),
            bass_curve: samples.iter().map(|s| s.bass).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f32, beat: bool, bpm: u32) -> AudioFeatureSample {
        AudioFeatureSample {
            time,
            bass: 0.5,
            mid: 0.3,
            high: 0.1,
            low_mid: 0.4,
            rms: 0.4,
            beat,
            bpm,
        }
    }

    #[test]
    fn average_bpm_ignores_warmup_zeros() {
        let samples = vec![
            sample(0.0, true, 0),
            sample(0.5, true, 0),
            sample(1.0, true, 118),
            sample(1.5, true, 122),
        ];
        let stats = AudioStats::from_samples(&samples, 2.0, 2);
        assert_eq!(stats.average_bpm, 120);
    }

    #[test]
    fn average_bpm_defaults_when_no_estimates() {
        let samples = vec![sample(0.0, false, 0), sample(0.5, false, 0)];
        let stats = AudioStats::from_samples(&samples, 1.0, 2);
        assert_eq!(stats.average_bpm, 120);
    }

    #[test]
    fn beat_times_collect_onset_timestamps() {
        let samples = vec![
            sample(0.0, false, 0),
            sample(0.5, true, 0),
            sample(1.0, false, 120),
            sample(1.5, true, 120),
        ];
        let stats = AudioStats::from_samples(&samples, 2.0, 2);
        assert_eq!(stats.beat_times, vec![0.5, 1.5]);
        assert_eq!(stats.rms_curve.len(), 4);
    }
}
