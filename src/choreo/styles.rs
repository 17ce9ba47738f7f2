//! The seven style policies. Each is a small decision procedure over the
//! current feature sample; continuity state is threaded explicitly so the
//! policies stay re-entrant.

use rand::Rng;

use super::{StepContext, StylePolicy, StyleState};

/// Slow anchor rotation; strong beats flash an animated frame picked by
/// mid-band energy.
pub struct Chill;

impl StylePolicy for Chill {
    fn choose(&self, cx: &mut StepContext, state: StyleState) -> (usize, StyleState) {
        let s = cx.sample;
        if s.beat && s.bass > 0.6 {
            (cx.animated_at(s.mid), state)
        } else {
            // 0.2 Hz cycle through the anchors
            (cx.anchor_at((cx.elapsed * 0.2).fract()), state)
        }
    }
}

/// Bass hits jump to animated frames; mid energy sweeps the anchors via a
/// phase accumulator; quiet passages rest on anchor 0.
pub struct Bounce;

impl StylePolicy for Bounce {
    fn choose(&self, cx: &mut StepContext, state: StyleState) -> (usize, StyleState) {
        let s = cx.sample;
        if s.bass > 0.5 * cx.intensity {
            (cx.animated_at(s.bass), state)
        } else if s.mid > 0.4 {
            let phase = (state.phase + s.mid * 0.1).fract();
            (cx.anchor_at(phase), StyleState { phase, ..state })
        } else {
            (0, state)
        }
    }
}

/// Beats and loud passages flash a random animated frame half the time.
pub struct Strobe;

impl StylePolicy for Strobe {
    fn choose(&self, cx: &mut StepContext, state: StyleState) -> (usize, StyleState) {
        let s = cx.sample;
        if (s.beat || s.rms > 0.7 * cx.intensity) && cx.rng.gen_bool(0.5) {
            let index = cx.random_animated();
            (index, state)
        } else {
            (0, state)
        }
    }
}

/// Holds anchor 0 almost always. Hard beats may show the first animated
/// frame, loud stretches occasionally toggle to anchor 1. Intensity 0
/// pins the output to anchor 0 entirely.
pub struct LogoSafe;

impl StylePolicy for LogoSafe {
    fn choose(&self, cx: &mut StepContext, state: StyleState) -> (usize, StyleState) {
        let s = cx.sample;
        if s.beat && s.bass > 0.8 && cx.intensity > 0.0 {
            (cx.first_animated(), state)
        } else if s.rms > 0.5 && cx.rng.gen_bool((0.1 * cx.intensity) as f64) {
            (1.min(cx.anchors.saturating_sub(1)), state)
        } else {
            (0, state)
        }
    }
}

/// Random jumps with probability rms * intensity; otherwise keeps showing
/// whatever it showed last.
pub struct Glitch;

impl StylePolicy for Glitch {
    fn choose(&self, cx: &mut StepContext, state: StyleState) -> (usize, StyleState) {
        let p = (cx.sample.rms * cx.intensity) as f64;
        if p > 0.0 && cx.rng.gen_bool(p.min(1.0)) {
            let index = cx.random_combined();
            (index, StyleState { held: index, ..state })
        } else {
            (state.held, state)
        }
    }
}

/// Tempo-locked expand/contract: first half of each beat period walks the
/// animated frames, second half walks the anchors.
pub struct Pulse;

impl StylePolicy for Pulse {
    fn choose(&self, cx: &mut StepContext, state: StyleState) -> (usize, StyleState) {
        let bpm = if cx.sample.bpm == 0 {
            120
        } else {
            cx.sample.bpm
        };
        let period = 60.0 / bpm as f32;
        let phase = (cx.elapsed / period).fract();
        if phase < 0.5 {
            (cx.animated_at(phase * 2.0), state)
        } else {
            (cx.anchor_at((phase - 0.5) * 2.0), state)
        }
    }
}

/// Continuous cycle through every frame; loudness speeds the sweep up.
pub struct Wave;

impl StylePolicy for Wave {
    fn choose(&self, cx: &mut StepContext, state: StyleState) -> (usize, StyleState) {
        let rate = 0.5 + cx.sample.rms * 2.0 * cx.intensity;
        let phase = (state.phase + rate / cx.fps as f32).fract();
        (cx.combined_at(phase), StyleState { phase, ..state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFeatureSample;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn sample(bass: f32, mid: f32, rms: f32, beat: bool, bpm: u32) -> AudioFeatureSample {
        AudioFeatureSample {
            time: 0.0,
            bass,
            mid,
            high: 0.1,
            low_mid: 0.5 * (bass + mid),
            rms,
            beat,
            bpm,
        }
    }

    fn step(
        policy: &dyn StylePolicy,
        s: AudioFeatureSample,
        elapsed: f32,
        intensity: f32,
        anchors: usize,
        animated: usize,
        rng: &mut Pcg32,
        state: StyleState,
    ) -> (usize, StyleState) {
        let mut cx = StepContext {
            sample: s,
            tick: 0,
            elapsed,
            intensity,
            fps: 30,
            anchors,
            animated,
            rng,
        };
        policy.choose(&mut cx, state)
    }

    #[test]
    fn logo_safe_at_zero_intensity_holds_anchor_zero() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut state = StyleState::default();
        // Hammer it with the loudest possible beats.
        for _ in 0..200 {
            let (index, next) = step(
                &LogoSafe,
                sample(1.0, 1.0, 1.0, true, 140),
                0.0,
                0.0,
                4,
                5,
                &mut rng,
                state,
            );
            assert_eq!(index, 0);
            state = next;
        }
    }

    #[test]
    fn logo_safe_beat_shows_first_animated() {
        let mut rng = Pcg32::seed_from_u64(1);
        let (index, _) = step(
            &LogoSafe,
            sample(0.9, 0.2, 0.3, true, 120),
            0.0,
            1.0,
            4,
            5,
            &mut rng,
            StyleState::default(),
        );
        assert_eq!(index, 4);
    }

    #[test]
    fn pulse_first_half_walks_animated_frames() {
        let mut rng = Pcg32::seed_from_u64(1);
        // 120 BPM, 0.5s period; at t=0.1 the phase is 0.2, first half.
        let (index, _) = step(
            &Pulse,
            sample(0.0, 0.0, 0.0, false, 120),
            0.1,
            1.0,
            4,
            5,
            &mut rng,
            StyleState::default(),
        );
        // 0.2 * 2 = 0.4 into 5 animated frames -> offset 2
        assert_eq!(index, 4 + 2);
    }

    #[test]
    fn pulse_second_half_walks_anchors() {
        let mut rng = Pcg32::seed_from_u64(1);
        // At t=0.35 the phase is 0.7, second half: (0.7-0.5)*2 = 0.4.
        let (index, _) = step(
            &Pulse,
            sample(0.0, 0.0, 0.0, false, 120),
            0.35,
            1.0,
            4,
            5,
            &mut rng,
            StyleState::default(),
        );
        assert_eq!(index, 1);
    }

    #[test]
    fn pulse_defaults_to_120_bpm_when_undetermined() {
        let mut rng = Pcg32::seed_from_u64(1);
        let undetermined = step(
            &Pulse,
            sample(0.0, 0.0, 0.0, false, 0),
            0.1,
            1.0,
            4,
            5,
            &mut rng,
            StyleState::default(),
        );
        let explicit = step(
            &Pulse,
            sample(0.0, 0.0, 0.0, false, 120),
            0.1,
            1.0,
            4,
            5,
            &mut rng,
            StyleState::default(),
        );
        assert_eq!(undetermined.0, explicit.0);
    }

    #[test]
    fn chill_without_animated_frames_never_panics() {
        let mut rng = Pcg32::seed_from_u64(1);
        // Beat branch with zero animated frames falls back to anchors.
        let (index, _) = step(
            &Chill,
            sample(0.9, 0.5, 0.5, true, 120),
            0.0,
            1.0,
            3,
            0,
            &mut rng,
            StyleState::default(),
        );
        assert!(index < 3);
    }

    #[test]
    fn chill_quiet_passage_cycles_anchors_slowly() {
        let mut rng = Pcg32::seed_from_u64(1);
        let quiet = sample(0.1, 0.1, 0.1, false, 0);
        // 0.2 Hz: a full anchor cycle takes 5 seconds.
        let (at_zero, _) = step(&Chill, quiet, 0.0, 1.0, 4, 5, &mut rng, StyleState::default());
        let (at_late, _) = step(&Chill, quiet, 4.9, 1.0, 4, 5, &mut rng, StyleState::default());
        assert_eq!(at_zero, 0);
        assert_eq!(at_late, 3);
    }

    #[test]
    fn bounce_accumulates_phase_on_mid_energy() {
        let mut rng = Pcg32::seed_from_u64(1);
        let s = sample(0.1, 0.9, 0.2, false, 0);
        let mut state = StyleState::default();
        let mut indices = Vec::new();
        for _ in 0..20 {
            let (index, next) = step(&Bounce, s, 0.0, 1.0, 4, 5, &mut rng, state);
            state = next;
            indices.push(index);
        }
        // 0.09 phase per tick walks the four anchors
        assert!(state.phase > 0.0);
        assert!(indices.iter().any(|&i| i > 0));
        assert!(indices.iter().all(|&i| i < 4));
    }

    #[test]
    fn glitch_holds_when_silent() {
        let mut rng = Pcg32::seed_from_u64(1);
        let state = StyleState {
            phase: 0.0,
            held: 7,
        };
        let (index, next) = step(
            &Glitch,
            sample(0.0, 0.0, 0.0, false, 0),
            0.0,
            1.0,
            4,
            5,
            &mut rng,
            state,
        );
        assert_eq!(index, 7);
        assert_eq!(next.held, 7);
    }

    #[test]
    fn strobe_is_deterministic_for_a_seed() {
        let loud = sample(0.5, 0.5, 0.9, true, 120);
        let run = |seed: u64| -> Vec<usize> {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut state = StyleState::default();
            (0..40)
                .map(|_| {
                    let (index, next) = step(&Strobe, loud, 0.0, 1.0, 2, 6, &mut rng, state);
                    state = next;
                    index
                })
                .collect()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn wave_sweeps_every_frame_and_stays_in_bounds() {
        let mut rng = Pcg32::seed_from_u64(1);
        let s = sample(0.2, 0.2, 0.5, false, 0);
        let mut state = StyleState::default();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..120 {
            let (index, next) = step(&Wave, s, 0.0, 1.0, 2, 3, &mut rng, state);
            assert!(index < 5);
            seen.insert(index);
            state = next;
            assert!(state.phase >= 0.0 && state.phase < 1.0);
        }
        // 1.5 cycles per second at this loudness covers the whole array
        assert_eq!(seen.len(), 5);
    }
}
