use std::io::Write;

use anyhow::Result;
use image::{imageops, Rgba, RgbaImage};

use crate::audio::LoadedAudio;
use crate::choreo::FrameTimeline;

use super::audio_out::AudioPlayer;
use super::clock::{CancelToken, FrameClock};

/// Something a preview frame can be drawn onto.
pub trait PreviewSurface {
    fn present(&mut self, frame: &RgbaImage) -> Result<()>;
}

/// Play the track while driving the surface from the live audio position.
/// Returns when the audio ends or the token is cancelled.
pub fn run_preview(
    timeline: &FrameTimeline,
    audio: &LoadedAudio,
    surface: &mut dyn PreviewSurface,
    refresh_hz: u32,
    token: &CancelToken,
) -> Result<()> {
    if timeline.is_empty() {
        return Ok(());
    }

    let player = AudioPlayer::start(audio)?;
    let mut clock = FrameClock::new(refresh_hz.max(1));
    let mut last_tick = usize::MAX;

    while !token.is_cancelled() && !player.is_finished() {
        let tick = timeline.index_at_position(player.position_secs());
        if tick != last_tick {
            surface.present(timeline.frame(tick))?;
            last_tick = tick;
        }
        clock.wait();
    }

    Ok(())
}

/// Draws frames as ANSI half-block art: each character cell carries two
/// vertically stacked pixels through the upper half block glyph.
pub struct TerminalSurface {
    cols: u32,
    first: bool,
}

impl TerminalSurface {
    pub fn new(cols: u32) -> Self {
        TerminalSurface {
            cols: cols.max(2),
            first: true,
        }
    }
}

impl PreviewSurface for TerminalSurface {
    fn present(&mut self, frame: &RgbaImage) -> Result<()> {
        let mut out = String::new();
        if self.first {
            // Hide the cursor and clear once; afterwards just re-home.
            out.push_str("\x1b[?25l\x1b[2J");
            self.first = false;
        }
        out.push_str("\x1b[H");

        let src_w = frame.width().max(1);
        let src_h = frame.height().max(1);
        let w = self.cols;
        let mut h = ((w as f32 * src_h as f32 / src_w as f32).round() as u32).max(2);
        if h % 2 == 1 {
            h += 1;
        }
        let scaled = imageops::resize(frame, w, h, imageops::FilterType::Nearest);

        for y in (0..h).step_by(2) {
            for x in 0..w {
                let (tr, tg, tb) = shade(scaled.get_pixel(x, y));
                let (br, bg, bb) = shade(scaled.get_pixel(x, y + 1));
                out.push_str(&format!(
                    "\x1b[38;2;{tr};{tg};{tb}m\x1b[48;2;{br};{bg};{bb}m\u{2580}"
                ));
            }
            out.push_str("\x1b[0m\n");
        }

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(out.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        // Restore the cursor even on an early bail-out.
        let _ = std::io::stdout().write_all(b"\x1b[0m\x1b[?25h\n");
    }
}

/// Composite a pixel against black by its alpha.
fn shade(p: &Rgba<u8>) -> (u8, u8, u8) {
    let a = p[3] as u16;
    (
        (p[0] as u16 * a / 255) as u8,
        (p[1] as u16 * a / 255) as u8,
        (p[2] as u16 * a / 255) as u8,
    )
}
