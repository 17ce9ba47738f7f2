mod audio_out;
mod clock;
mod preview;

pub use audio_out::{AudioPlayer, PlaybackError};
pub use clock::{CancelToken, FrameClock};
pub use preview::{run_preview, PreviewSurface, TerminalSurface};
