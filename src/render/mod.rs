mod compose;
mod text;

pub use compose::{compose_frame, fit_rect};
pub use text::{load_font_file, load_font_from_url, TextOverlay};
