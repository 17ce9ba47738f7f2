use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use thiserror::Error;

/// Pixels trimmed from each edge of a grid cell to avoid grid-line bleed
/// from imperfect generator output.
pub const DEFAULT_CELL_MARGIN: u32 = 10;

#[derive(Debug, Error)]
pub enum SheetError {
    /// The declared frame count does not form a square grid. This is a
    /// caller contract violation, not a transient failure.
    #[error("frame count {0} has no integer square root; sprite sheets use a square grid")]
    InvalidFrameCount(usize),

    #[error("failed to read sprite sheet {path}: {source}")]
    Read {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Load a sprite-sheet image from disk and normalize it to RGBA.
pub fn load_sheet(path: &Path) -> Result<RgbaImage, SheetError> {
    let img = image::open(path).map_err(|source| SheetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}

/// Slice a sprite sheet into `frame_count` individual frames.
///
/// The sheet is divided into a `g x g` grid where `g = sqrt(frame_count)`,
/// read left-to-right then top-to-bottom. Each cell spans
/// `floor(side / g)` pixels per dimension, with `margin` pixels cropped from
/// every edge. A margin that would leave a cell with no usable area yields a
/// 1x1 transparent placeholder for that cell rather than failing the batch.
pub fn slice_sheet(
    sheet: &RgbaImage,
    frame_count: usize,
    margin: u32,
) -> Result<Vec<RgbaImage>, SheetError> {
    let grid = integer_sqrt(frame_count).ok_or(SheetError::InvalidFrameCount(frame_count))?;

    let cell_w = sheet.width() / grid;
    let cell_h = sheet.height() / grid;

    let mut frames = Vec::with_capacity(frame_count);
    for i in 0..frame_count as u32 {
        let row = i / grid;
        let col = i % grid;

        let usable_w = cell_w.saturating_sub(margin * 2);
        let usable_h = cell_h.saturating_sub(margin * 2);
        if usable_w == 0 || usable_h == 0 {
            frames.push(placeholder_frame());
            continue;
        }

        let x = col * cell_w + margin;
        let y = row * cell_h + margin;
        frames.push(image::imageops::crop_imm(sheet, x, y, usable_w, usable_h).to_image());
    }

    log::debug!(
        "Sliced {} frames ({}x{} grid, {}x{} cells, {}px margin)",
        frames.len(),
        grid,
        grid,
        cell_w,
        cell_h,
        margin
    );

    Ok(frames)
}

fn integer_sqrt(n: usize) -> Option<u32> {
    if n == 0 {
        return None;
    }
    let g = (n as f64).sqrt().round() as usize;
    if g * g == n {
        Some(g as u32)
    } else {
        None
    }
}

fn placeholder_frame() -> RgbaImage {
    RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]))
}
