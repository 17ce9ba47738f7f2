use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};
use image::RgbaImage;

/// Rasterizes and blends title text onto composed frames.
pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn new(font_bytes: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(font_bytes, FontSettings::default())
            .map_err(|e| anyhow!("failed to parse font: {e}"))?;
        Ok(Self { font, font_size })
    }

    /// Blend text onto the image at the given position.
    pub fn composite(&self, image: &mut RgbaImage, text: &str, x: u32, y: u32, color: [u8; 4]) {
        let (width, height) = image.dimensions();
        let mut cursor_x = x as i32;

        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y as i32 + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }

                    let px = cursor_x + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        continue;
                    }

                    let pixel = image.get_pixel_mut(px as u32, py as u32);
                    let a = alpha as f32 / 255.0 * (color[3] as f32 / 255.0);
                    let inv_a = 1.0 - a;
                    pixel[0] = (color[0] as f32 * a + pixel[0] as f32 * inv_a) as u8;
                    pixel[1] = (color[1] as f32 * a + pixel[1] as f32 * inv_a) as u8;
                    pixel[2] = (color[2] as f32 * a + pixel[2] as f32 * inv_a) as u8;
                    pixel[3] = 255;
                }
            }

            cursor_x += metrics.advance_width as i32;
        }
    }

    /// Width of the rendered text in pixels.
    pub fn measure_width(&self, text: &str) -> u32 {
        let mut width = 0.0f32;
        for ch in text.chars() {
            let (metrics, _) = self.font.rasterize(ch, self.font_size);
            width += metrics.advance_width;
        }
        width.ceil() as u32
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }
}

/// Read font bytes from a local path.
pub fn load_font_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read font: {}", path.display()))
}

/// Download font bytes from a URL.
pub fn load_font_from_url(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading font from {url}");
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to download font from {url}"))?
        .error_for_status()
        .with_context(|| format!("Font download failed for {url}"))?;
    let bytes = response.bytes().context("Failed to read font response")?;
    Ok(bytes.to_vec())
}
