use image::{imageops, Rgba, RgbaImage};

/// Scale-to-fit placement: the (width, height, x, y) of `src` fitted inside
/// `dst` preserving aspect ratio, centered.
pub fn fit_rect(src: (u32, u32), dst: (u32, u32)) -> (u32, u32, u32, u32) {
    if dst.0 == 0 || dst.1 == 0 {
        return (0, 0, 0, 0);
    }

    let (sw, sh) = (src.0.max(1) as f32, src.1.max(1) as f32);
    let scale = (dst.0 as f32 / sw).min(dst.1 as f32 / sh);
    let w = ((sw * scale).round() as u32).clamp(1, dst.0);
    let h = ((sh * scale).round() as u32).clamp(1, dst.1);
    let x = (dst.0 - w) / 2;
    let y = (dst.1 - h) / 2;
    (w, h, x, y)
}

/// Draw `frame` letterboxed onto an opaque black canvas of the target size.
pub fn compose_frame(frame: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    if width == 0 || height == 0 {
        return canvas;
    }

    let (w, h, x, y) = fit_rect(frame.dimensions(), (width, height));
    if frame.dimensions() == (w, h) {
        imageops::overlay(&mut canvas, frame, x as i64, y as i64);
    } else {
        let scaled = imageops::resize(frame, w, h, imageops::FilterType::Triangle);
        imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
    }
    canvas
}
