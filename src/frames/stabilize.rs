use image::RgbaImage;

/// Alpha value (exclusive) below which a pixel is treated as empty when
/// computing content bounding boxes.
const ALPHA_THRESHOLD: u8 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BBox {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl BBox {
    fn union(self, other: BBox) -> BBox {
        BBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Stabilize frame content against per-cell jitter from the upstream
/// generator.
///
/// Computes each frame's opaque-pixel bounding box, takes the union across
/// all frames, and re-renders every frame onto a canvas of the union's size,
/// translated so the union origin lands at (0, 0). All frames end up sharing
/// one coordinate space cropped to the content region, so running the pass
/// again is a no-op.
///
/// Frames with no pixel above the alpha threshold contribute nothing to the
/// union; if no frame has any, the input is returned unchanged.
pub fn stabilize_frames(frames: Vec<RgbaImage>) -> Vec<RgbaImage> {
    let union = frames
        .iter()
        .filter_map(content_bbox)
        .reduce(BBox::union);

    let Some(union) = union else {
        log::debug!("No opaque content found; skipping stabilization");
        return frames;
    };

    frames
        .into_iter()
        .map(|frame| translate_to_origin(&frame, union))
        .collect()
}

fn content_bbox(frame: &RgbaImage) -> Option<BBox> {
    let mut bbox: Option<BBox> = None;
    for (x, y, pixel) in frame.enumerate_pixels() {
        if pixel.0[3] > ALPHA_THRESHOLD {
            let point = BBox {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            };
            bbox = Some(match bbox {
                Some(b) => b.union(point),
                None => point,
            });
        }
    }
    bbox
}

fn translate_to_origin(frame: &RgbaImage, union: BBox) -> RgbaImage {
    let mut out = RgbaImage::new(union.width(), union.height());
    for y in 0..union.height() {
        for x in 0..union.width() {
            let src_x = union.min_x + x;
            let src_y = union.min_y + y;
            if src_x < frame.width() && src_y < frame.height() {
                out.put_pixel(x, y, *frame.get_pixel(src_x, src_y));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn frame_with_dot(size: u32, x: u32, y: u32) -> RgbaImage {
        let mut f = RgbaImage::new(size, size);
        f.put_pixel(x, y, Rgba([255, 255, 255, 255]));
        f
    }

    #[test]
    fn crops_to_union_of_content() {
        let frames = vec![frame_with_dot(10, 2, 3), frame_with_dot(10, 6, 5)];
        let stabilized = stabilize_frames(frames);
        // union spans x 2..=6, y 3..=5
        assert_eq!(stabilized[0].dimensions(), (5, 3));
        assert_eq!(stabilized[1].dimensions(), (5, 3));
        assert_eq!(stabilized[0].get_pixel(0, 0).0[3], 255);
        assert_eq!(stabilized[1].get_pixel(4, 2).0[3], 255);
    }

    #[test]
    fn restabilizing_is_a_noop() {
        let frames = vec![frame_with_dot(12, 1, 1), frame_with_dot(12, 8, 9)];
        let once = stabilize_frames(frames);
        let twice = stabilize_frames(once.clone());
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.dimensions(), b.dimensions());
            assert_eq!(a.as_raw(), b.as_raw());
        }
    }

    #[test]
    fn fully_transparent_input_is_returned_unchanged() {
        let frames = vec![RgbaImage::new(8, 8), RgbaImage::new(8, 8)];
        let out = stabilize_frames(frames.clone());
        assert_eq!(out.len(), 2);
        for (a, b) in frames.iter().zip(out.iter()) {
            assert_eq!(a.as_raw(), b.as_raw());
        }
    }

    #[test]
    fn low_alpha_pixels_do_not_count_as_content() {
        let mut f = RgbaImage::new(6, 6);
        f.put_pixel(0, 0, Rgba([255, 255, 255, ALPHA_THRESHOLD]));
        f.put_pixel(3, 3, Rgba([255, 255, 255, 255]));
        let out = stabilize_frames(vec![f]);
        assert_eq!(out[0].dimensions(), (1, 1));
    }

    #[test]
    fn undersized_frames_pad_with_transparency() {
        // A 1x1 placeholder alongside a frame with content away from origin.
        let frames = vec![
            frame_with_dot(10, 5, 5),
            RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])),
        ];
        let out = stabilize_frames(frames);
        assert_eq!(out[0].dimensions(), (1, 1));
        assert_eq!(out[1].dimensions(), (1, 1));
        assert_eq!(out[1].get_pixel(0, 0).0[3], 0);
    }
}
