use image::{Rgb, RgbImage};

use crate::types::{Detections, Rect};

pub const FACE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const EYE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const SMILE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Outline width in pixels.
pub const LINE_WIDTH: u32 = 2;

/// Draw face, eye and smile boxes onto `img`.
pub fn draw_detections(img: &mut RgbImage, detections: &Detections) {
    for face in &detections.faces {
        draw_rect(img, face.face, FACE_COLOR, LINE_WIDTH);
        for eye in &face.eyes {
            draw_rect(img, *eye, EYE_COLOR, LINE_WIDTH);
        }
        for smile in &face.smiles {
            draw_rect(img, *smile, SMILE_COLOR, LINE_WIDTH);
        }
    }
}

/// Outline `rect` with a border `thickness` pixels wide, growing inward.
/// Parts outside the image are skipped.
pub fn draw_rect(img: &mut RgbImage, rect: Rect, color: Rgb<u8>, thickness: u32) {
    let (img_w, img_h) = img.dimensions();
    let r = rect.clamp_to(img_w, img_h);
    if r.is_empty() {
        return;
    }
    let t = thickness.max(1);

    for y in r.y..r.bottom() {
        let on_horizontal_edge = y < rect.y + t || y + t >= rect.bottom();
        for x in r.x..r.right() {
            let on_vertical_edge = x < rect.x + t || x + t >= rect.right();
            if on_horizontal_edge || on_vertical_edge {
                img.put_pixel(x, y, color);
            }
        }
    }
}
