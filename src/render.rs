//! Annotation rendering.
//!
//! `render` is a pure function of its inputs: it copies the frame and burns
//! in one rectangle and label per detection, in input order, last drawn on
//! top. All drawing is clipped raw-buffer pixel work; labels use a built-in
//! 5x7 glyph set so no font files are needed at runtime.

use crate::detect::result::{BoxRect, Detection};
use crate::frame::{AnnotatedFrame, Frame};

const BOX_COLOR: [u8; 3] = [0, 255, 0];
const BORDER_PX: i32 = 2;

const GLYPH_W: i32 = 5;
const GLYPH_H: i32 = 7;
const GLYPH_SCALE: i32 = 2;
const GLYPH_GAP: i32 = 1;

/// Draw boxes and labels for every detection onto a copy of the frame.
pub fn render(frame: &Frame, detections: &[Detection]) -> AnnotatedFrame {
    let mut pixels = frame.pixels().to_vec();
    let width = frame.width as i32;
    let height = frame.height as i32;

    for detection in detections {
        draw_box(&mut pixels, width, height, &detection.rect);

        let text = format!("{} {:.2}", detection.label, detection.confidence);
        let text_h = GLYPH_H * GLYPH_SCALE;
        // Label sits above the box, or inside it when clipped by the top edge.
        let text_y = if detection.rect.y - text_h - 2 >= 0 {
            detection.rect.y - text_h - 2
        } else {
            detection.rect.y + BORDER_PX + 2
        };
        draw_text(
            &mut pixels,
            width,
            height,
            detection.rect.x + BORDER_PX,
            text_y,
            &text,
        );
    }

    AnnotatedFrame::new(pixels, frame.width, frame.height, frame.captured_at)
}

fn set_pixel(buf: &mut [u8], width: i32, height: i32, x: i32, y: i32, color: [u8; 3]) {
    if x < 0 || y < 0 || x >= width || y >= height {
        return;
    }
    let idx = ((y * width + x) * 3) as usize;
    buf[idx..idx + 3].copy_from_slice(&color);
}

fn draw_box(buf: &mut [u8], width: i32, height: i32, rect: &BoxRect) {
    let x0 = rect.x;
    let y0 = rect.y;
    let x1 = rect.x + rect.w as i32 - 1;
    let y1 = rect.y + rect.h as i32 - 1;

    for t in 0..BORDER_PX {
        for x in x0..=x1 {
            set_pixel(buf, width, height, x, y0 + t, BOX_COLOR);
            set_pixel(buf, width, height, x, y1 - t, BOX_COLOR);
        }
        for y in y0..=y1 {
            set_pixel(buf, width, height, x0 + t, y, BOX_COLOR);
            set_pixel(buf, width, height, x1 - t, y, BOX_COLOR);
        }
    }
}

fn draw_text(buf: &mut [u8], width: i32, height: i32, x: i32, y: i32, text: &str) {
    let mut cursor = x;
    for ch in text.chars() {
        let glyph = glyph_for(ch.to_ascii_uppercase());
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..GLYPH_SCALE {
                    for dx in 0..GLYPH_SCALE {
                        set_pixel(
                            buf,
                            width,
                            height,
                            cursor + col * GLYPH_SCALE + dx,
                            y + row as i32 * GLYPH_SCALE + dy,
                            BOX_COLOR,
                        );
                    }
                }
            }
        }
        cursor += (GLYPH_W + GLYPH_GAP) * GLYPH_SCALE;
    }
}

/// 5x7 glyph rows, bit 4 = leftmost column. Unknown characters render blank.
fn glyph_for(ch: char) -> [u8; 7] {
    match ch {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0E],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        _ => [0x00; 7],
    }
}
