/// Rendering of a text string onto a padded canvas, together with the
/// per-character pixel bounding boxes the window labeller needs.
use std::sync::Arc;

use image::{Rgb, RgbImage};

use crate::font::TextFont;

#[derive(Clone)]
pub struct ImageCreationOptions {
    pub padding: (u32, u32),
    pub font: Arc<dyn TextFont + Send + Sync>,
    pub background_color: Rgb<u8>,
    pub font_color: Rgb<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterBox {
    pub ch: char,
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

pub struct OriginalImage {
    pub text: String,
    pub image: RgbImage,
    pub boxes: Vec<CharacterBox>,
    pub options: ImageCreationOptions,
}

impl OriginalImage {
    pub fn text_size(&self) -> (u32, u32) {
        self.options.font.text_size(&self.text)
    }

    pub fn font_metrics(&self) -> (i32, i32) {
        self.options.font.font_metrics()
    }
}

/// Render `text` onto a canvas padded by `options.padding` on every side.
/// The canvas height is `2·pad_y + ascent + descent` so that a mosaic grid
/// anchored on the baseline has room above and below the text band.
pub fn render_text(text: &str, options: &ImageCreationOptions) -> OriginalImage {
    let (width, _) = options.font.text_size(text);
    let (ascent, descent) = options.font.font_metrics();
    let (pad_x, pad_y) = options.padding;

    let canvas_w = 2 * pad_x + width;
    let canvas_h = 2 * pad_y + (ascent + descent) as u32;
    let mut image = RgbImage::from_pixel(canvas_w, canvas_h, options.background_color);

    options
        .font
        .draw_text(&mut image, (pad_x as i32, pad_y as i32), text, options.font_color);

    OriginalImage {
        text: text.to_string(),
        image,
        boxes: character_boxes(text, options),
        options: options.clone(),
    }
}

/// Box `i` combines the cumulative advance of the prefix `text[..=i]` (the
/// right edge) with the isolated mask of `text[i]` (width and height).
/// Rendering backends report cumulative horizontal advance but only
/// per-glyph vertical extent, hence the asymmetry. Kerning may make
/// neighboring boxes overlap; `left` stays non-decreasing.
pub fn character_boxes(text: &str, options: &ImageCreationOptions) -> Vec<CharacterBox> {
    let font = options.font.as_ref();
    let (pad_x, pad_y) = (options.padding.0 as i32, options.padding.1 as i32);

    let mut boxes = Vec::with_capacity(text.chars().count());
    for (idx, ch) in text.char_indices() {
        let prefix = &text[..idx + ch.len_utf8()];
        let isolated_bottom = font.text_size(&ch.to_string()).1 as i32;
        let (prefix_right, prefix_bottom) = font.text_size(prefix);
        let (mask_w, mask_h) = font.mask_size(ch);

        let bottom = isolated_bottom.min(prefix_bottom as i32) + pad_y;
        let right = prefix_right as i32 + pad_x;
        boxes.push(CharacterBox {
            ch,
            top: bottom - mask_h as i32,
            bottom,
            left: right - mask_w as i32,
            right,
        });
    }
    boxes
}

/// Copy of the rendered image with each character box outlined in red;
/// diagnostic aid for checking a font's metrics against its rasterization.
pub fn draw_character_boxes(original: &OriginalImage) -> RgbImage {
    const OUTLINE: Rgb<u8> = Rgb([255, 0, 0]);
    let mut image = original.image.clone();
    for b in &original.boxes {
        for x in b.left..=b.right {
            put_pixel_clipped(&mut image, x, b.top, OUTLINE);
            put_pixel_clipped(&mut image, x, b.bottom, OUTLINE);
        }
        for y in b.top..=b.bottom {
            put_pixel_clipped(&mut image, b.left, y, OUTLINE);
            put_pixel_clipped(&mut image, b.right, y, OUTLINE);
        }
    }
    image
}

fn put_pixel_clipped(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_font::BlockFont;

    fn options(padding: (u32, u32)) -> ImageCreationOptions {
        ImageCreationOptions {
            padding,
            font: Arc::new(BlockFont::new(38, 12, 25)),
            background_color: Rgb([255, 255, 255]),
            font_color: Rgb([0, 0, 0]),
        }
    }

    #[test]
    fn render_adds_one_box_per_character() {
        let original = render_text("123456789", &options((30, 30)));
        assert_eq!(original.boxes.len(), 9);
    }

    #[test]
    fn canvas_size_covers_padding_and_line_box() {
        let original = render_text("1234", &options((30, 30)));
        let (width, _) = original.text_size();
        let (ascent, descent) = original.font_metrics();
        assert_eq!(original.image.width(), 2 * 30 + width);
        assert_eq!(original.image.height(), 2 * 30 + (ascent + descent) as u32);
    }

    #[test]
    fn character_boxes_start_at_the_padding_edge() {
        let opts = options((30, 30));
        let boxes = character_boxes("Asdf", &opts);

        assert_eq!(boxes.len(), 4);
        assert_eq!(boxes[0].left, 30);
        assert!(boxes[0].right > boxes[0].left);
        assert!(boxes[0].top >= 30);
        assert!(boxes[0].bottom <= 30 + 50);
        for pair in boxes.windows(2) {
            assert!(pair[1].left >= pair[0].left);
        }
    }

    #[test]
    fn character_boxes_stay_inside_the_image() {
        let opts = options((20, 20));
        let original = render_text("0815", &opts);
        let (w, h) = (original.image.width() as i32, original.image.height() as i32);
        for b in &original.boxes {
            assert!(b.left >= 0 && b.right <= w);
            assert!(b.top >= 0 && b.bottom <= h);
        }
    }

    #[test]
    fn rendered_glyphs_land_inside_their_boxes() {
        let opts = options((20, 20));
        let original = render_text("88", &opts);
        for (x, y, pixel) in original.image.enumerate_pixels() {
            if pixel.0 == [0, 0, 0] {
                let covered = original.boxes.iter().any(|b| {
                    (x as i32) >= b.left
                        && (x as i32) < b.right
                        && (y as i32) >= b.top
                        && (y as i32) < b.bottom
                });
                assert!(covered, "inked pixel ({x}, {y}) outside every box");
            }
        }
    }
}
