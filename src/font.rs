/// Font access used by the rendering pipeline and the string reconstruction.
///
/// The pipeline only needs a handful of metrics (cumulative advance widths,
/// per-glyph mask sizes, ascent/descent) plus a text-drawing primitive, so
/// those are factored into a trait. The production implementation rasterizes
/// TrueType/OpenType faces through `ab_glyph`.
use std::path::Path;

use ab_glyph::{point, Font, FontVec, Glyph, GlyphId, PxScale, PxScaleFont, ScaleFont};
use image::{Rgb, RgbImage};

use crate::errors::{DepixError, DepixResult};

pub trait TextFont {
    /// Pixels from the top of the line box down to the baseline.
    fn ascent(&self) -> i32;

    /// Pixels from the baseline down to the bottom of the line box.
    fn descent(&self) -> i32;

    /// Rendered size of `text`: cumulative advance width and the distance
    /// from the top of the line box to the lowest inked pixel.
    fn text_size(&self, text: &str) -> (u32, u32);

    /// Dimensions of the inked mask of `ch` rendered in isolation.
    fn mask_size(&self, ch: char) -> (u32, u32);

    /// Advance width of a single character.
    fn char_width(&self, ch: char) -> u32;

    /// Draw `text` onto `canvas` with the top-left of the line box at
    /// `origin`; the baseline ends up at `origin.1 + ascent()`.
    fn draw_text(&self, canvas: &mut RgbImage, origin: (i32, i32), text: &str, color: Rgb<u8>);

    fn font_metrics(&self) -> (i32, i32) {
        (self.ascent(), self.descent())
    }
}

/// A TrueType/OpenType face at a fixed pixel size.
pub struct TrueTypeFont {
    font: FontVec,
    scale: PxScale,
}

impl TrueTypeFont {
    pub fn from_file(path: &Path, size: f32) -> DepixResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data, size)
    }

    pub fn from_bytes(data: Vec<u8>, size: f32) -> DepixResult<Self> {
        let font = FontVec::try_from_vec(data)
            .map_err(|e| DepixError::Font(format!("invalid font data: {e}")))?;
        Ok(Self {
            font,
            scale: PxScale::from(size),
        })
    }

    fn scaled(&self) -> PxScaleFont<&FontVec> {
        self.font.as_scaled(self.scale)
    }

    /// Lowest inked pixel of `glyph` relative to the baseline, if it has an
    /// outline. Positive values extend below the baseline.
    fn inked_bottom(&self, glyph: Glyph) -> Option<f32> {
        self.scaled()
            .outline_glyph(glyph)
            .map(|outlined| outlined.px_bounds().max.y)
    }
}

impl TextFont for TrueTypeFont {
    fn ascent(&self) -> i32 {
        self.scaled().ascent().ceil() as i32
    }

    fn descent(&self) -> i32 {
        // ab_glyph reports descent as a negative offset from the baseline.
        (-self.scaled().descent()).ceil() as i32
    }

    fn text_size(&self, text: &str) -> (u32, u32) {
        let scaled = self.scaled();
        let mut width = 0.0f32;
        let mut lowest = f32::NEG_INFINITY;
        let mut prev: Option<GlyphId> = None;

        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(self.scale, point(width, 0.0));
            if let Some(bottom) = self.inked_bottom(glyph) {
                lowest = lowest.max(bottom);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }

        let height = if lowest == f32::NEG_INFINITY {
            0
        } else {
            (scaled.ascent() + lowest).ceil().max(0.0) as u32
        };
        (width.ceil() as u32, height)
    }

    fn mask_size(&self, ch: char) -> (u32, u32) {
        let scaled = self.scaled();
        let glyph = scaled
            .glyph_id(ch)
            .with_scale_and_position(self.scale, point(0.0, 0.0));
        match scaled.outline_glyph(glyph) {
            Some(outlined) => {
                let bounds = outlined.px_bounds();
                (bounds.width().ceil() as u32, bounds.height().ceil() as u32)
            }
            None => (0, 0),
        }
    }

    fn char_width(&self, ch: char) -> u32 {
        let scaled = self.scaled();
        scaled.h_advance(scaled.glyph_id(ch)).ceil() as u32
    }

    fn draw_text(&self, canvas: &mut RgbImage, origin: (i32, i32), text: &str, color: Rgb<u8>) {
        let scaled = self.scaled();
        let baseline = origin.1 as f32 + scaled.ascent();
        let mut cursor = origin.0 as f32;
        let mut prev: Option<GlyphId> = None;

        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                cursor += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(self.scale, point(cursor, baseline));
            if let Some(outlined) = scaled.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, coverage| {
                    let x = bounds.min.x as i32 + px as i32;
                    let y = bounds.min.y as i32 + py as i32;
                    if coverage > 0.0
                        && x >= 0
                        && y >= 0
                        && (x as u32) < canvas.width()
                        && (y as u32) < canvas.height()
                    {
                        let dst = canvas.get_pixel_mut(x as u32, y as u32);
                        for c in 0..3 {
                            dst.0[c] = blend_channel(dst.0[c], color.0[c], coverage);
                        }
                    }
                });
            }
            cursor += scaled.h_advance(id);
            prev = Some(id);
        }
    }
}

fn blend_channel(dst: u8, src: u8, coverage: f32) -> u8 {
    (dst as f32 * (1.0 - coverage) + src as f32 * coverage).round() as u8
}


#[cfg(test)]
mod tests {
    use super::*;

    const FONT_SEARCH_PATHS: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ];

    fn load_system_font(size: f32) -> Option<TrueTypeFont> {
        for candidate in FONT_SEARCH_PATHS {
            let path = Path::new(*candidate);
            if path.exists() {
                if let Ok(font) = TrueTypeFont::from_file(path, size) {
                    return Some(font);
                }
            }
        }
        None
    }

    #[test]
    fn truetype_metrics_are_consistent() {
        let Some(font) = load_system_font(50.0) else {
            return;
        };

        assert!(font.ascent() > 0);
        assert!(font.descent() >= 0);

        let (w1, h1) = font.text_size("1");
        let (w12, _) = font.text_size("12");
        assert!(w1 > 0);
        assert!(h1 > 0);
        assert!(w12 > w1);

        let (mw, mh) = font.mask_size('8');
        assert!(mw > 0 && mw <= font.char_width('8') + 2);
        assert!(mh > 0 && mh <= (font.ascent() + font.descent()) as u32);
    }

    #[test]
    fn truetype_draws_inside_canvas() {
        let Some(font) = load_system_font(30.0) else {
            return;
        };

        let mut canvas = RgbImage::from_pixel(200, 80, Rgb([255, 255, 255]));
        font.draw_text(&mut canvas, (10, 10), "123", Rgb([0, 0, 0]));
        let inked = canvas.pixels().filter(|p| p.0 != [255, 255, 255]).count();
        assert!(inked > 0);
    }

    #[test]
    fn invalid_font_data_is_rejected() {
        let err = TrueTypeFont::from_bytes(vec![0u8; 16], 20.0);
        assert!(matches!(err, Err(DepixError::Font(_))));
    }
}
