/// Block-mosaic filtering with a grid anchored on the text baseline.
///
/// Offsets are reduced modulo the block size before any arithmetic; the
/// grid covers the text band and grows by one block row above or below
/// whenever the y offset pushes the ascender or descender row across a
/// grid line.
use image::{Rgb, RgbImage};

use crate::pipeline::render::OriginalImage;

#[derive(Debug, Clone, Copy)]
pub struct PixelizationOptions {
    pub block_size: u32,
    pub offset: (i32, i32),
}

pub struct PixelizedImage {
    pub n_tiles: (u32, u32),
    pub block_size: u32,
    /// Top-left pixel of the mosaicked rectangle in image coordinates.
    pub origin: (i32, i32),
    pub image: RgbImage,
}

/// Number of tile columns and rows covering the text band.
pub fn tile_counts(
    text_width: u32,
    font_metrics: (i32, i32),
    offset: (i32, i32),
    block_size: u32,
) -> (u32, u32) {
    let b = block_size as i64;
    let (ascent, descent) = (font_metrics.0 as i64, font_metrics.1 as i64);
    let (ox, oy) = (offset.0 as i64, offset.1 as i64);

    let tiles_x = ceil_div(text_width as i64 + ox, b);
    let tiles_above_baseline = ceil_div(ascent - oy, b);
    let tiles_below_baseline = ceil_div(descent + oy, b);
    (
        tiles_x as u32,
        (tiles_above_baseline + tiles_below_baseline) as u32,
    )
}

/// Top-left corner of the mosaic grid. With a zero offset the grid row
/// boundary coincides with the text baseline at `padding.1 + ascent`.
pub fn grid_origin(
    padding: (u32, u32),
    font_metrics: (i32, i32),
    offset: (i32, i32),
    block_size: u32,
) -> (i32, i32) {
    let b = block_size as i64;
    let (ascent, oy) = (font_metrics.0 as i64, offset.1 as i64);

    let origin_x = padding.0 as i64 - offset.0 as i64;
    let tiles_above_baseline = ceil_div(ascent - oy, b);
    let origin_y = padding.1 as i64 + ascent - (oy + tiles_above_baseline * b);
    (origin_x as i32, origin_y as i32)
}

fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1).div_euclid(b)
}

pub fn pixelize(original: &OriginalImage, options: &PixelizationOptions) -> PixelizedImage {
    let block_size = options.block_size;
    let offset = (
        options.offset.0.rem_euclid(block_size as i32),
        options.offset.1.rem_euclid(block_size as i32),
    );

    let metrics = original.font_metrics();
    let n_tiles = tile_counts(original.text_size().0, metrics, offset, block_size);
    let origin = grid_origin(original.options.padding, metrics, offset, block_size);

    PixelizedImage {
        n_tiles,
        block_size,
        origin,
        image: pixelize_area(&original.image, block_size, origin, n_tiles),
    }
}

/// Replace every tile of the given grid with its per-channel integer mean,
/// computed over the source image. Tiles extending outside the canvas are
/// clipped on read and on write.
pub fn pixelize_area(
    image: &RgbImage,
    block_size: u32,
    origin: (i32, i32),
    n_tiles: (u32, u32),
) -> RgbImage {
    let b = block_size as i32;
    let mut pixelized = image.clone();

    for i in 0..n_tiles.0 as i32 {
        for j in 0..n_tiles.1 as i32 {
            let left = origin.0 + i * b;
            let top = origin.1 + j * b;
            let right = left + b - 1;
            let bottom = top + b - 1;

            if let Some(color) = average_color(image, left, top, right, bottom) {
                fill_rect(&mut pixelized, left, top, right, bottom, color);
            }
        }
    }
    pixelized
}

/// Per-channel mean over the closed rectangle, clipped to the canvas;
/// `None` when the rectangle lies entirely outside.
fn average_color(image: &RgbImage, left: i32, top: i32, right: i32, bottom: i32) -> Option<Rgb<u8>> {
    let x0 = left.max(0) as u32;
    let y0 = top.max(0) as u32;
    let x1 = (right.min(image.width() as i32 - 1)).max(-1);
    let y1 = (bottom.min(image.height() as i32 - 1)).max(-1);
    if x1 < x0 as i32 || y1 < y0 as i32 {
        return None;
    }

    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for y in y0..=y1 as u32 {
        for x in x0..=x1 as u32 {
            let p = image.get_pixel(x, y);
            for c in 0..3 {
                sums[c] += p.0[c] as u64;
            }
            count += 1;
        }
    }
    Some(Rgb([
        mean_channel(sums[0], count),
        mean_channel(sums[1], count),
        mean_channel(sums[2], count),
    ]))
}

fn mean_channel(sum: u64, count: u64) -> u8 {
    (sum as f64 / count as f64).round() as u8
}

fn fill_rect(image: &mut RgbImage, left: i32, top: i32, right: i32, bottom: i32, color: Rgb<u8>) {
    let x0 = left.max(0) as u32;
    let y0 = top.max(0) as u32;
    if right < 0 || bottom < 0 {
        return;
    }
    let x1 = (right as u32).min(image.width().saturating_sub(1));
    let y1 = (bottom as u32).min(image.height().saturating_sub(1));
    for y in y0..=y1 {
        for x in x0..=x1 {
            image.put_pixel(x, y, color);
        }
    }
}
