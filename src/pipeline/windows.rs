/// Sliding-window extraction over a mosaicked text band.
///
/// A window spans `window_size` consecutive tile columns and the full tile
/// band vertically. Its feature vector samples one pixel per covered tile
/// (tiles are uniform after mosaicking, so one pixel is exact); its label is
/// the tuple of characters whose boxes overlap the window horizontally.
use image::RgbImage;

use crate::pipeline::mosaic::PixelizedImage;
use crate::pipeline::render::OriginalImage;

#[derive(Debug, Clone)]
pub struct Window {
    /// Characters overlapping the window, in text order; the HMM state label.
    pub characters: Vec<char>,
    /// Flat sample of the covered tiles, `3 · window_size · n_tiles_y` long.
    pub values: Vec<f64>,
    /// Horizontal position within the image, reset to 0 per image.
    pub window_index: usize,
    pub cluster: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct WindowOptions {
    pub window_size: u32,
    /// Minimum horizontal overlap (px) before a character joins the label.
    pub character_threshold: i32,
}

impl WindowOptions {
    pub fn new(window_size: u32) -> Self {
        Self {
            window_size,
            character_threshold: 0,
        }
    }
}

/// Overlap of two closed intervals; symmetric, never negative.
pub fn interval_overlap(a: (i32, i32), b: (i32, i32)) -> i32 {
    (a.1.min(b.1) - a.0.max(b.0)).max(0)
}

pub fn windows_from_image(
    original: &OriginalImage,
    pixelized: &PixelizedImage,
    options: &WindowOptions,
) -> Vec<Window> {
    let b = pixelized.block_size as i32;
    let n_tiles_x = pixelized.n_tiles.0 as i32;
    let n_tiles_y = pixelized.n_tiles.1 as i32;
    let size = options.window_size as i32;
    let window_width = size * b;

    let count = n_tiles_x - size + 1;
    if count <= 0 {
        return Vec::new();
    }

    let mut windows = Vec::with_capacity(count as usize);
    for window_index in 0..count {
        let left = pixelized.origin.0 + window_index * b;
        let right = left + window_width - 1;

        let characters = original
            .boxes
            .iter()
            .filter(|cb| interval_overlap((cb.left, cb.right), (left, right)) > options.character_threshold)
            .map(|cb| cb.ch)
            .collect();

        let values = sample_tiles(&pixelized.image, left, pixelized.origin.1, size, n_tiles_y, b);

        windows.push(Window {
            characters,
            values,
            window_index: window_index as usize,
            cluster: None,
        });
    }
    windows
}

/// Inference-side twin of `windows_from_image` for a user-supplied mosaic
/// whose grid starts at the image origin: unlabeled feature vectors only.
/// Fewer than `window_size` tile columns yield no windows.
pub fn window_vectors_from_image(
    image: &RgbImage,
    block_size: u32,
    window_size: u32,
) -> Vec<Vec<f64>> {
    let b = block_size as i32;
    let n_tiles_x = (image.width() / block_size) as i32;
    let n_tiles_y = (image.height() / block_size) as i32;
    let size = window_size as i32;

    let count = n_tiles_x - size + 1;
    if count <= 0 {
        return Vec::new();
    }

    (0..count)
        .map(|window_index| sample_tiles(image, window_index * b, 0, size, n_tiles_y, b))
        .collect()
}

/// One pixel per tile at the tile origin, stepped at the block stride; rows
/// outer, columns inner, channels innermost. Starting anywhere but the
/// origin pixel would silently corrupt vectors for edge-clipped tiles.
fn sample_tiles(
    image: &RgbImage,
    left: i32,
    top: i32,
    tiles_x: i32,
    tiles_y: i32,
    block_size: i32,
) -> Vec<f64> {
    let mut values = Vec::with_capacity((3 * tiles_x * tiles_y) as usize);
    for j in 0..tiles_y {
        let y = clamp_coord(top + j * block_size, image.height());
        for i in 0..tiles_x {
            let x = clamp_coord(left + i * block_size, image.width());
            let p = image.get_pixel(x, y);
            values.extend(p.0.iter().map(|&c| c as f64));
        }
    }
    values
}

fn clamp_coord(v: i32, len: u32) -> u32 {
    v.clamp(0, len as i32 - 1) as u32
}
