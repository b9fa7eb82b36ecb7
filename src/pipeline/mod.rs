//! Training-data synthesis: regex-sampled texts, rendered originals,
//! baseline-aligned mosaics, and labeled sliding windows.
pub mod mosaic;
pub mod render;
pub mod text_gen;
pub mod windows;

use std::time::Instant;

use rand::rngs::StdRng;
use rand::Rng;

use crate::errors::DepixResult;
use crate::params::PictureParams;
use crate::pipeline::mosaic::{pixelize, PixelizationOptions, PixelizedImage};
use crate::pipeline::render::{render_text, ImageCreationOptions, OriginalImage};
use crate::pipeline::text_gen::{RegexTextGenerator, TextGenerator};
use crate::pipeline::windows::{windows_from_image, Window, WindowOptions};

/// Padding around the rendered text; leaves room for grid rows that extend
/// past the ascender and descender lines.
pub const DEFAULT_PADDING: (u32, u32) = (20, 20);

/// Batches below this size skip the stage timing records.
const TIMING_BATCH_THRESHOLD: usize = 100;

pub struct TrainingData {
    pub texts: Vec<String>,
    pub original_images: Vec<OriginalImage>,
    pub pixelized_images: Vec<PixelizedImage>,
    pub windows: Vec<Vec<Window>>,
}

/// Run the full synthesis pipeline for `n_img` examples. Every stochastic
/// choice (texts, randomized x origins) is drawn from `rng`.
pub fn create_training_data(
    n_img: u32,
    picture: &PictureParams,
    rng: &mut StdRng,
) -> DepixResult<TrainingData> {
    let texts = generate_texts(n_img, &picture.pattern, rng)?;
    let original_images = generate_original_images(&texts, picture);
    let pixelized_images = generate_pixelized_images(&original_images, picture, rng);
    let windows = generate_windows(&original_images, &pixelized_images, picture.window_size);

    Ok(TrainingData {
        texts,
        original_images,
        pixelized_images,
        windows,
    })
}

fn generate_texts(n_img: u32, pattern: &str, rng: &mut StdRng) -> DepixResult<Vec<String>> {
    let t = Instant::now();
    let mut generator = RegexTextGenerator::with_seed(pattern, rng.gen())?;
    let texts = (0..n_img)
        .map(|_| generator.generate())
        .collect::<DepixResult<Vec<_>>>()?;

    if texts.len() > TIMING_BATCH_THRESHOLD {
        tracing::info!(
            target: "unpixel::timing",
            elapsed_ms = t.elapsed().as_millis() as u64,
            n_img,
            "created texts"
        );
    }
    Ok(texts)
}

fn generate_original_images(texts: &[String], picture: &PictureParams) -> Vec<OriginalImage> {
    let t = Instant::now();
    let options = ImageCreationOptions {
        padding: DEFAULT_PADDING,
        font: picture.font.clone(),
        font_color: picture.font_color,
        background_color: picture.background_color,
    };
    let original_images: Vec<OriginalImage> = texts
        .iter()
        .map(|text| render_text(text, &options))
        .collect();

    if original_images.len() > TIMING_BATCH_THRESHOLD {
        tracing::info!(
            target: "unpixel::timing",
            elapsed_ms = t.elapsed().as_millis() as u64,
            "created original images"
        );
    }
    original_images
}

/// Mosaic every original; the grid is baseline-aligned unless the x origin
/// is randomized per image.
fn generate_pixelized_images(
    original_images: &[OriginalImage],
    picture: &PictureParams,
    rng: &mut StdRng,
) -> Vec<PixelizedImage> {
    let t = Instant::now();
    let pixelized_images: Vec<PixelizedImage> = original_images
        .iter()
        .map(|original| {
            let offset_x = if picture.randomize_pixelization_origin_x {
                rng.gen_range(0..picture.block_size as i32)
            } else {
                0
            };
            pixelize(
                original,
                &PixelizationOptions {
                    block_size: picture.block_size,
                    offset: (offset_x, picture.offset_y),
                },
            )
        })
        .collect();

    if pixelized_images.len() > TIMING_BATCH_THRESHOLD {
        tracing::info!(
            target: "unpixel::timing",
            elapsed_ms = t.elapsed().as_millis() as u64,
            "pixelized images"
        );
    }
    pixelized_images
}

fn generate_windows(
    original_images: &[OriginalImage],
    pixelized_images: &[PixelizedImage],
    window_size: u32,
) -> Vec<Vec<Window>> {
    let t = Instant::now();
    let options = WindowOptions::new(window_size);
    let windows: Vec<Vec<Window>> = original_images
        .iter()
        .zip(pixelized_images)
        .map(|(original, pixelized)| windows_from_image(original, pixelized, &options))
        .collect();

    if windows.len() > TIMING_BATCH_THRESHOLD {
        tracing::info!(
            target: "unpixel::timing",
            elapsed_ms = t.elapsed().as_millis() as u64,
            "created windows"
        );
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_font::BlockFont;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn demo_params() -> PictureParams {
        let mut params = PictureParams::new(
            r"\d{4}",
            Arc::new(BlockFont::new(12, 4, 8)),
            4,
        );
        params.window_size = 2;
        params
    }

    #[test]
    fn pipeline_produces_aligned_collections() {
        let params = demo_params();
        let mut rng = StdRng::seed_from_u64(1);
        let data = create_training_data(5, &params, &mut rng).unwrap();

        assert_eq!(data.texts.len(), 5);
        assert_eq!(data.original_images.len(), 5);
        assert_eq!(data.pixelized_images.len(), 5);
        assert_eq!(data.windows.len(), 5);
        for (text, original) in data.texts.iter().zip(&data.original_images) {
            assert_eq!(&original.text, text);
            assert_eq!(original.boxes.len(), text.chars().count());
        }
        for (pixelized, windows) in data.pixelized_images.iter().zip(&data.windows) {
            assert_eq!(
                windows.len(),
                (pixelized.n_tiles.0 - params.window_size + 1) as usize
            );
        }
    }

    #[test]
    fn fixed_seed_reproduces_training_examples_bit_for_bit() {
        let params = demo_params();

        let mut rng_a = StdRng::seed_from_u64(23);
        let mut rng_b = StdRng::seed_from_u64(23);
        let a = create_training_data(4, &params, &mut rng_a).unwrap();
        let b = create_training_data(4, &params, &mut rng_b).unwrap();

        assert_eq!(a.texts, b.texts);
        for (x, y) in a.pixelized_images.iter().zip(&b.pixelized_images) {
            assert_eq!(x.image.as_raw(), y.image.as_raw());
            assert_eq!(x.origin, y.origin);
        }
    }

    #[test]
    fn randomized_x_origin_varies_between_images() {
        let mut params = demo_params();
        params.randomize_pixelization_origin_x = true;
        let mut rng = StdRng::seed_from_u64(5);
        let data = create_training_data(20, &params, &mut rng).unwrap();

        let distinct_origins: std::collections::HashSet<i32> = data
            .pixelized_images
            .iter()
            .map(|p| p.origin.0)
            .collect();
        assert!(distinct_origins.len() > 1);
    }
}
