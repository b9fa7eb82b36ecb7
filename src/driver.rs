/// End-to-end workflows: train a model, report its metrics, decode a
/// supplied image; and the grid search enumerating hyperparameter tuples.
use std::path::Path;

use image::RgbImage;

use crate::errors::DepixResult;
use crate::hmm::depix::DepixHmm;
use crate::params::{PictureGridParams, PictureParams, TrainingGridParams, TrainingParams};

/// Train and evaluate one model; when an image path is given, decode it and
/// return the reconstructed string.
pub fn run(
    picture: PictureParams,
    training: TrainingParams,
    image_path: Option<&Path>,
) -> DepixResult<Option<String>> {
    let mut depix = DepixHmm::new(picture, training);
    depix.train()?;
    let (accuracy, average_similarity) = depix.evaluate()?;
    tracing::info!(accuracy, average_similarity, "model evaluated");

    match image_path {
        Some(path) => {
            let image = load_rgb_image(path)?;
            let reconstructed = depix.decode_image(&image)?;
            Ok(Some(reconstructed))
        }
        None => Ok(None),
    }
}

/// Enumerate the Cartesian product of the grid lists, keep the model with
/// the highest accuracy, and decode the image (if any) under that model.
pub fn run_grid_search(
    picture_grid: &PictureGridParams,
    training_grid: &TrainingGridParams,
    image_path: Option<&Path>,
) -> DepixResult<Option<String>> {
    let image = match image_path {
        Some(path) => Some(load_rgb_image(path)?),
        None => None,
    };

    let mut best: Option<DepixHmm> = None;
    let mut best_accuracy = 0.0f64;
    let mut best_similarity = 0.0f64;

    for &window_size in &picture_grid.window_sizes {
        for &n_clusters in &training_grid.n_clusters {
            for &n_img_train in &training_grid.n_img_train {
                for &offset_y in &picture_grid.offset_ys {
                    let picture = PictureParams {
                        pattern: picture_grid.pattern.clone(),
                        font: picture_grid.font.clone(),
                        font_color: picture_grid.font_color,
                        background_color: picture_grid.background_color,
                        block_size: picture_grid.block_size,
                        randomize_pixelization_origin_x: picture_grid
                            .randomize_pixelization_origin_x,
                        window_size,
                        offset_y,
                    };
                    let training = TrainingParams {
                        n_img_train,
                        n_img_test: training_grid.n_img_test,
                        n_clusters,
                        seed: training_grid.seed,
                    };

                    let mut depix = DepixHmm::new(picture, training);
                    depix.train()?;
                    let (accuracy, average_similarity) = depix.evaluate()?;
                    tracing::info!(
                        window_size,
                        n_clusters,
                        n_img_train,
                        offset_y,
                        accuracy,
                        average_similarity,
                        "grid point evaluated"
                    );

                    if let Some(image) = &image {
                        let reconstructed = depix.decode_image(image)?;
                        tracing::info!(%reconstructed, "grid point decode");
                    }

                    if best.is_none() || accuracy > best_accuracy {
                        best_accuracy = accuracy;
                        best_similarity = average_similarity;
                        best = Some(depix);
                    }
                }
            }
        }
    }

    let Some(best) = best else {
        return Ok(None);
    };
    tracing::info!(
        accuracy = best_accuracy,
        average_similarity = best_similarity,
        window_size = best.picture().window_size,
        n_clusters = best.training().n_clusters,
        n_img_train = best.training().n_img_train,
        offset_y = best.picture().offset_y,
        "best grid configuration"
    );

    match &image {
        Some(image) => Ok(Some(best.decode_image(image)?)),
        None => Ok(None),
    }
}

fn load_rgb_image(path: &Path) -> DepixResult<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_font::BlockFont;
    use std::sync::Arc;

    #[test]
    fn grid_search_runs_the_full_product() {
        let font = Arc::new(BlockFont::new(12, 4, 8));
        let picture_grid = PictureGridParams {
            pattern: r"\d{3}".to_string(),
            font,
            font_color: image::Rgb([0, 0, 0]),
            background_color: image::Rgb([255, 255, 255]),
            block_size: 4,
            randomize_pixelization_origin_x: false,
            window_sizes: vec![2, 3],
            offset_ys: vec![0],
        };
        let training_grid = TrainingGridParams {
            n_img_train: vec![30],
            n_img_test: 4,
            n_clusters: vec![20],
            seed: Some(3),
        };

        // No image supplied: the search completes and returns nothing.
        let result = run_grid_search(&picture_grid, &training_grid, None).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn run_reports_metrics_without_an_image() {
        let font = Arc::new(BlockFont::new(12, 4, 8));
        let mut picture = PictureParams::new(r"\d{3}", font, 4);
        picture.window_size = 2;
        let training = TrainingParams {
            n_img_train: 30,
            n_img_test: 4,
            n_clusters: 20,
            seed: Some(4),
        };

        assert!(run(picture, training, None).unwrap().is_none());
    }
}
