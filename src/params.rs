/// Runtime parameter objects shared by the pipeline, the model, and the
/// drivers. These are plain data; the file-level configuration in
/// `config` is converted into these after the font has been loaded.
use std::sync::Arc;

use image::Rgb;

use crate::font::TextFont;

pub const DEFAULT_WINDOW_SIZE: u32 = 5;
pub const DEFAULT_FONT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
pub const DEFAULT_BACKGROUND_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Describes how training pictures are synthesized and mosaicked.
#[derive(Clone)]
pub struct PictureParams {
    pub pattern: String,
    pub font: Arc<dyn TextFont + Send + Sync>,
    pub font_color: Rgb<u8>,
    pub background_color: Rgb<u8>,
    pub block_size: u32,
    pub randomize_pixelization_origin_x: bool,
    pub window_size: u32,
    pub offset_y: i32,
}

impl PictureParams {
    pub fn new(pattern: &str, font: Arc<dyn TextFont + Send + Sync>, block_size: u32) -> Self {
        Self {
            pattern: pattern.to_string(),
            font,
            font_color: DEFAULT_FONT_COLOR,
            background_color: DEFAULT_BACKGROUND_COLOR,
            block_size,
            randomize_pixelization_origin_x: false,
            window_size: DEFAULT_WINDOW_SIZE,
            offset_y: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingParams {
    pub n_img_train: u32,
    pub n_img_test: u32,
    pub n_clusters: usize,
    /// Seeds every stochastic choice of a run (text sampling, pixelization
    /// origins, k-means initialization). `None` draws from entropy.
    pub seed: Option<u64>,
}

/// Value lists enumerated by the grid-search driver; the remaining fields
/// mirror `PictureParams`.
#[derive(Clone)]
pub struct PictureGridParams {
    pub pattern: String,
    pub font: Arc<dyn TextFont + Send + Sync>,
    pub font_color: Rgb<u8>,
    pub background_color: Rgb<u8>,
    pub block_size: u32,
    pub randomize_pixelization_origin_x: bool,
    pub window_sizes: Vec<u32>,
    pub offset_ys: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct TrainingGridParams {
    pub n_img_train: Vec<u32>,
    pub n_img_test: u32,
    pub n_clusters: Vec<usize>,
    pub seed: Option<u64>,
}

/// Log levels for the general module log and the separate timing log.
#[derive(Debug, Clone)]
pub struct LoggingParams {
    pub module_level: tracing::Level,
    pub timer_level: tracing::Level,
}

impl Default for LoggingParams {
    fn default() -> Self {
        Self {
            module_level: tracing::Level::INFO,
            timer_level: tracing::Level::INFO,
        }
    }
}

impl LoggingParams {
    /// Env-filter directives configuring the two logs independently; the
    /// timing log lives on the dedicated `unpixel::timing` target.
    pub fn filter_directives(&self) -> String {
        format!(
            "unpixel={},unpixel::timing={}",
            level_directive(self.module_level),
            level_directive(self.timer_level)
        )
    }
}

fn level_directive(level: tracing::Level) -> String {
    level.to_string().to_ascii_lowercase()
}
