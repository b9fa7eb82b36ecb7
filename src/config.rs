/// File-level configuration: a TOML tree describing the picture, training,
/// logging, and optional grid-search sections, converted into the runtime
/// parameter objects once the font file has been loaded.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::errors::{DepixError, DepixResult};
use crate::font::TrueTypeFont;
use crate::params::{
    LoggingParams, PictureGridParams, PictureParams, TrainingGridParams, TrainingParams,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub picture: PictureConfig,
    pub training: TrainingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// When present, the driver runs a grid search instead of a single fit.
    #[serde(default)]
    pub grid: Option<GridConfig>,
    /// Mosaicked image to decode after training.
    #[serde(default)]
    pub input_image: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PictureConfig {
    pub pattern: String,
    pub font_path: PathBuf,
    pub font_size: f32,
    pub block_size: u32,
    #[serde(default = "default_window_size")]
    pub window_size: u32,
    #[serde(default)]
    pub offset_y: i32,
    #[serde(default)]
    pub randomize_origin_x: bool,
    #[serde(default = "default_font_color")]
    pub font_color: [u8; 3],
    #[serde(default = "default_background_color")]
    pub background_color: [u8; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub n_img_train: u32,
    pub n_img_test: u32,
    pub n_clusters: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub module_level: String,
    #[serde(default = "default_level")]
    pub timer_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            module_level: default_level(),
            timer_level: default_level(),
        }
    }
}

/// Value lists for the grid search; fields that are absent fall back to the
/// single value from the corresponding scalar section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub window_sizes: Vec<u32>,
    #[serde(default)]
    pub n_clusters: Vec<usize>,
    #[serde(default)]
    pub n_img_train: Vec<u32>,
    #[serde(default)]
    pub offset_ys: Vec<i32>,
}

fn default_window_size() -> u32 {
    crate::params::DEFAULT_WINDOW_SIZE
}

fn default_font_color() -> [u8; 3] {
    [0, 0, 0]
}

fn default_background_color() -> [u8; 3] {
    [255, 255, 255]
}

fn default_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> DepixResult<FileConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

impl FileConfig {
    pub fn picture_params(&self) -> DepixResult<PictureParams> {
        let font = Arc::new(TrueTypeFont::from_file(
            &self.picture.font_path,
            self.picture.font_size,
        )?);
        Ok(PictureParams {
            pattern: self.picture.pattern.clone(),
            font,
            font_color: Rgb(self.picture.font_color),
            background_color: Rgb(self.picture.background_color),
            block_size: self.picture.block_size,
            randomize_pixelization_origin_x: self.picture.randomize_origin_x,
            window_size: self.picture.window_size,
            offset_y: self.picture.offset_y,
        })
    }

    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            n_img_train: self.training.n_img_train,
            n_img_test: self.training.n_img_test,
            n_clusters: self.training.n_clusters,
            seed: self.training.seed,
        }
    }

    pub fn logging_params(&self) -> DepixResult<LoggingParams> {
        Ok(LoggingParams {
            module_level: parse_level(&self.logging.module_level)?,
            timer_level: parse_level(&self.logging.timer_level)?,
        })
    }

    /// Grid parameters when a `[grid]` section is present; absent lists
    /// fall back to the scalar values.
    pub fn grid_params(&self) -> DepixResult<Option<(PictureGridParams, TrainingGridParams)>> {
        let Some(grid) = &self.grid else {
            return Ok(None);
        };
        let picture = self.picture_params()?;

        let or_default = |values: &[u32], fallback: u32| -> Vec<u32> {
            if values.is_empty() {
                vec![fallback]
            } else {
                values.to_vec()
            }
        };

        let picture_grid = PictureGridParams {
            pattern: picture.pattern.clone(),
            font: picture.font.clone(),
            font_color: picture.font_color,
            background_color: picture.background_color,
            block_size: picture.block_size,
            randomize_pixelization_origin_x: picture.randomize_pixelization_origin_x,
            window_sizes: or_default(&grid.window_sizes, picture.window_size),
            offset_ys: if grid.offset_ys.is_empty() {
                vec![picture.offset_y]
            } else {
                grid.offset_ys.clone()
            },
        };
        let training_grid = TrainingGridParams {
            n_img_train: or_default(&grid.n_img_train, self.training.n_img_train),
            n_img_test: self.training.n_img_test,
            n_clusters: if grid.n_clusters.is_empty() {
                vec![self.training.n_clusters]
            } else {
                grid.n_clusters.clone()
            },
            seed: self.training.seed,
        };
        Ok(Some((picture_grid, training_grid)))
    }
}

fn parse_level(raw: &str) -> DepixResult<tracing::Level> {
    raw.parse()
        .map_err(|_| DepixError::Config(format!("invalid log level: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [picture]
        pattern = '\d{7}'
        font_path = "fonts/arial.ttf"
        font_size = 24.0
        block_size = 6

        [training]
        n_img_train = 10000
        n_img_test = 20
        n_clusters = 300
    "#;

    #[test]
    fn minimal_config_takes_defaults() {
        let config: FileConfig = toml::from_str(MINIMAL).unwrap();

        assert_eq!(config.picture.window_size, 5);
        assert_eq!(config.picture.offset_y, 0);
        assert!(!config.picture.randomize_origin_x);
        assert_eq!(config.picture.font_color, [0, 0, 0]);
        assert_eq!(config.picture.background_color, [255, 255, 255]);
        assert_eq!(config.logging.module_level, "info");
        assert!(config.grid.is_none());
        assert!(config.input_image.is_none());
    }

    #[test]
    fn logging_levels_parse_into_tracing_levels() {
        let mut config: FileConfig = toml::from_str(MINIMAL).unwrap();
        config.logging.module_level = "debug".into();
        config.logging.timer_level = "warn".into();

        let params = config.logging_params().unwrap();
        assert_eq!(params.module_level, tracing::Level::DEBUG);
        assert_eq!(params.timer_level, tracing::Level::WARN);

        config.logging.module_level = "noisy".into();
        assert!(matches!(
            config.logging_params(),
            Err(DepixError::Config(_))
        ));
    }

    #[test]
    fn grid_section_falls_back_to_scalar_values() {
        let with_grid = format!(
            "{MINIMAL}\n[grid]\nwindow_sizes = [3, 4]\noffset_ys = [0, 2]\n"
        );
        let config: FileConfig = toml::from_str(&with_grid).unwrap();
        let grid = config.grid.as_ref().unwrap();

        assert_eq!(grid.window_sizes, vec![3, 4]);
        assert_eq!(grid.offset_ys, vec![0, 2]);
        // Lists that were not given fall back at conversion time.
        assert!(grid.n_clusters.is_empty());
        assert!(grid.n_img_train.is_empty());
    }

    #[test]
    fn missing_training_section_is_an_error() {
        let broken = r#"
            [picture]
            pattern = '\d{7}'
            font_path = "fonts/arial.ttf"
            font_size = 24.0
            block_size = 6
        "#;
        assert!(toml::from_str::<FileConfig>(broken).is_err());
    }
}
