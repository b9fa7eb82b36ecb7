use thiserror::Error;

#[derive(Debug, Error)]
pub enum DepixError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Clustering error: {0}")]
    Clustering(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type DepixResult<T> = Result<T, DepixError>;
