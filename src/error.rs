use std::path::PathBuf;

use thiserror::Error;

/// Error type shared by every module of the library.
#[derive(Error, Debug)]
pub enum WeedsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to load image at '{0}': {1}")]
    Image(PathBuf, image::ImageError),

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Training error: {0}")]
    Training(String),

    /// A restart would not move the global epoch forward.
    #[error(
        "epoch advancement is not positive: stopped at local epoch {stopped_epoch} \
         with patience {patience} (global epoch {global_epoch})"
    )]
    DegenerateAdvance {
        stopped_epoch: usize,
        patience: usize,
        global_epoch: usize,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Statistics error: {0}")]
    Stats(String),
}

pub type Result<T> = std::result::Result<T, WeedsError>;
