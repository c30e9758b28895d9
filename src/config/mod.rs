pub mod run_config;

pub use run_config::{DataConfig, PathsConfig, RunConfig, TrainingConfig, DEEPWEEDS_CLASSES};
