use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeedsError};
use crate::train::controller::{AdvancePolicy, ControllerConfig};
use crate::train::trainable::Schedule;

pub const DEEPWEEDS_CLASSES: [&str; 9] = [
    "Chinee Apple",
    "Lantana",
    "Parkinsonia",
    "Parthenium",
    "Prickly Acacia",
    "Rubber Vine",
    "Siam Weed",
    "Snake Weed",
    "Negatives",
];

/// Everything a cross-validation or inference run needs, loaded from TOML.
/// Missing keys fall back to the DeepWeeds defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub paths: PathsConfig,
    pub data: DataConfig,
    pub training: TrainingConfig,
    /// Seeds weight init, shuffling and augmentation.
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: PathBuf,
    pub label_dir: PathBuf,
    pub image_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Size images are resized to before cropping (training and validation).
    pub raw_image_size: [u32; 2],
    /// Network input size; test images are resized straight to it.
    pub image_size: [u32; 2],
    pub batch_size: usize,
    pub folds: usize,
    pub class_names: Vec<String>,
    /// Class assigned when no score beats a uniform guess.
    pub negative_class: Option<usize>,
    pub augment: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub max_epoch: usize,
    pub stopping_patience: usize,
    pub lr_patience: usize,
    pub lr_factor: f64,
    pub initial_lr: f64,
    pub min_lr: f64,
    /// Width of the hidden layer of the built-in dense head.
    pub hidden_units: usize,
    pub advance_policy: AdvancePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            paths: PathsConfig::default(),
            data: DataConfig::default(),
            training: TrainingConfig::default(),
            seed: 0,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            output_dir: PathBuf::from("./outputs/"),
            label_dir: PathBuf::from("./weed-gan/labels/"),
            image_dir: PathBuf::from("./images/"),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            raw_image_size: [256, 256],
            image_size: [224, 224],
            batch_size: 64,
            folds: 5,
            class_names: DEEPWEEDS_CLASSES.iter().map(|s| s.to_string()).collect(),
            negative_class: Some(8),
            augment: true,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            max_epoch: 5,
            stopping_patience: 32,
            lr_patience: 16,
            lr_factor: 0.5,
            initial_lr: 1e-4,
            min_lr: 3.125e-6,
            hidden_units: 128,
            advance_policy: AdvancePolicy::FailFast,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<RunConfig> {
        let contents = std::fs::read_to_string(path)?;
        let config = RunConfig::from_toml_str(&contents)?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<RunConfig> {
        let config: RunConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn n_classes(&self) -> usize {
        self.data.class_names.len()
    }

    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            max_epoch: self.training.max_epoch,
            stopping_patience: self.training.stopping_patience,
            initial_lr: self.training.initial_lr,
            advance_policy: self.training.advance_policy,
        }
    }

    /// Callback schedule for every fit of a run. Shares `stopping_patience`
    /// with `controller()`, which the epoch advance depends on.
    pub fn schedule(&self, metrics_log: Option<PathBuf>) -> Schedule {
        let t = &self.training;
        Schedule {
            batch_size: self.data.batch_size,
            stopping_patience: t.stopping_patience,
            lr_patience: t.lr_patience,
            lr_factor: t.lr_factor,
            min_lr: t.min_lr,
            metrics_log,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.data;
        let t = &self.training;
        let fail = |msg: String| Err(WeedsError::Config(msg));

        if t.max_epoch == 0 {
            return fail("training.max_epoch must be at least 1".into());
        }
        if t.stopping_patience == 0 {
            return fail("training.stopping_patience must be at least 1".into());
        }
        if t.lr_patience == 0 {
            return fail("training.lr_patience must be at least 1".into());
        }
        if !t.initial_lr.is_finite() || t.initial_lr <= 0.0 || t.min_lr.is_nan() || t.min_lr < 0.0 {
            return fail(format!("invalid learning rates: initial {} min {}", t.initial_lr, t.min_lr));
        }
        if t.lr_factor.is_nan() || t.lr_factor <= 0.0 || t.lr_factor >= 1.0 {
            return fail(format!("training.lr_factor {} must be in (0, 1)", t.lr_factor));
        }
        if t.hidden_units == 0 {
            return fail("training.hidden_units must be at least 1".into());
        }
        if d.batch_size == 0 {
            return fail("data.batch_size must be at least 1".into());
        }
        if d.folds == 0 {
            return fail("data.folds must be at least 1".into());
        }
        if d.class_names.is_empty() {
            return fail("data.class_names must not be empty".into());
        }
        if let Some(neg) = d.negative_class {
            if neg >= d.class_names.len() {
                return fail(format!("data.negative_class {} is not a class index", neg));
            }
        }
        if d.image_size.contains(&0) {
            return fail("data.image_size must be positive".into());
        }
        if d.image_size[0] > d.raw_image_size[0] || d.image_size[1] > d.raw_image_size[1] {
            return fail(format!(
                "data.image_size {:?} exceeds data.raw_image_size {:?}",
                d.image_size, d.raw_image_size
            ));
        }
        Ok(())
    }
}
