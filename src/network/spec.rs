use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::ActivationFunction;
use crate::error::{Result, WeedsError};
use crate::loss::LossType;
use crate::network::metadata::ModelMetadata;

/// One layer of a [`ModelSpec`]. The input width is implied by the previous
/// layer (or by `ModelSpec::input_size` for the first one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub activation: ActivationFunction,
}

/// Architecture of a classifier, saved independently of its weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Used as the model file stem.
    pub name: String,
    pub input_size: usize,
    pub layers: Vec<LayerSpec>,
    pub loss: LossType,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl ModelSpec {
    /// Hidden ReLU layer followed by one sigmoid unit per class trained with
    /// binary cross-entropy: the classification head used for DeepWeeds.
    pub fn dense_head(input_size: usize, hidden: usize, n_classes: usize) -> ModelSpec {
        ModelSpec {
            name: "dense".into(),
            input_size,
            layers: vec![
                LayerSpec { size: hidden, activation: ActivationFunction::ReLU },
                LayerSpec { size: n_classes, activation: ActivationFunction::Sigmoid },
            ],
            loss: LossType::BinaryCrossEntropy,
            metadata: ModelMetadata::default(),
        }
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(WeedsError::Config(format!("model '{}': input_size must be positive", self.name)));
        }
        if self.layers.is_empty() {
            return Err(WeedsError::Config(format!("model '{}': no layers", self.name)));
        }
        if let Some(i) = self.layers.iter().position(|l| l.size == 0) {
            return Err(WeedsError::Config(format!("model '{}': layer {} has zero units", self.name, i)));
        }
        let softmax_inside = self.layers[..self.layers.len() - 1]
            .iter()
            .any(|l| l.activation == ActivationFunction::Softmax);
        if softmax_inside {
            return Err(WeedsError::Config(format!(
                "model '{}': softmax is only supported on the output layer",
                self.name
            )));
        }
        let output = &self.layers[self.layers.len() - 1].activation;
        match (output, self.loss) {
            (ActivationFunction::Softmax, LossType::CrossEntropy) => Ok(()),
            (ActivationFunction::Softmax, loss) => Err(WeedsError::Config(format!(
                "model '{}': softmax output must be trained with cross_entropy, not {:?}",
                self.name, loss
            ))),
            (act, LossType::CrossEntropy) => Err(WeedsError::Config(format!(
                "model '{}': cross_entropy needs a softmax output layer, not {:?}",
                self.name, act
            ))),
            _ => Ok(()),
        }
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<ModelSpec> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}
