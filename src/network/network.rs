use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WeedsError};
use crate::layers::dense::Dense;
use crate::loss::LossType;
use crate::network::metadata::ModelMetadata;
use crate::network::spec::ModelSpec;

/// A feed-forward network plus the loss it is trained with.
/// The serialized form is the checkpoint format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Dense>,
    pub loss: LossType,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl Network {
    pub fn from_spec<R: Rng + ?Sized>(spec: &ModelSpec, rng: &mut R) -> Result<Network> {
        spec.validate()?;
        let mut input_size = spec.input_size;
        let layers = spec.layers.iter()
            .map(|l| {
                let layer = Dense::new(l.size, input_size, l.activation.clone(), rng);
                input_size = l.size;
                layer
            })
            .collect();
        Ok(Network { layers, loss: spec.loss, metadata: spec.metadata.clone() })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size()).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    /// Forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for layer in &mut self.layers {
            current = layer.forward(&current);
        }
        current
    }

    /// Forward pass without caching, for evaluation and inference.
    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.predict(&current);
        }
        current
    }

    /// Refuses to write parameters that JSON cannot represent (NaN, ±inf).
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let diverged = self.layers.iter().position(|l| {
            l.weights.data.iter().chain(&l.biases.data).any(|x| !x.is_finite())
        });
        if let Some(i) = diverged {
            return Err(WeedsError::Checkpoint(format!(
                "not saving '{}': layer {} has non-finite parameters",
                path.display(),
                i
            )));
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Network> {
        let file = std::fs::File::open(path)
            .map_err(|e| WeedsError::Checkpoint(format!("cannot open '{}': {}", path.display(), e)))?;
        let network: Network = serde_json::from_reader(std::io::BufReader::new(file))?;
        if network.layers.is_empty() {
            return Err(WeedsError::Checkpoint(format!("'{}' contains no layers", path.display())));
        }
        Ok(network)
    }
}
