use serde::{Serialize, Deserialize};

/// Clip bound for probabilities fed to a logarithm.
const BCE_EPS: f64 = 1e-7;
const CE_EPS: f64 = 1e-12;

/// Loss minimised by the fit loop, paired with the output activation.
///
/// - `Mse`: Identity or Sigmoid output.
/// - `CrossEntropy`: Softmax output; the gradient is taken w.r.t. the logits.
/// - `BinaryCrossEntropy`: Sigmoid output with one independent probability
///   per class, which is what the weed classifier head uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    Mse,
    CrossEntropy,
    BinaryCrossEntropy,
}

impl LossType {
    /// Scalar loss of one sample.
    pub fn loss(self, predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        let pairs = predicted.iter().zip(expected);
        match self {
            LossType::Mse => pairs.map(|(p, y)| (p - y).powi(2)).sum::<f64>() / n,
            LossType::CrossEntropy => pairs.map(|(p, y)| -y * (p + CE_EPS).ln()).sum(),
            LossType::BinaryCrossEntropy => pairs
                .map(|(&p, y)| {
                    let p = p.clamp(BCE_EPS, 1.0 - BCE_EPS);
                    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
                })
                .sum::<f64>() / n,
        }
    }

    /// ∂L/∂a for the output layer. For `CrossEntropy` this is already the
    /// gradient w.r.t. the Softmax inputs, `predicted - expected`.
    pub fn derivative(self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        let n = predicted.len() as f64;
        let pairs = predicted.iter().zip(expected);
        match self {
            LossType::Mse => pairs.map(|(p, y)| 2.0 * (p - y) / n).collect(),
            LossType::CrossEntropy => pairs.map(|(p, y)| p - y).collect(),
            LossType::BinaryCrossEntropy => pairs
                .map(|(&p, y)| {
                    let p = p.clamp(BCE_EPS, 1.0 - BCE_EPS);
                    (p - y) / (p * (1.0 - p) * n)
                })
                .collect(),
        }
    }
}
