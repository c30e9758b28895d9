use serde::{Serialize, Deserialize};

/// Statistics for one completed epoch of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 0-based epoch index within this fit.
    pub epoch: usize,
    /// `epoch` offset by the epochs already completed before this fit.
    pub global_epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    /// Fraction in [0, 1] of samples whose argmax matches the label.
    pub train_accuracy: f64,
    pub val_accuracy: f64,
    /// Learning rate used during this epoch.
    pub learning_rate: f64,
    pub elapsed_ms: u64,
}
