use tracing::info;

/// Multiplies the learning rate by `factor` when validation loss plateaus.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    factor: f64,
    patience: usize,
    min_lr: f64,
    min_delta: f64,
    best: f64,
    wait: usize,
}

impl ReduceLrOnPlateau {
    pub fn new(factor: f64, patience: usize, min_lr: f64) -> Self {
        ReduceLrOnPlateau {
            factor,
            patience,
            min_lr,
            min_delta: 1e-4,
            best: f64::INFINITY,
            wait: 0,
        }
    }

    pub fn on_train_begin(&mut self) {
        self.best = f64::INFINITY;
        self.wait = 0;
    }

    /// Returns the new learning rate when it should change.
    pub fn on_epoch_end(&mut self, val_loss: f64, current_lr: f64) -> Option<f64> {
        if val_loss < self.best - self.min_delta {
            self.best = val_loss;
            self.wait = 0;
            return None;
        }
        self.wait += 1;
        if self.wait < self.patience {
            return None;
        }
        self.wait = 0;
        if current_lr <= self.min_lr {
            return None;
        }
        let new_lr = (current_lr * self.factor).max(self.min_lr);
        info!(from = current_lr, to = new_lr, "reducing learning rate");
        Some(new_lr)
    }
}
