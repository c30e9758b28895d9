use tracing::info;

use crate::network::Network;

/// Stops a fit once validation loss has not improved for `patience` epochs.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    restore_best: bool,
    best: f64,
    wait: usize,
    /// 0 until triggered, then the 0-based epoch it fired on.
    pub stopped_epoch: usize,
    best_weights: Option<Network>,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        EarlyStopping {
            patience,
            restore_best: false,
            best: f64::INFINITY,
            wait: 0,
            stopped_epoch: 0,
            best_weights: None,
        }
    }

    /// Roll the network back to its best epoch when stopping.
    pub fn with_restore_best(mut self) -> Self {
        self.restore_best = true;
        self
    }

    pub fn on_train_begin(&mut self) {
        self.best = f64::INFINITY;
        self.wait = 0;
        self.stopped_epoch = 0;
        self.best_weights = None;
    }

    /// Returns `true` when training should stop after `epoch`.
    pub fn on_epoch_end(&mut self, epoch: usize, val_loss: f64, network: &mut Network) -> bool {
        if val_loss < self.best {
            self.best = val_loss;
            self.wait = 0;
            if self.restore_best {
                self.best_weights = Some(network.clone());
            }
            return false;
        }

        self.wait += 1;
        if self.wait < self.patience {
            return false;
        }

        self.stopped_epoch = epoch;
        if let Some(best) = self.best_weights.take() {
            *network = best;
        }
        info!(
            epoch,
            patience = self.patience,
            best_val_loss = self.best,
            "early stopping"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ModelSpec;
    use rand::{rngs::StdRng, SeedableRng};

    fn net(seed: u64) -> Network {
        Network::from_spec(&ModelSpec::dense_head(2, 2, 2), &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn fires_after_patience_non_improving_epochs() {
        let mut es = EarlyStopping::new(3);
        let mut n = net(0);
        es.on_train_begin();
        let losses = [0.9, 0.5, 0.6, 0.7, 0.55];
        let stops: Vec<bool> = losses.iter().enumerate()
            .map(|(e, &l)| es.on_epoch_end(e, l, &mut n))
            .collect();
        assert_eq!(stops, vec![false, false, false, false, true]);
        assert_eq!(es.stopped_epoch, 4);
    }

    #[test]
    fn restores_best_weights_on_stop() {
        let mut es = EarlyStopping::new(1).with_restore_best();
        es.on_train_begin();
        let mut n = net(1);
        let at_best = n.predict(&[0.3, 0.3]);
        assert!(!es.on_epoch_end(0, 0.2, &mut n));
        n = net(2);
        assert!(es.on_epoch_end(1, 0.4, &mut n));
        assert_eq!(n.predict(&[0.3, 0.3]), at_best);
    }

    #[test]
    fn nan_counts_as_no_improvement() {
        let mut es = EarlyStopping::new(2);
        es.on_train_begin();
        let mut n = net(3);
        es.on_epoch_end(0, 1.0, &mut n);
        assert!(!es.on_epoch_end(1, f64::NAN, &mut n));
        assert!(es.on_epoch_end(2, f64::NAN, &mut n));
    }

    #[test]
    fn train_begin_resets_marker() {
        let mut es = EarlyStopping::new(1);
        let mut n = net(4);
        es.on_epoch_end(0, 1.0, &mut n);
        es.on_epoch_end(1, 2.0, &mut n);
        assert_eq!(es.stopped_epoch, 1);
        es.on_train_begin();
        assert_eq!(es.stopped_epoch, 0);
    }
}
