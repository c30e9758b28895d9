use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;
use crate::network::Network;

/// Writes the network to disk whenever validation loss reaches a new best.
#[derive(Debug, Clone)]
pub struct ModelCheckpoint {
    path: PathBuf,
    best: f64,
    pub saves: usize,
}

impl ModelCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ModelCheckpoint { path: path.into(), best: f64::INFINITY, saves: 0 }
    }

    pub fn on_epoch_end(&mut self, epoch: usize, val_loss: f64, network: &Network) -> Result<()> {
        if val_loss < self.best {
            debug!(epoch, from = self.best, to = val_loss, path = %self.path.display(), "val_loss improved, saving");
            self.best = val_loss;
            network.save_json(&self.path)?;
            self.saves += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ModelSpec;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn saves_only_on_improvement() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lastbest-0.json");
        let net = Network::from_spec(&ModelSpec::dense_head(2, 2, 2), &mut StdRng::seed_from_u64(0)).unwrap();
        let mut cp = ModelCheckpoint::new(&path);
        for (e, l) in [0.8, 0.9, 0.7, f64::NAN].into_iter().enumerate() {
            cp.on_epoch_end(e, l, &net).unwrap();
        }
        assert_eq!(cp.saves, 2);
        assert!(path.exists());
    }

    #[test]
    fn unwritable_path_propagates() {
        let net = Network::from_spec(&ModelSpec::dense_head(2, 2, 2), &mut StdRng::seed_from_u64(0)).unwrap();
        let mut cp = ModelCheckpoint::new("/nonexistent-dir/lastbest-0.json");
        assert!(cp.on_epoch_end(0, 0.1, &net).is_err());
    }
}
