use std::path::PathBuf;

use rand::rngs::StdRng;

use crate::data::samples::SampleSource;
use crate::error::Result;
use crate::network::Network;
use crate::optim::Adam;
use crate::train::callbacks::{CsvLogger, EarlyStopping, FitCallbacks, ModelCheckpoint, ReduceLrOnPlateau};
use crate::train::history::FitHistory;
use crate::train::ledger::CheckpointId;
use crate::train::loop_fn::fit;
use crate::train::train_config::FitConfig;

/// A model the restart controller can drive.
pub trait Trainable {
    /// Trains for at most `epoch_budget` epochs, persisting the best weights
    /// of this run to `checkpoint`. `global_epoch` is the number of epochs
    /// already counted against the budget.
    fn fit(&mut self, epoch_budget: usize, global_epoch: usize, checkpoint: &CheckpointId) -> Result<FitHistory>;

    /// Sets the learning rate and discards optimizer state.
    fn recompile(&mut self, learning_rate: f64) -> Result<()>;

    /// Replaces the current weights with those stored in `checkpoint`.
    fn restore(&mut self, checkpoint: &CheckpointId) -> Result<()>;
}

/// Callback settings applied to every fit of a [`NetworkModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub batch_size: usize,
    pub stopping_patience: usize,
    pub lr_patience: usize,
    pub lr_factor: f64,
    pub min_lr: f64,
    /// Metrics CSV shared by all restarts; `None` disables logging.
    pub metrics_log: Option<PathBuf>,
}

/// A [`Network`] bound to its data, optimizer and callback schedule.
pub struct NetworkModel<T: SampleSource, V: SampleSource> {
    pub network: Network,
    pub optimizer: Adam,
    train: T,
    val: V,
    schedule: Schedule,
    rng: StdRng,
}

impl<T: SampleSource, V: SampleSource> NetworkModel<T, V> {
    pub fn new(network: Network, learning_rate: f64, train: T, val: V, schedule: Schedule, rng: StdRng) -> Self {
        NetworkModel { network, optimizer: Adam::new(learning_rate), train, val, schedule, rng }
    }

    pub fn into_network(self) -> Network {
        self.network
    }
}

impl<T: SampleSource, V: SampleSource> Trainable for NetworkModel<T, V> {
    fn fit(&mut self, epoch_budget: usize, global_epoch: usize, checkpoint: &CheckpointId) -> Result<FitHistory> {
        let s = &self.schedule;
        let mut callbacks = FitCallbacks {
            checkpoint: Some(ModelCheckpoint::new(&checkpoint.path)),
            early_stopping: Some(EarlyStopping::new(s.stopping_patience).with_restore_best()),
            reduce_lr: Some(ReduceLrOnPlateau::new(s.lr_factor, s.lr_patience, s.min_lr)),
            csv_logger: s.metrics_log.as_ref().map(CsvLogger::new),
        };
        let config = FitConfig::new(epoch_budget, s.batch_size).starting_at(global_epoch);
        fit(
            &mut self.network,
            &mut self.optimizer,
            &self.train,
            &self.val,
            &config,
            &mut callbacks,
            &mut self.rng,
        )
    }

    fn recompile(&mut self, learning_rate: f64) -> Result<()> {
        self.optimizer.set_learning_rate(learning_rate);
        self.optimizer.reset();
        Ok(())
    }

    fn restore(&mut self, checkpoint: &CheckpointId) -> Result<()> {
        self.network = Network::load_json(&checkpoint.path)?;
        Ok(())
    }
}
