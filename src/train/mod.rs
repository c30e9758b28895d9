pub mod callbacks;
pub mod controller;
pub mod epoch_stats;
pub mod history;
pub mod ledger;
pub mod loop_fn;
pub mod train_config;
pub mod trainable;

pub use controller::{run, AdvancePolicy, ControllerConfig, ControllerPhase, RunOutcome, Termination, TrainingRunState};
pub use epoch_stats::EpochStats;
pub use history::FitHistory;
pub use ledger::{CheckpointDir, CheckpointId, CheckpointRecord, CheckpointWriter};
pub use loop_fn::{argmax, evaluate, fit};
pub use train_config::FitConfig;
pub use trainable::{NetworkModel, Schedule, Trainable};
