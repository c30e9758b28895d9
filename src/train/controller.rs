use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WeedsError};
use crate::train::ledger::{CheckpointId, CheckpointRecord, CheckpointWriter};
use crate::train::trainable::Trainable;

/// What to do when a restart would not move the global epoch forward
/// (`stopped_epoch - stopping_patience + 1 <= 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Abort the run with `WeedsError::DegenerateAdvance`.
    #[default]
    FailFast,
    /// Advance by exactly one epoch.
    ForceMinimum,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    pub max_epoch: usize,
    pub stopping_patience: usize,
    pub initial_lr: f64,
    pub advance_policy: AdvancePolicy,
}

impl ControllerConfig {
    fn validate(&self) -> Result<()> {
        if self.max_epoch == 0 {
            return Err(WeedsError::Config("max_epoch must be at least 1".into()));
        }
        if self.stopping_patience == 0 {
            return Err(WeedsError::Config("stopping_patience must be at least 1".into()));
        }
        if !self.initial_lr.is_finite() || self.initial_lr <= 0.0 {
            return Err(WeedsError::Config(format!("initial_lr {} must be positive", self.initial_lr)));
        }
        Ok(())
    }

    /// `initial_lr / 2^restarts`
    pub fn learning_rate(&self, restarts: usize) -> f64 {
        self.initial_lr / 2f64.powi(restarts as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Training,
    Selecting,
}

/// Why the training loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A fit ran its whole budget without early stopping.
    Completed,
    /// Early stopping fired but the rolled-forward global epoch reached `max_epoch`.
    BudgetExhausted,
}

/// Mutable state of one run, owned by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRunState {
    pub phase: ControllerPhase,
    pub global_epoch: usize,
    pub restart_count: usize,
    pub best_validation_losses: Vec<f64>,
    pub best_epochs: Vec<usize>,
    pub checkpoints: Vec<CheckpointId>,
    /// Sum of the epochs every fit actually ran, rolled-back ones included.
    pub epochs_trained: usize,
}

impl TrainingRunState {
    fn new() -> Self {
        TrainingRunState {
            phase: ControllerPhase::Training,
            global_epoch: 0,
            restart_count: 0,
            best_validation_losses: Vec::new(),
            best_epochs: Vec::new(),
            checkpoints: Vec::new(),
            epochs_trained: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub state: TrainingRunState,
    pub termination: Termination,
    /// Index into `state.checkpoints` of the reloaded checkpoint.
    pub selected: usize,
}

impl RunOutcome {
    pub fn selected_checkpoint(&self) -> &CheckpointId {
        &self.state.checkpoints[self.selected]
    }

    pub fn selected_loss(&self) -> f64 {
        self.state.best_validation_losses[self.selected]
    }

    pub fn records(&self) -> Vec<CheckpointRecord> {
        self.state.checkpoints.iter()
            .zip(&self.state.best_epochs)
            .zip(&self.state.best_validation_losses)
            .map(|((id, &global_epoch), &validation_loss)| CheckpointRecord {
                file_name: id.file_name.clone(),
                global_epoch,
                validation_loss,
            })
            .collect()
    }
}

/// Restart-on-stagnation training.
///
/// Repeatedly fits `model` against a global epoch budget.
/// Each time early stopping fires, the global epoch is rolled forward to just
/// past the best epoch of that run (the model resumes from the restored best
/// weights), the learning rate is halved relative to the initial rate, and a
/// new checkpoint slot is allocated. When the budget is spent, or a fit runs
/// to completion, the checkpoint with the lowest validation loss across all
/// restarts is reloaded.
///
/// Errors from the model or the writer are returned untouched.
pub fn run<M, W>(model: &mut M, writer: &mut W, config: &ControllerConfig) -> Result<RunOutcome>
where
    M: Trainable + ?Sized,
    W: CheckpointWriter + ?Sized,
{
    config.validate()?;
    let mut state = TrainingRunState::new();
    state.checkpoints.push(writer.slot(0)?);

    let termination = loop {
        let budget = config.max_epoch - state.global_epoch;
        let checkpoint = state.checkpoints[state.restart_count].clone();
        let history = model.fit(budget, state.global_epoch, &checkpoint)?;

        if history.epochs_run() > budget {
            return Err(WeedsError::Training(format!(
                "fit ran {} epochs with a budget of {}",
                history.epochs_run(),
                budget
            )));
        }
        let (best_local, best_loss) = history.best().ok_or_else(|| {
            WeedsError::Training(format!("fit with budget {} returned no epochs", budget))
        })?;
        state.epochs_trained += history.epochs_run();

        let best_epoch = state.global_epoch + best_local;
        state.best_validation_losses.push(best_loss);
        state.best_epochs.push(best_epoch);
        writer.record(&CheckpointRecord {
            file_name: checkpoint.file_name,
            global_epoch: best_epoch,
            validation_loss: best_loss,
        })?;

        if !history.stagnated() {
            info!(max_epoch = config.max_epoch, restarts = state.restart_count, "completed training");
            break Termination::Completed;
        }

        let advance = epoch_advance(&state, history.stopped_epoch, config)?;
        state.global_epoch = (state.global_epoch + advance).min(config.max_epoch);
        info!(
            local_epoch = history.stopped_epoch,
            global_epoch = state.global_epoch,
            best_val_loss = best_loss,
            best_global_epoch = best_epoch,
            "early stopping triggered"
        );

        if state.global_epoch >= config.max_epoch {
            break Termination::BudgetExhausted;
        }

        state.restart_count += 1;
        let lr = config.learning_rate(state.restart_count);
        info!(restart = state.restart_count, learning_rate = lr, "restarting from last best weights");
        model.recompile(lr)?;
        state.checkpoints.push(writer.slot(state.restart_count)?);
    };

    state.phase = ControllerPhase::Selecting;
    let selected = select_best(&state.best_validation_losses)
        .ok_or_else(|| WeedsError::Training("no restart produced a checkpoint".into()))?;
    info!(
        checkpoint = %state.checkpoints[selected].file_name,
        val_loss = state.best_validation_losses[selected],
        "reloading best checkpoint"
    );
    model.restore(&state.checkpoints[selected])?;

    Ok(RunOutcome { state, termination, selected })
}

fn epoch_advance(state: &TrainingRunState, stopped_epoch: usize, config: &ControllerConfig) -> Result<usize> {
    let advance = stopped_epoch as i64 - config.stopping_patience as i64 + 1;
    if advance > 0 {
        return Ok(advance as usize);
    }
    match config.advance_policy {
        AdvancePolicy::FailFast => Err(WeedsError::DegenerateAdvance {
            stopped_epoch,
            patience: config.stopping_patience,
            global_epoch: state.global_epoch,
        }),
        AdvancePolicy::ForceMinimum => {
            warn!(
                stopped_epoch,
                patience = config.stopping_patience,
                global_epoch = state.global_epoch,
                "non-positive epoch advance, forcing one epoch"
            );
            Ok(1)
        }
    }
}

/// Index of the lowest loss. The first occurrence wins ties and a NaN loss
/// never beats a number.
pub fn select_best(losses: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &loss) in losses.iter().enumerate() {
        best = match best {
            None => Some(i),
            Some(b) if losses[b].is_nan() && !loss.is_nan() => Some(i),
            Some(b) if loss < losses[b] => Some(i),
            keep => keep,
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::history::FitHistory;
    use crate::train::ledger::checkpoint_file_name;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    /// Replays scripted fit results and records every call made to it.
    #[derive(Default)]
    struct ScriptedModel {
        script: VecDeque<FitHistory>,
        budgets: Vec<usize>,
        starts: Vec<usize>,
        learning_rates: Vec<f64>,
        restored: Option<CheckpointId>,
        fail_on_call: Option<usize>,
    }

    impl ScriptedModel {
        fn new(script: Vec<(Vec<f64>, usize)>) -> Self {
            ScriptedModel {
                script: script.into_iter().map(|(l, s)| FitHistory::from_val_losses(l, s)).collect(),
                ..Default::default()
            }
        }
    }

    impl Trainable for ScriptedModel {
        fn fit(&mut self, budget: usize, global_epoch: usize, _cp: &CheckpointId) -> Result<FitHistory> {
            if self.fail_on_call == Some(self.budgets.len()) {
                return Err(WeedsError::Training("device lost".into()));
            }
            self.budgets.push(budget);
            self.starts.push(global_epoch);
            Ok(self.script.pop_front().unwrap_or_else(|| FitHistory::from_val_losses(vec![1.0], 0)))
        }

        fn recompile(&mut self, learning_rate: f64) -> Result<()> {
            self.learning_rates.push(learning_rate);
            Ok(())
        }

        fn restore(&mut self, checkpoint: &CheckpointId) -> Result<()> {
            self.restored = Some(checkpoint.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryWriter {
        records: Vec<CheckpointRecord>,
        fail_record: bool,
    }

    impl CheckpointWriter for MemoryWriter {
        fn slot(&mut self, restart: usize) -> Result<CheckpointId> {
            Ok(CheckpointId {
                restart,
                file_name: checkpoint_file_name(restart),
                path: PathBuf::from(checkpoint_file_name(restart)),
            })
        }

        fn record(&mut self, record: &CheckpointRecord) -> Result<()> {
            if self.fail_record {
                return Err(WeedsError::Checkpoint("disk full".into()));
            }
            self.records.push(record.clone());
            Ok(())
        }
    }

    fn config(max_epoch: usize, stopping_patience: usize) -> ControllerConfig {
        ControllerConfig { max_epoch, stopping_patience, initial_lr: 1e-4, advance_policy: AdvancePolicy::FailFast }
    }

    #[test]
    fn stagnation_then_completion() {
        let mut model = ScriptedModel::new(vec![
            (vec![0.9, 0.5, 0.6, 0.7], 4),
            (vec![0.55, 0.45, 0.47], 0),
        ]);
        let mut writer = MemoryWriter::default();
        let out = run(&mut model, &mut writer, &config(10, 3)).unwrap();

        assert_eq!(model.budgets, vec![10, 8]);
        assert_eq!(model.starts, vec![0, 2]);
        assert_eq!(out.state.best_validation_losses, vec![0.5, 0.45]);
        assert_eq!(out.state.best_epochs, vec![1, 3]);
        assert_eq!(out.state.global_epoch, 2);
        assert_eq!(out.state.restart_count, 1);
        assert_eq!(out.termination, Termination::Completed);
        assert_eq!(out.state.phase, ControllerPhase::Selecting);
        assert_eq!(out.selected, 1);
        assert_eq!(model.restored.unwrap().file_name, "lastbest-1.json");
        assert_eq!(model.learning_rates, vec![5e-5]);
        assert_eq!(writer.records, out.records());
    }

    #[test]
    fn earlier_restart_can_win_selection() {
        let mut model = ScriptedModel::new(vec![
            (vec![0.9, 0.2, 0.6, 0.7], 4),
            (vec![0.4, 0.3], 0),
        ]);
        let out = run(&mut model, &mut MemoryWriter::default(), &config(10, 3)).unwrap();
        assert_eq!(out.selected, 0);
        assert_eq!(out.selected_loss(), 0.2);
        assert_eq!(model.restored.unwrap().restart, 0);
    }

    #[test]
    fn three_restarts_select_global_minimum() {
        let mut model = ScriptedModel::new(vec![
            (vec![0.8, 0.6, 0.7, 0.75], 3),
            (vec![0.5, 0.3, 0.4, 0.45], 3),
            (vec![0.35, 0.36, 0.37], 2),
            (vec![0.33], 0),
        ]);
        let out = run(&mut model, &mut MemoryWriter::default(), &config(20, 2)).unwrap();
        assert_eq!(out.state.restart_count, 3);
        assert_eq!(out.state.best_validation_losses, vec![0.6, 0.3, 0.35, 0.33]);
        assert_eq!(out.selected, 1);
        assert_eq!(model.learning_rates, vec![5e-5, 2.5e-5, 1.25e-5]);
        assert_eq!(model.starts, vec![0, 2, 4, 5]);
    }

    #[test]
    fn patience_beyond_budget_trains_once_with_full_budget() {
        let mut model = ScriptedModel::new(vec![(vec![0.9, 0.8, 0.85, 0.7, 0.75], 0)]);
        let out = run(&mut model, &mut MemoryWriter::default(), &config(5, 32)).unwrap();
        assert_eq!(model.budgets, vec![5]);
        assert_eq!(out.state.global_epoch, 0);
        assert_eq!(out.state.restart_count, 0);
        assert_eq!(out.state.best_epochs, vec![3]);
    }

    #[test]
    fn advance_past_budget_stops_without_restart() {
        let mut model = ScriptedModel::new(vec![(vec![0.5, 0.6, 0.7, 0.8, 0.9, 1.0], 9)]);
        let out = run(&mut model, &mut MemoryWriter::default(), &config(6, 2)).unwrap();
        assert_eq!(out.termination, Termination::BudgetExhausted);
        assert_eq!(out.state.global_epoch, 6);
        assert_eq!(out.state.restart_count, 0);
        assert_eq!(out.state.best_validation_losses.len(), 1);
        assert!(model.learning_rates.is_empty());
    }

    #[test]
    fn degenerate_advance_fails_fast() {
        let mut model = ScriptedModel::new(vec![(vec![0.5, 0.6], 1)]);
        let err = run(&mut model, &mut MemoryWriter::default(), &config(10, 3)).unwrap_err();
        assert!(matches!(
            err,
            WeedsError::DegenerateAdvance { stopped_epoch: 1, patience: 3, global_epoch: 0 }
        ));
    }

    #[test]
    fn degenerate_advance_can_be_forced_forward() {
        let mut model = ScriptedModel::new(vec![(vec![0.5, 0.6], 1), (vec![0.4], 0)]);
        let cfg = ControllerConfig { advance_policy: AdvancePolicy::ForceMinimum, ..config(10, 3) };
        let out = run(&mut model, &mut MemoryWriter::default(), &cfg).unwrap();
        assert_eq!(model.starts, vec![0, 1]);
        assert_eq!(out.state.restart_count, 1);
    }

    #[test]
    fn model_failure_propagates() {
        let mut model = ScriptedModel::new(vec![(vec![0.9, 0.5, 0.6, 0.7], 4)]);
        model.fail_on_call = Some(1);
        let err = run(&mut model, &mut MemoryWriter::default(), &config(10, 3)).unwrap_err();
        assert!(matches!(err, WeedsError::Training(ref m) if m == "device lost"));
        assert!(model.restored.is_none());
    }

    #[test]
    fn ledger_failure_propagates() {
        let mut model = ScriptedModel::new(vec![(vec![0.5], 0)]);
        let mut writer = MemoryWriter { fail_record: true, ..Default::default() };
        assert!(matches!(run(&mut model, &mut writer, &config(3, 1)), Err(WeedsError::Checkpoint(_))));
    }

    #[test]
    fn overlong_or_empty_histories_are_rejected() {
        let mut model = ScriptedModel::new(vec![(vec![0.5; 4], 0)]);
        assert!(run(&mut model, &mut MemoryWriter::default(), &config(3, 1)).is_err());

        let mut model = ScriptedModel::new(vec![(vec![], 0)]);
        assert!(run(&mut model, &mut MemoryWriter::default(), &config(3, 1)).is_err());
    }

    #[test]
    fn invalid_config_is_rejected_before_training() {
        let mut model = ScriptedModel::default();
        assert!(run(&mut model, &mut MemoryWriter::default(), &config(0, 1)).is_err());
        assert!(run(&mut model, &mut MemoryWriter::default(), &config(3, 0)).is_err());
        assert!(model.budgets.is_empty());
    }

    #[test]
    fn select_best_tie_and_nan_rules() {
        assert_eq!(select_best(&[0.3, 0.2, 0.2]), Some(1));
        assert_eq!(select_best(&[f64::NAN, 0.9]), Some(1));
        assert_eq!(select_best(&[0.9, f64::NAN]), Some(0));
        assert_eq!(select_best(&[]), None);
    }
}
