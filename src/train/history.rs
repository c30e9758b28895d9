/// Result of one bounded fit, in the shape the controller reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitHistory {
    /// One validation loss per completed epoch.
    pub val_loss: Vec<f64>,
    /// 0 when the fit ran its full budget, otherwise the 0-based local epoch
    /// at which early stopping ran out of patience.
    pub stopped_epoch: usize,
}

impl FitHistory {
    pub fn from_val_losses(val_loss: Vec<f64>, stopped_epoch: usize) -> FitHistory {
        FitHistory { val_loss, stopped_epoch }
    }

    pub fn epochs_run(&self) -> usize {
        self.val_loss.len()
    }

    pub fn stagnated(&self) -> bool {
        self.stopped_epoch != 0
    }

    /// `(local_epoch, loss)` of the lowest validation loss; the first
    /// occurrence wins ties and NaN losses are skipped. A history made only
    /// of NaN yields `(0, NaN)`.
    pub fn best(&self) -> Option<(usize, f64)> {
        if self.val_loss.is_empty() {
            return None;
        }
        let best = self.val_loss.iter()
            .enumerate()
            .filter(|(_, l)| !l.is_nan())
            .fold(None, |acc: Option<(usize, f64)>, (i, &l)| match acc {
                Some((_, b)) if b <= l => acc,
                _ => Some((i, l)),
            });
        Some(best.unwrap_or((0, f64::NAN)))
    }
}
