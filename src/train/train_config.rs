/// Per-fit settings for `loop_fn::fit`.
///
/// `epochs` is the remaining budget for this call; the last mini-batch of an
/// epoch may be smaller than `batch_size`. `global_epoch` counts the epochs
/// trained before this call and labels `EpochStats::global_epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub global_epoch: usize,
}

impl FitConfig {
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        FitConfig { epochs, batch_size, global_epoch: 0 }
    }

    pub fn starting_at(mut self, global_epoch: usize) -> Self {
        self.global_epoch = global_epoch;
        self
    }
}
