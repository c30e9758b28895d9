pub mod crossval;
pub mod inference;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use accuracy_test::{accuracy_test, class_folders};
pub use crossval::{cross_validate, run_fold, FoldSummary, ModelSource};
pub use inference::{inference, InferenceTiming, INFERENCE_TIMES_FILE};

/// Creates `{base}/{%Y%m%d-%H%M%S}{suffix}`.
pub(crate) fn timestamped_dir(base: &Path, suffix: &str) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let dir = base.join(format!("{}{}", stamp, suffix));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
