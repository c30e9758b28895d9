use std::path::{Path, PathBuf};

/// Label manifests for one cross-validation fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldFiles {
    pub train: PathBuf,
    pub val: PathBuf,
    pub test: PathBuf,
}

impl FoldFiles {
    pub fn new(label_dir: &Path, fold: usize) -> FoldFiles {
        FoldFiles {
            train: label_dir.join(format!("train_subset{}.csv", fold)),
            val: label_dir.join(format!("val_subset{}.csv", fold)),
            test: label_dir.join(format!("test_subset{}.csv", fold)),
        }
    }
}
