pub mod folds;
pub mod images;
pub mod labels;
pub mod organize;
pub mod samples;

pub use folds::FoldFiles;
pub use images::{Augmentation, ImageLoader, ImageSamples};
pub use labels::{read_labels, LabelRecord};
pub use organize::{organize, SpeciesSplit};
pub use samples::{one_hot, SampleSource, Samples};
