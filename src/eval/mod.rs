pub mod accuracy;
pub mod predict;
pub mod report;

pub use accuracy::{confidence_interval, AccuracyReport, ClassTally};
pub use predict::{classify, predict_classes};
pub use report::{ClassMetrics, ClassificationReport, ConfusionMatrix};
