pub mod checkpoint;
pub mod csv_logger;
pub mod early_stopping;
pub mod reduce_lr;

pub use checkpoint::ModelCheckpoint;
pub use csv_logger::CsvLogger;
pub use early_stopping::EarlyStopping;
pub use reduce_lr::ReduceLrOnPlateau;

/// Callbacks run by `loop_fn::fit` after every epoch, in field order.
#[derive(Debug, Clone, Default)]
pub struct FitCallbacks {
    pub checkpoint: Option<ModelCheckpoint>,
    pub early_stopping: Option<EarlyStopping>,
    pub reduce_lr: Option<ReduceLrOnPlateau>,
    pub csv_logger: Option<CsvLogger>,
}
