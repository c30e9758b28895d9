pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;
pub mod eval;
pub mod config;
pub mod workflow;
pub mod error;

// Convenience re-exports
pub use math::Matrix;
pub use activation::ActivationFunction;
pub use layers::Dense;
pub use network::{ModelSpec, Network};
pub use loss::LossType;
pub use optim::Adam;
pub use config::RunConfig;
pub use error::{Result, WeedsError};
pub use train::{run, ControllerConfig, RunOutcome, Trainable};
pub use workflow::{accuracy_test, cross_validate, inference, ModelSource};
