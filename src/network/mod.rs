pub mod metadata;
pub mod network;
pub mod spec;

pub use metadata::{ImageShape, ModelMetadata};
pub use network::Network;
pub use spec::{LayerSpec, ModelSpec};
