//! sidetree-node — the host process: configuration, the anchor observer,
//! and the pipeline that wires batch assembly into the operation index.

pub mod adapters;
pub mod config;
pub mod observer;
pub mod pipeline;

pub use adapters::{GzipCompression, InMemoryCas};
pub use config::NodeConfig;
pub use observer::{AnchorObserver, ChannelAnchorObserver};
pub use pipeline::Pipeline;
