//! Configuration, types, and shared contracts for motionfeat.
//!
//! This crate contains the window buffer, the feature record and its wire
//! layout, the capability traits and the configuration loader shared by
//! the rest of the workspace.

pub mod config;
pub mod error;
pub mod record;
pub mod traits;
pub mod window;

pub use config::PipelineConfig;
pub use error::CoreError;
pub use record::{ChannelFeatures, FeatureRecord};
pub use window::{AppendResult, Axis, WindowBuffer};
