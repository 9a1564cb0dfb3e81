//! Spectral feature extraction and the sampling/epoch scheduler for motionfeat.

pub mod error;
pub mod features;
pub mod fft;
pub mod freq_table;
pub mod scheduler;

pub use error::FeatureError;
pub use features::FeatureExtractor;
pub use fft::RealFftTransform;
pub use freq_table::FrequencyIndexTable;
pub use scheduler::{EpochOutcome, Mode, SampleOutcome, Scheduler};
