pub mod analysis;
pub mod config;
pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod signal;
pub mod smoothing;
pub mod threshold;

pub use analysis::{
    analyze_dataset, analyze_dataset_parallel, analyze_dataset_with_cancel, analyze_roi,
    AnalysisConfig, Feature, RoiResult, RoiTrace,
};
pub use error::{AnalysisError, Result};
pub use metrics::spikes::{BaselineMode, Spike, SpikeSummary};
pub use signal::{Dataset, RoiSeries, SpikeBounds};
