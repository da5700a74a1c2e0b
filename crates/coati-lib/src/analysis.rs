use crate::{
    detectors::oscillation::{detect_oscillations, DEFAULT_START_LOOKBACK},
    error::{AnalysisError, Result},
    metrics::spikes::{measure_spikes, summarize_spikes, BaselineMode, Spike, SpikeSummary},
    signal::{mean, Dataset, RoiSeries, SpikeBounds},
    smoothing::rolling_mean,
    threshold::validate_multiplier,
};
use log::{debug, info};
use rayon::prelude::*;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

/// Parameters shared by every ROI in one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Rolling average window in samples.
    pub window: usize,
    /// Multiple of the trace's standard deviation added to the cumulative average.
    pub std_multiplier: f64,
    /// Samples an onset is moved back from the smoothed crossing.
    pub start_lookback: usize,
    pub baseline: BaselineMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: 20,
            std_multiplier: 0.5,
            start_lookback: DEFAULT_START_LOOKBACK,
            baseline: BaselineMode::SpikeOrdinal,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(AnalysisError::InvalidConfiguration(
                "rolling window must be at least 1".into(),
            ));
        }
        validate_multiplier(self.std_multiplier)
    }
}

/// Per-ROI summary features, in their canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    RoiMean,
    OscillationCount,
    OscillationIntegral,
    OscillationDuration,
    OscillationHeight,
    OscillationMean,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::RoiMean,
        Feature::OscillationCount,
        Feature::OscillationIntegral,
        Feature::OscillationDuration,
        Feature::OscillationHeight,
        Feature::OscillationMean,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Feature::RoiMean => "roi_mean",
            Feature::OscillationCount => "oscillation_count",
            Feature::OscillationIntegral => "oscillation_integral",
            Feature::OscillationDuration => "oscillation_duration",
            Feature::OscillationHeight => "oscillation_height",
            Feature::OscillationMean => "oscillation_mean",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Feature::RoiMean => "ROI mean",
            Feature::OscillationCount => "Number of oscillations",
            Feature::OscillationIntegral => "Oscillation integral",
            Feature::OscillationDuration => "Oscillation duration",
            Feature::OscillationHeight => "Oscillation height",
            Feature::OscillationMean => "Oscillation mean",
        }
    }

    fn compute(&self, roi_mean: f64, summary: &SpikeSummary) -> f64 {
        match self {
            Feature::RoiMean => roi_mean,
            Feature::OscillationCount => summary.count as f64,
            Feature::OscillationIntegral => summary.integral,
            Feature::OscillationDuration => summary.duration,
            Feature::OscillationHeight => summary.height,
            Feature::OscillationMean => summary.mean,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Feature {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.id().eq_ignore_ascii_case(wanted) || f.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AnalysisError::UnknownFeature(wanted.to_string()))
    }
}

/// Parse a comma separated feature list such as `roi_mean,oscillation_count`.
pub fn parse_feature_list(text: &str) -> Result<Vec<Feature>> {
    text.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Drop repeated features, keeping the first occurrence and the caller's order.
pub fn dedup_features(features: &[Feature]) -> Vec<Feature> {
    let mut out: Vec<Feature> = Vec::with_capacity(features.len());
    for &feature in features {
        if !out.contains(&feature) {
            out.push(feature);
        }
    }
    out
}

/// Everything computed for one ROI, kept for inspection and plotting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiTrace {
    pub roi_mean: f64,
    pub rolling: Vec<Option<f64>>,
    pub cumulative: Vec<f64>,
    pub threshold: Vec<f64>,
    pub bounds: SpikeBounds,
    pub spikes: Vec<Spike>,
    pub summary: SpikeSummary,
}

impl RoiTrace {
    fn empty() -> Self {
        Self {
            roi_mean: 0.0,
            rolling: Vec::new(),
            cumulative: Vec::new(),
            threshold: Vec::new(),
            bounds: SpikeBounds::default(),
            spikes: Vec::new(),
            summary: SpikeSummary::default(),
        }
    }
}

/// One output row: the ROI id and the selected features in selection order.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiResult {
    pub roi: String,
    pub values: Vec<(Feature, f64)>,
}

impl RoiResult {
    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.values
            .iter()
            .find(|(f, _)| *f == feature)
            .map(|&(_, value)| value)
    }

    pub fn features(&self) -> impl Iterator<Item = Feature> + '_ {
        self.values.iter().map(|&(f, _)| f)
    }
}

impl Serialize for RoiResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("roi", &self.roi)?;
        for (feature, value) in &self.values {
            map.serialize_entry(feature.id(), value)?;
        }
        map.end()
    }
}

/// Run smoothing, detection and spike measurement on one trace.
pub fn analyze_roi(data: &[f64], cfg: &AnalysisConfig) -> Result<RoiTrace> {
    cfg.validate()?;
    if data.is_empty() {
        return Ok(RoiTrace::empty());
    }
    let roi_mean = mean(data);
    let rolling = rolling_mean(data, cfg.window)?;
    let detection = detect_oscillations(data, &rolling, cfg.std_multiplier, cfg.start_lookback)?;
    let spikes = measure_spikes(data, &detection.cumulative, &detection.bounds, cfg.baseline);
    let summary = summarize_spikes(&spikes);
    Ok(RoiTrace {
        roi_mean,
        rolling,
        cumulative: detection.cumulative,
        threshold: detection.threshold,
        bounds: detection.bounds,
        spikes,
        summary,
    })
}

fn summarize_roi(roi: &RoiSeries, cfg: &AnalysisConfig, features: &[Feature]) -> Result<RoiResult> {
    let trace = analyze_roi(&roi.data, cfg)?;
    debug!(
        "roi {}: {} samples, {} oscillations",
        roi.id,
        roi.len(),
        trace.summary.count
    );
    let values = features
        .iter()
        .map(|f| (*f, f.compute(trace.roi_mean, &trace.summary)))
        .collect();
    Ok(RoiResult {
        roi: roi.id.clone(),
        values,
    })
}

/// Reject non-finite samples up front so no partial results are produced.
pub fn validate_dataset(dataset: &Dataset) -> Result<()> {
    for roi in dataset {
        if let Some(index) = roi.data.iter().position(|x| !x.is_finite()) {
            return Err(AnalysisError::InvalidInput(format!(
                "ROI {} has a non-finite sample at index {}",
                roi.id, index
            )));
        }
    }
    Ok(())
}

fn prepare(dataset: &Dataset, cfg: &AnalysisConfig, features: &[Feature]) -> Result<Vec<Feature>> {
    cfg.validate()?;
    validate_dataset(dataset)?;
    let features = dedup_features(features);
    info!(
        "analysing {} ROIs (window {}, std multiplier {}, {} features)",
        dataset.len(),
        cfg.window,
        cfg.std_multiplier,
        features.len()
    );
    Ok(features)
}

/// Summarize every ROI in dataset order.
pub fn analyze_dataset(
    dataset: &Dataset,
    cfg: &AnalysisConfig,
    features: &[Feature],
) -> Result<Vec<RoiResult>> {
    let features = prepare(dataset, cfg, features)?;
    dataset
        .iter()
        .map(|roi| summarize_roi(roi, cfg, &features))
        .collect()
}

/// Same rows as [`analyze_dataset`], with ROIs spread over the rayon pool.
pub fn analyze_dataset_parallel(
    dataset: &Dataset,
    cfg: &AnalysisConfig,
    features: &[Feature],
) -> Result<Vec<RoiResult>> {
    let features = prepare(dataset, cfg, features)?;
    dataset
        .par_iter()
        .map(|roi| summarize_roi(roi, cfg, &features))
        .collect()
}

/// Serial analysis that stops between ROIs once `cancel` is set.
pub fn analyze_dataset_with_cancel(
    dataset: &Dataset,
    cfg: &AnalysisConfig,
    features: &[Feature],
    cancel: &AtomicBool,
) -> Result<Vec<RoiResult>> {
    let features = prepare(dataset, cfg, features)?;
    let mut rows = Vec::with_capacity(dataset.len());
    for roi in dataset {
        if cancel.load(Ordering::Relaxed) {
            return Err(AnalysisError::Cancelled {
                completed: rows.len(),
            });
        }
        rows.push(summarize_roi(roi, cfg, &features)?);
    }
    Ok(rows)
}
