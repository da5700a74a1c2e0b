//! Analysis settings read from a TOML file.
//!
//! ```toml
//! window = 20
//! std_multiplier = 0.5
//! baseline = "spike-ordinal"
//! features = ["roi_mean", "oscillation_count"]
//!
//! [columns]
//! roi = "ROI ID"
//! ```
//!
//! Every key is optional; anything left out falls back to the defaults.

use crate::{
    analysis::{AnalysisConfig, Feature},
    io::nis::NisColumns,
    metrics::spikes::BaselineMode,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub window: Option<usize>,
    #[serde(default)]
    pub std_multiplier: Option<f64>,
    #[serde(default)]
    pub start_lookback: Option<usize>,
    #[serde(default)]
    pub baseline: Option<BaselineMode>,
    #[serde(default)]
    pub features: Option<Vec<Feature>>,
    #[serde(default)]
    pub columns: ColumnsSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnsSpec {
    #[serde(default)]
    pub roi: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing analysis config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        AnalysisConfig {
            window: self.window.unwrap_or(defaults.window),
            std_multiplier: self.std_multiplier.unwrap_or(defaults.std_multiplier),
            start_lookback: self.start_lookback.unwrap_or(defaults.start_lookback),
            baseline: self.baseline.unwrap_or(defaults.baseline),
        }
    }

    /// Selected features, all of them when the file names none.
    pub fn features(&self) -> Vec<Feature> {
        self.features
            .clone()
            .unwrap_or_else(|| Feature::ALL.to_vec())
    }

    pub fn nis_columns(&self) -> NisColumns {
        let defaults = NisColumns::default();
        NisColumns {
            roi: self.columns.roi.clone().unwrap_or(defaults.roi),
            time: self.columns.time.clone().unwrap_or(defaults.time),
            value: self.columns.value.clone().unwrap_or(defaults.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = ConfigFile::parse("").unwrap();
        assert_eq!(cfg.analysis_config(), AnalysisConfig::default());
        assert_eq!(cfg.features(), Feature::ALL.to_vec());
        assert_eq!(cfg.nis_columns(), NisColumns::default());
    }

    #[test]
    fn reads_all_keys() {
        let cfg = ConfigFile::parse(
            r#"
window = 5
std_multiplier = 1.25
start_lookback = 0
baseline = "spike-start"
features = ["oscillation_count", "roi_mean"]

[columns]
value = "Ratio"
"#,
        )
        .unwrap();
        let analysis = cfg.analysis_config();
        assert_eq!(analysis.window, 5);
        assert_eq!(analysis.std_multiplier, 1.25);
        assert_eq!(analysis.start_lookback, 0);
        assert_eq!(analysis.baseline, BaselineMode::SpikeStart);
        assert_eq!(cfg.features(), vec![Feature::OscillationCount, Feature::RoiMean]);
        assert_eq!(cfg.nis_columns().value, "Ratio");
        assert_eq!(cfg.nis_columns().roi, "ROI ID");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ConfigFile::parse("windwo = 3").is_err());
        assert!(ConfigFile::parse("features = [\"spikiness\"]").is_err());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coati.toml");
        std::fs::write(&path, "window = 7\n").unwrap();
        assert_eq!(ConfigFile::load(&path).unwrap().analysis_config().window, 7);
    }
}
