use crate::{signal::SpikeBounds, smoothing::round3};
use serde::{Deserialize, Serialize};

/// Which cumulative-average entry a spike's integral is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineMode {
    /// Entry at the spike's position among detected spikes (0 for the first, ...).
    /// Matches the historical COATI output.
    #[default]
    SpikeOrdinal,
    /// Entry at the spike's start index.
    SpikeStart,
}

/// Measurements for a single oscillation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    pub start: usize,
    pub end: usize,
    pub duration: usize,
    pub height: f64,
    pub mean: f64,
    pub integral: f64,
    pub baseline: f64,
}

/// Per-ROI averages over all detected spikes. Every field is 0 without spikes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpikeSummary {
    pub count: usize,
    pub integral: f64,
    pub duration: f64,
    pub height: f64,
    pub mean: f64,
}

/// Trapezoidal area with unit spacing. Fewer than two points enclose no area.
pub fn trapezoid(values: &[f64]) -> f64 {
    values.windows(2).map(|w| (w[0] + w[1]) * 0.5).sum()
}

/// Measure every spike in `bounds` against the raw samples.
///
/// Each spike is widened by one sample on both sides (clamped to the trace) to
/// take in its shoulders before height, mean and integral are taken.
pub fn measure_spikes(
    data: &[f64],
    cumulative: &[f64],
    bounds: &SpikeBounds,
    baseline: BaselineMode,
) -> Vec<Spike> {
    if data.is_empty() {
        return Vec::new();
    }
    let last = data.len() - 1;
    bounds
        .pairs()
        .enumerate()
        .filter(|&(_, (start, _))| start <= last)
        .map(|(ordinal, (start, end))| {
            let lo = start.saturating_sub(1);
            let hi = (end + 1).min(last);
            let slice = &data[lo..=hi];

            let height = slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = round3(slice.iter().sum::<f64>() / slice.len() as f64);

            let baseline_idx = match baseline {
                BaselineMode::SpikeOrdinal => ordinal,
                BaselineMode::SpikeStart => start,
            };
            let floor = cumulative.get(baseline_idx).copied().unwrap_or(0.0);
            let normalized: Vec<f64> = slice.iter().map(|x| round3(x - floor)).collect();

            Spike {
                start,
                end,
                duration: end.saturating_sub(start),
                height,
                mean,
                integral: trapezoid(&normalized),
                baseline: floor,
            }
        })
        .collect()
}

pub fn summarize_spikes(spikes: &[Spike]) -> SpikeSummary {
    if spikes.is_empty() {
        return SpikeSummary::default();
    }
    let n = spikes.len() as f64;
    let avg = |f: fn(&Spike) -> f64| spikes.iter().map(f).sum::<f64>() / n;
    SpikeSummary {
        count: spikes.len(),
        integral: avg(|s| s.integral),
        duration: avg(|s| s.duration as f64),
        height: avg(|s| s.height),
        mean: avg(|s| s.mean),
    }
}
