use crate::{
    error::Result,
    signal::SpikeBounds,
    smoothing::cumulative_mean,
    threshold::build_threshold,
};
use log::warn;
use serde::{Deserialize, Serialize};

/// Samples the recorded onset is moved back by, compensating for the lag of the
/// rolling average behind the raw trace.
pub const DEFAULT_START_LOOKBACK: usize = 2;

/// Scanner state while walking the smoothed trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Below threshold, waiting for an upward crossing
    Outside,
    /// An oscillation has started and has not yet fallen back
    InsideSpike,
}

/// Boundaries found in one trace together with the curves they were found against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeDetection {
    pub bounds: SpikeBounds,
    /// Rounded cumulative average of the raw trace
    pub cumulative: Vec<f64>,
    pub threshold: Vec<f64>,
}

/// Walk `smoothed` against `threshold` and pair upward with downward crossings.
///
/// An index is only considered once it and its predecessor both have a smoothed
/// value. Starts are recorded `lookback` samples before the crossing (clamped at
/// 0); a spike still open at the end is closed at the last smoothed index.
pub fn detect_crossings(
    smoothed: &[Option<f64>],
    threshold: &[f64],
    lookback: usize,
) -> SpikeBounds {
    let n = smoothed.len().min(threshold.len());
    let mut state = DetectorState::Outside;
    let mut bounds = SpikeBounds::default();

    for i in 1..n {
        let (Some(current), Some(previous)) = (smoothed[i], smoothed[i - 1]) else {
            continue;
        };
        let level = threshold[i];
        match state {
            DetectorState::Outside if current >= level && level > previous => {
                bounds.starts.push(i.saturating_sub(lookback));
                state = DetectorState::InsideSpike;
            }
            DetectorState::InsideSpike if current <= level && level < previous => {
                bounds.ends.push(i);
                state = DetectorState::Outside;
            }
            _ => {}
        }
    }

    if state == DetectorState::InsideSpike {
        let last = smoothed.len() - 1;
        let open_start = bounds.starts.last().copied().unwrap_or(last);
        if open_start < last {
            bounds.ends.push(last);
        } else {
            // only reachable without lookback: the crossing was the final sample
            warn!("dropping oscillation that opened on the final sample {}", last);
            bounds.starts.pop();
        }
    }

    bounds
}

/// Detect oscillations of a smoothed trace against the raw trace's dynamic threshold.
///
/// The threshold is built from `data` and its cumulative average, never from the
/// smoothed curve.
pub fn detect_oscillations(
    data: &[f64],
    smoothed: &[Option<f64>],
    std_multiplier: f64,
    lookback: usize,
) -> Result<SpikeDetection> {
    let cumulative = cumulative_mean(data);
    let threshold = build_threshold(data, &cumulative, std_multiplier)?;
    let bounds = detect_crossings(smoothed, &threshold, lookback);
    Ok(SpikeDetection {
        bounds,
        cumulative,
        threshold,
    })
}

/// Detect oscillations directly on the raw samples, without smoothing or lookback.
pub fn detect_raw_oscillations(data: &[f64], std_multiplier: f64) -> Result<SpikeDetection> {
    let raw: Vec<Option<f64>> = data.iter().copied().map(Some).collect();
    detect_oscillations(data, &raw, std_multiplier, 0)
}
