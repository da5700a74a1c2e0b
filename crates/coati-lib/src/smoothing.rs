//! Rolling and cumulative moving averages.

use crate::error::{AnalysisError, Result};

/// Round to three decimal places.
///
/// Cumulative averages and baseline-subtracted spike samples pass through this
/// before any threshold comparison or integration, which keeps crossings stable
/// against floating point noise.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Fixed-window mean ending at each index.
///
/// The first `window - 1` entries have no full window yet and are `None`.
/// A window of 1 returns the samples unchanged.
pub fn rolling_mean(data: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(AnalysisError::InvalidConfiguration(
            "rolling window must be at least 1".into(),
        ));
    }
    if window == 1 {
        return Ok(data.iter().copied().map(Some).collect());
    }
    let mut out = Vec::with_capacity(data.len());
    for i in 0..data.len() {
        if i + 1 < window {
            out.push(None);
            continue;
        }
        let sum: f64 = data[i + 1 - window..=i].iter().sum();
        out.push(Some(sum / window as f64));
    }
    Ok(out)
}

/// Expanding-window mean from index 0 through each index, rounded with [`round3`].
pub fn cumulative_mean(data: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    data.iter()
        .enumerate()
        .map(|(i, &sample)| {
            acc += sample;
            round3(acc / (i + 1) as f64)
        })
        .collect()
}
