//! Dynamic oscillation threshold: cumulative average plus a fixed multiple of
//! the trace's population standard deviation.

use crate::error::{AnalysisError, Result};

/// Population standard deviation (divisor N). 0 for an empty slice.
pub fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    (data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
}

pub fn validate_multiplier(std_multiplier: f64) -> Result<()> {
    if !std_multiplier.is_finite() || std_multiplier <= 0.0 {
        return Err(AnalysisError::InvalidConfiguration(format!(
            "standard deviation multiplier must be a positive number, got {}",
            std_multiplier
        )));
    }
    Ok(())
}

/// `threshold[i] = cumulative[i] + std_multiplier * population_std(data)`.
pub fn build_threshold(data: &[f64], cumulative: &[f64], std_multiplier: f64) -> Result<Vec<f64>> {
    validate_multiplier(std_multiplier)?;
    if data.len() != cumulative.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "cumulative average has {} entries for {} samples",
            cumulative.len(),
            data.len()
        )));
    }
    let offset = population_std(data) * std_multiplier;
    Ok(cumulative.iter().map(|avg| avg + offset).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::cumulative_mean;

    #[test]
    fn population_std_uses_n_divisor() {
        let sd = population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.0).abs() < 1e-12);
    }

    #[test]
    fn offset_is_constant_across_indices() {
        let data = vec![1.0, 3.0, 2.0, 8.0, 1.0];
        let cma = cumulative_mean(&data);
        let thr = build_threshold(&data, &cma, 0.5).unwrap();
        let offsets: Vec<f64> = thr.iter().zip(&cma).map(|(t, c)| t - c).collect();
        for pair in offsets.windows(2) {
            assert!((pair[0] - pair[1]).abs() < 1e-12);
        }
        assert!((offsets[0] - 0.5 * population_std(&data)).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_multiplier() {
        for k in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                build_threshold(&[1.0], &[1.0], k),
                Err(AnalysisError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(matches!(
            build_threshold(&[1.0, 2.0], &[1.0], 0.5),
            Err(AnalysisError::InvalidInput(_))
        ));
    }
}
