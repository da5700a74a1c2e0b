use crate::error::{AnalysisError, Result};
use indexmap::map::{rayon::ParValues, Entry, IndexMap, Values};
use serde::{Deserialize, Serialize};

/// Calcium ratio trace for one region of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiSeries {
    pub id: String,
    /// Samples in time order
    pub data: Vec<f64>,
}

impl RoiSeries {
    pub fn new(id: impl Into<String>, data: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Arithmetic mean of the whole trace, 0 for an empty trace.
    pub fn mean(&self) -> f64 {
        mean(&self.data)
    }
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// ROI traces keyed by identifier. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rois: IndexMap<String, RoiSeries>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from `(id, samples)` pairs, rejecting repeated identifiers.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut dataset = Self::new();
        for (id, data) in pairs {
            dataset.insert(id, data)?;
        }
        Ok(dataset)
    }

    pub fn insert(&mut self, id: impl Into<String>, data: Vec<f64>) -> Result<()> {
        match self.rois.entry(id.into()) {
            Entry::Occupied(entry) => Err(AnalysisError::DuplicateRoi(entry.key().clone())),
            Entry::Vacant(entry) => {
                let id = entry.key().clone();
                entry.insert(RoiSeries { id, data });
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&RoiSeries> {
        self.rois.get(id)
    }

    pub fn iter(&self) -> Values<'_, String, RoiSeries> {
        self.rois.values()
    }

    /// Parallel iterator over the ROIs; collecting it keeps dataset order.
    pub fn par_iter(&self) -> ParValues<'_, String, RoiSeries> {
        self.rois.par_values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rois.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a RoiSeries;
    type IntoIter = Values<'a, String, RoiSeries>;

    fn into_iter(self) -> Self::IntoIter {
        self.rois.values()
    }
}

/// Paired oscillation boundaries; `starts[i]` belongs with `ends[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpikeBounds {
    pub starts: Vec<usize>,
    pub ends: Vec<usize>,
}

impl SpikeBounds {
    pub fn len(&self) -> usize {
        self.starts.len().min(self.ends.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.starts.iter().copied().zip(self.ends.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn dataset_keeps_insertion_order() {
        let dataset =
            Dataset::from_pairs([("7", vec![1.0]), ("2", vec![2.0, 3.0]), ("11", vec![])])
                .unwrap();
        let ids: Vec<&str> = dataset.ids().collect();
        assert_eq!(ids, ["7", "2", "11"]);
        assert_eq!(dataset.get("2").map(|roi| roi.len()), Some(2));
    }

    #[test]
    fn dataset_rejects_duplicate_ids() {
        let mut dataset = Dataset::new();
        dataset.insert("a", vec![1.0]).unwrap();
        let err = dataset.insert("a", vec![2.0]).unwrap_err();
        assert_eq!(err, AnalysisError::DuplicateRoi("a".into()));
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.get("a").map(|roi| roi.data.clone()), Some(vec![1.0]));
    }

    #[test]
    fn parallel_iteration_keeps_insertion_order() {
        let pairs: Vec<(String, Vec<f64>)> =
            (0..64).rev().map(|i| (i.to_string(), vec![i as f64])).collect();
        let dataset = Dataset::from_pairs(pairs).unwrap();
        let serial: Vec<&str> = dataset.iter().map(|roi| roi.id.as_str()).collect();
        let parallel: Vec<&str> = dataset.par_iter().map(|roi| roi.id.as_str()).collect();
        assert_eq!(serial, parallel);
        assert_eq!(serial.first(), Some(&"63"));
        assert_eq!(dataset.ids().collect::<Vec<_>>(), serial);
    }

    #[test]
    fn empty_series_mean_is_zero() {
        assert_eq!(RoiSeries::new("x", Vec::new()).mean(), 0.0);
        assert!((RoiSeries::new("x", vec![1.0, 2.0, 6.0]).mean() - 3.0).abs() < 1e-12);
    }
}
