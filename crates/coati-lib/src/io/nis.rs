//! Reader for the per-ROI CSV exported by NIS Elements AR.

use crate::signal::Dataset;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Header names of the three columns the loader needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NisColumns {
    pub roi: String,
    pub time: String,
    pub value: String,
}

impl Default for NisColumns {
    fn default() -> Self {
        Self {
            roi: "ROI ID".into(),
            time: "Time [h:m:s]".into(),
            value: "Ratio 340/380".into(),
        }
    }
}

pub fn read_nis_csv(path: &Path, columns: &NisColumns) -> Result<Dataset> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_nis_csv(file, columns).with_context(|| format!("parsing {}", path.display()))
}

/// Group long-format rows into one time-ordered trace per ROI.
///
/// ROIs appear in the order they are first seen; samples of a ROI are stably
/// sorted by the time column. A row without a ROI identifier is an error.
pub fn parse_nis_csv<R: Read>(reader: R, columns: &NisColumns) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();
    let roi_idx = locate_column(&headers, &columns.roi)?;
    let time_idx = locate_column(&headers, &columns.time)?;
    let value_idx = locate_column(&headers, &columns.value)?;

    let mut samples: IndexMap<String, Vec<(f64, f64)>> = IndexMap::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let line = row + 2;
        let roi = field(&record, roi_idx, line, &columns.roi)?;
        if roi.is_empty() {
            anyhow::bail!("line {}: empty {} value", line, columns.roi);
        }
        let time_text = field(&record, time_idx, line, &columns.time)?;
        let time = parse_timestamp(time_text)
            .with_context(|| format!("line {}: bad timestamp {:?}", line, time_text))?;
        let value_text = field(&record, value_idx, line, &columns.value)?;
        let value: f64 = value_text.parse().with_context(|| {
            format!(
                "line {}: {} is not numeric: {:?}",
                line, columns.value, value_text
            )
        })?;
        samples.entry(roi.to_string()).or_default().push((time, value));
    }

    let mut dataset = Dataset::new();
    for (id, mut points) in samples {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let data = points.into_iter().map(|(_, value)| value).collect();
        dataset.insert(id, data)?;
    }
    Ok(dataset)
}

/// Parse `h:m:s[.frac]`, `m:s[.frac]` or plain seconds into seconds.
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let mut seconds = 0.0;
    for part in &parts {
        let value: f64 = part.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        seconds = seconds * 60.0 + value;
    }
    Some(seconds)
}

fn field<'r>(record: &'r StringRecord, idx: usize, line: usize, name: &str) -> Result<&'r str> {
    record
        .get(idx)
        .ok_or_else(|| anyhow::anyhow!("line {}: missing {} value", line, name))
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow::anyhow!("missing column {:?}", requested))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ROI ID,Time [h:m:s],Ratio 340/380,Area
2,0:00:00.000,1.10,40
1,0:00:00.000,0.90,52
2,0:00:02.500,1.30,40
1,0:00:02.500,0.95,52
1,0:00:01.250,0.92,52
";

    #[test]
    fn groups_rows_by_roi_in_first_seen_order() {
        let dataset = parse_nis_csv(SAMPLE.as_bytes(), &NisColumns::default()).unwrap();
        let ids: Vec<&str> = dataset.ids().collect();
        assert_eq!(ids, ["2", "1"]);
        assert_eq!(dataset.get("2").unwrap().data, vec![1.10, 1.30]);
        assert_eq!(dataset.get("1").unwrap().data, vec![0.90, 0.92, 0.95]);
    }

    #[test]
    fn custom_columns() {
        let text = "cell,t,ratio\na,0,1.0\na,1,2.0\n";
        let columns = NisColumns {
            roi: "cell".into(),
            time: "t".into(),
            value: "ratio".into(),
        };
        let dataset = parse_nis_csv(text.as_bytes(), &columns).unwrap();
        assert_eq!(dataset.get("a").unwrap().data, vec![1.0, 2.0]);
    }

    #[test]
    fn missing_column_is_reported() {
        let text = "ROI ID,Time [h:m:s]\n1,0:00:01\n";
        let err = parse_nis_csv(text.as_bytes(), &NisColumns::default()).unwrap_err();
        assert!(err.to_string().contains("Ratio 340/380"));
    }

    #[test]
    fn non_numeric_ratio_is_an_error() {
        let text = "ROI ID,Time [h:m:s],Ratio 340/380\n1,0:00:01,abc\n";
        assert!(parse_nis_csv(text.as_bytes(), &NisColumns::default()).is_err());
    }

    #[test]
    fn row_without_roi_id_is_an_error() {
        let text = "ROI ID,Time [h:m:s],Ratio 340/380\n\
                    1,0:00:00,1.0\n\
                    ,0:00:01,9.0\n\
                    1,0:00:02,1.0\n";
        let err = parse_nis_csv(text.as_bytes(), &NisColumns::default()).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("line 3"), "{}", msg);
        assert!(msg.contains("ROI ID"), "{}", msg);
    }

    #[test]
    fn timestamps() {
        assert_eq!(parse_timestamp("0:00:02.5"), Some(2.5));
        assert_eq!(parse_timestamp("1:01:01"), Some(3661.0));
        assert_eq!(parse_timestamp("02:30"), Some(150.0));
        assert_eq!(parse_timestamp("12.25"), Some(12.25));
        assert_eq!(parse_timestamp("a:b"), None);
        assert_eq!(parse_timestamp("1::2"), None);
    }
}
