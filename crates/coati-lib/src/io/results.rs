use crate::analysis::{Feature, RoiResult};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::io::Write;
use std::path::Path;

/// Write result rows as CSV: `roi` followed by one column per feature.
pub fn write_results_csv<W: Write>(
    writer: W,
    features: &[Feature],
    rows: &[RoiResult],
) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    let mut header = vec!["roi"];
    header.extend(features.iter().map(Feature::id));
    wtr.write_record(&header).context("writing header")?;
    for row in rows {
        let mut record = vec![row.roi.clone()];
        for feature in features {
            let value = row.get(*feature).unwrap_or(0.0);
            record.push(value.to_string());
        }
        wtr.write_record(&record)
            .with_context(|| format!("writing row for ROI {}", row.roi))?;
    }
    wtr.flush().context("flushing results")?;
    Ok(())
}

pub fn save_results_csv(path: &Path, features: &[Feature], rows: &[RoiResult]) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_results_csv(file, features, rows)
}
