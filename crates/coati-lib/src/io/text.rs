use anyhow::{Context, Result};
use std::path::Path;

/// Parse a single trace written one value per line (or comma separated).
/// Blank lines and `#` comments are skipped; the first remaining line is taken
/// as a header when any of its tokens is non-numeric.
pub fn parse_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    let mut seen_line = false;
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed: Vec<(&str, Option<f64>)> = trimmed
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| (t, t.parse::<f64>().ok()))
            .collect();
        let header = !seen_line && parsed.iter().any(|(_, value)| value.is_none());
        seen_line = true;
        if header {
            continue;
        }
        for (token, value) in parsed {
            match value {
                Some(value) => out.push(value),
                None => anyhow::bail!("line {} is not numeric: {}", idx + 1, token),
            }
        }
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

pub fn read_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_series(&text)
}
