use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::{error::Error, fs, path::PathBuf};

#[test]
fn analyze_reports_one_row_per_roi() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("coati");
    cmd.args(["analyze", "--input", &sample_path("test_data/nis_sample.csv"), "--window", "3"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let rows: Vec<Value> = serde_json::from_slice(&output)?;

    assert_eq!(rows.len(), 3);
    let ids: Vec<&str> = rows.iter().filter_map(|r| r["roi"].as_str()).collect();
    assert_eq!(ids, ["1", "2", "3"]);
    for row in &rows {
        assert_eq!(row.as_object().map(|o| o.len()), Some(7));
    }

    let first = &rows[0];
    assert_eq!(first["oscillation_count"].as_f64(), Some(1.0));
    assert_eq!(first["oscillation_duration"].as_f64(), Some(6.0));
    assert_close(first["oscillation_height"].as_f64().unwrap(), 1.8, 1e-9);
    assert_close(first["oscillation_mean"].as_f64().unwrap(), 1.244, 1e-9);
    assert_close(first["oscillation_integral"].as_f64().unwrap(), 4.0, 1e-9);

    for quiet in &rows[1..] {
        for key in [
            "oscillation_count",
            "oscillation_integral",
            "oscillation_duration",
            "oscillation_height",
            "oscillation_mean",
        ] {
            assert_eq!(quiet[key].as_f64(), Some(0.0), "{} of ROI {}", key, quiet["roi"]);
        }
    }
    assert_close(rows[2]["roi_mean"].as_f64().unwrap(), 1.0, 1e-12);
    Ok(())
}

#[test]
fn analyze_honours_feature_subset() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("coati");
    cmd.args([
        "analyze",
        "--input",
        &sample_path("test_data/nis_sample.csv"),
        "--window",
        "3",
        "--features",
        "oscillation_count,roi_mean",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let rows: Vec<Value> = serde_json::from_slice(&output)?;
    for row in rows {
        let obj = row.as_object().expect("row object");
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["oscillation_count", "roi", "roi_mean"]);
    }
    Ok(())
}

#[test]
fn analyze_csv_uses_config_file() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("coati");
    cmd.args([
        "analyze",
        "--input",
        &sample_path("test_data/nis_sample.csv"),
        "--config",
        &sample_path("test_data/analysis.toml"),
        "--format",
        "csv",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "roi,oscillation_count,oscillation_height",
            "1,1,1.8",
            "2,0,0",
            "3,0,0"
        ]
    );
    Ok(())
}

#[test]
fn parallel_output_matches_serial() -> Result<(), Box<dyn Error>> {
    let input = sample_path("test_data/nis_sample.csv");
    let run = |parallel: bool| {
        let mut cmd = cargo_bin_cmd!("coati");
        cmd.args(["analyze", "--input", &input, "--window", "3"]);
        if parallel {
            cmd.arg("--parallel");
        }
        cmd.assert().success().get_output().stdout.clone()
    };
    assert_eq!(run(false), run(true));
    Ok(())
}

#[test]
fn analyze_writes_csv_file() -> Result<(), Box<dyn Error>> {
    let temp = tempfile::tempdir()?;
    let out = temp.path().join("results.csv");
    let mut cmd = cargo_bin_cmd!("coati");
    cmd.args([
        "analyze",
        "--input",
        &sample_path("test_data/nis_sample.csv"),
        "--window",
        "3",
        "--format",
        "csv",
        "--out",
        out.to_str().expect("utf8 path"),
    ]);
    cmd.assert().success();
    let text = fs::read_to_string(&out)?;
    assert!(text.starts_with("roi,roi_mean,oscillation_count,"));
    assert_eq!(text.lines().count(), 4);
    Ok(())
}

#[test]
fn invalid_criteria_are_rejected() {
    let input = sample_path("test_data/nis_sample.csv");
    let cases = [
        ("--window", "0"),
        ("--std-multiplier", "0"),
        ("--std-multiplier", "-1"),
    ];
    for (flag, value) in cases {
        let mut cmd = cargo_bin_cmd!("coati");
        cmd.args(["analyze", "--input", &input, flag, value]);
        cmd.assert().failure();
    }
}

#[test]
fn unknown_feature_is_rejected() {
    let mut cmd = cargo_bin_cmd!("coati");
    cmd.args([
        "analyze",
        "--input",
        &sample_path("test_data/nis_sample.csv"),
        "--features",
        "roi_mean,amplitude",
    ]);
    cmd.assert().failure();
}

fn assert_close(a: f64, b: f64, tol: f64) {
    let diff = (a - b).abs();
    assert!(
        diff <= tol,
        "diff {} exceeded tol {} ({} vs {})",
        diff,
        tol,
        a,
        b
    );
}

fn sample_path(relative: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join(relative)
        .to_string_lossy()
        .to_string()
}
