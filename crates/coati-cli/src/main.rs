use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use coati_lib::{
    analysis::{
        analyze_dataset, analyze_dataset_parallel, analyze_roi, dedup_features,
        parse_feature_list, AnalysisConfig, RoiTrace,
    },
    config::ConfigFile,
    io::{nis as nis_io, results as results_io, text as text_io},
    metrics::spikes::BaselineMode,
    plot::{figure_from_trace, Figure, PlotBackend},
    signal::Dataset,
};
use log::info;
use plotters::prelude::*;
use serde::Serialize;
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "coati",
    version,
    about = "COATI: Calcium Oscillation Analysis Tool"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum BaselineArg {
    #[value(name = "spike-ordinal")]
    SpikeOrdinal,
    #[value(name = "spike-start")]
    SpikeStart,
}

impl From<BaselineArg> for BaselineMode {
    fn from(arg: BaselineArg) -> Self {
        match arg {
            BaselineArg::SpikeOrdinal => BaselineMode::SpikeOrdinal,
            BaselineArg::SpikeStart => BaselineMode::SpikeStart,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

/// Oscillation criteria; flags win over values from `--config`.
#[derive(Args, Clone, Debug)]
struct CriteriaArgs {
    /// TOML file with analysis settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Rolling average window in samples (default 20)
    #[arg(long)]
    window: Option<usize>,
    /// Standard deviation multiplier for the threshold (default 0.5)
    #[arg(long)]
    std_multiplier: Option<f64>,
    /// Samples to move each onset back from the smoothed crossing (default 2)
    #[arg(long)]
    start_lookback: Option<usize>,
    #[arg(long, value_enum)]
    baseline: Option<BaselineArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize every ROI of a NIS Elements CSV export
    Analyze {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        criteria: CriteriaArgs,
        /// Comma separated feature ids, e.g. roi_mean,oscillation_count
        #[arg(long)]
        features: Option<String>,
        /// Spread ROIs over all cores
        #[arg(long)]
        parallel: bool,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Dump the smoothed trace, threshold and oscillations of one ROI as JSON
    Inspect {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        roi: String,
        #[command(flatten)]
        criteria: CriteriaArgs,
    },
    /// Detect oscillations in newline-delimited samples read from stdin or --input file
    Oscillations {
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        criteria: CriteriaArgs,
    },
    /// Render one ROI to PNG (or the figure model to JSON when --out ends in .json)
    Plot {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        roi: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 2000)]
        max_points: usize,
        #[command(flatten)]
        criteria: CriteriaArgs,
    },
}

#[derive(Serialize)]
struct TraceOutput<'a> {
    roi: &'a str,
    samples: usize,
    config: AnalysisConfig,
    trace: RoiTrace,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            input,
            criteria,
            features,
            parallel,
            format,
            out,
        } => cmd_analyze(
            &input,
            &criteria,
            features.as_deref(),
            parallel,
            format,
            out.as_deref(),
        )?,
        Commands::Inspect {
            input,
            roi,
            criteria,
        } => cmd_inspect(&input, &roi, &criteria)?,
        Commands::Oscillations { input, criteria } => {
            cmd_oscillations(input.as_deref(), &criteria)?
        }
        Commands::Plot {
            input,
            roi,
            out,
            max_points,
            criteria,
        } => cmd_plot(&input, &roi, &out, max_points, &criteria)?,
    }
    Ok(())
}

fn load_settings(criteria: &CriteriaArgs) -> Result<(ConfigFile, AnalysisConfig)> {
    let file = match &criteria.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let mut cfg = file.analysis_config();
    if let Some(window) = criteria.window {
        cfg.window = window;
    }
    if let Some(k) = criteria.std_multiplier {
        cfg.std_multiplier = k;
    }
    if let Some(lookback) = criteria.start_lookback {
        cfg.start_lookback = lookback;
    }
    if let Some(baseline) = criteria.baseline {
        cfg.baseline = baseline.into();
    }
    cfg.validate()?;
    Ok((file, cfg))
}

fn load_dataset(input: &Path, file: &ConfigFile) -> Result<Dataset> {
    let dataset = nis_io::read_nis_csv(input, &file.nis_columns())?;
    info!("loaded {} ROIs from {}", dataset.len(), input.display());
    Ok(dataset)
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_series(&buf)
        }
    }
}

fn roi_samples<'a>(dataset: &'a Dataset, roi: &str) -> Result<&'a [f64]> {
    dataset
        .get(roi)
        .map(|series| series.data.as_slice())
        .ok_or_else(|| anyhow!("ROI {} not found in input", roi))
}

fn cmd_analyze(
    input: &Path,
    criteria: &CriteriaArgs,
    features: Option<&str>,
    parallel: bool,
    format: OutputFormat,
    out: Option<&Path>,
) -> Result<()> {
    let (file, cfg) = load_settings(criteria)?;
    let features = match features {
        Some(list) => parse_feature_list(list)?,
        None => file.features(),
    };
    let dataset = load_dataset(input, &file)?;
    let rows = if parallel {
        analyze_dataset_parallel(&dataset, &cfg, &features)?
    } else {
        analyze_dataset(&dataset, &cfg, &features)?
    };
    let features = dedup_features(&features);

    match (format, out) {
        (OutputFormat::Json, None) => println!("{}", serde_json::to_string(&rows)?),
        (OutputFormat::Json, Some(path)) => {
            fs::write(path, serde_json::to_string_pretty(&rows)?)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {} rows to {}", rows.len(), path.display());
        }
        (OutputFormat::Csv, None) => results_io::write_results_csv(io::stdout(), &features, &rows)?,
        (OutputFormat::Csv, Some(path)) => {
            results_io::save_results_csv(path, &features, &rows)?;
            info!("wrote {} rows to {}", rows.len(), path.display());
        }
    }
    Ok(())
}

fn cmd_inspect(input: &Path, roi: &str, criteria: &CriteriaArgs) -> Result<()> {
    let (file, cfg) = load_settings(criteria)?;
    let dataset = load_dataset(input, &file)?;
    let data = roi_samples(&dataset, roi)?;
    let trace = analyze_roi(data, &cfg)?;
    let output = TraceOutput {
        roi,
        samples: data.len(),
        config: cfg,
        trace,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn cmd_oscillations(input: Option<&Path>, criteria: &CriteriaArgs) -> Result<()> {
    let (_, cfg) = load_settings(criteria)?;
    let data = read_samples(input)?;
    let trace = analyze_roi(&data, &cfg)?;
    let label = input
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("stdin");
    let output = TraceOutput {
        roi: label,
        samples: data.len(),
        config: cfg,
        trace,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn cmd_plot(
    input: &Path,
    roi: &str,
    out: &Path,
    max_points: usize,
    criteria: &CriteriaArgs,
) -> Result<()> {
    let (file, cfg) = load_settings(criteria)?;
    let dataset = load_dataset(input, &file)?;
    let data = roi_samples(&dataset, roi)?;
    let trace = analyze_roi(data, &cfg)?;
    let fig = figure_from_trace(roi, data, &trace, max_points);

    let is_json = out
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        fs::write(out, serde_json::to_string_pretty(&fig)?)
            .with_context(|| format!("writing {}", out.display()))?;
    } else {
        PngBackend::new(out, (1000, 500)).draw(&fig)?;
    }
    info!("wrote ROI {} figure to {}", roi, out.display());
    Ok(())
}

struct PngBackend<'a> {
    path: &'a Path,
    size: (u32, u32),
}

impl<'a> PngBackend<'a> {
    fn new(path: &'a Path, size: (u32, u32)) -> Self {
        Self { path, size }
    }
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let root = BitMapBackend::new(self.path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let (x_min, mut x_max, y_min, mut y_max) =
            fig.bounds().ok_or_else(|| anyhow!("nothing to plot"))?;
        if x_max <= x_min {
            x_max = x_min + 1.0;
        }
        if y_max <= y_min {
            y_max = y_min + 1.0;
        }
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                fig.title.clone().unwrap_or_else(|| "Plot".into()),
                ("sans-serif", 24),
            )
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .x_desc(fig.x.label.clone().unwrap_or_default())
            .y_desc(fig.y.label.clone().unwrap_or_default())
            .draw()?;

        for line in fig.lines() {
            let (r, g, b) = line.style.color.rgb();
            let color = RGBColor(r, g, b);
            let width = line.style.width.round().max(1.0) as u32;
            chart
                .draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    color.stroke_width(width),
                ))?
                .label(line.name.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
        }
        let plot_height = chart.plotting_area().dim_in_pixel().1 as f64;
        for (n, marker) in fig.markers().enumerate() {
            let (r, g, b) = marker.style.color.rgb();
            let color = RGBColor(r, g, b);
            let width = marker.style.width.round().max(1.0) as u32;
            let x = marker.x;
            let dashes = marker
                .segments(y_min, y_max, plot_height)
                .into_iter()
                .map(move |[from, to]| {
                    PathElement::new(vec![(x, from), (x, to)], color.stroke_width(width))
                });
            let drawn = chart.draw_series(dashes)?;
            if n == 0 {
                drawn.label("oscillation bounds").legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(width))
                });
            }
        }
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
        root.present()?;
        Ok(())
    }
}
