use crate::analysis::RoiTrace;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

pub const RAW_COLOR: Color = Color(0x1F77B4);
pub const ROLLING_COLOR: Color = Color(0x000000);
pub const THRESHOLD_COLOR: Color = Color(0xD4C300);
pub const MARKER_COLOR: Color = Color(0xDAA520);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Full-height vertical rule at `x`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerticalMarker {
    pub name: String,
    pub x: f64,
    pub style: Style,
}

impl VerticalMarker {
    /// Split the rule spanning `y_min..y_max` into `[from, to]` y pieces.
    ///
    /// `dash` lengths are in pixels and `pixels` is the drawn height of the
    /// span; an undashed style gives one piece.
    pub fn segments(&self, y_min: f64, y_max: f64, pixels: f64) -> Vec<[f64; 2]> {
        let span = y_max - y_min;
        let Some([on, off]) = self.style.dash else {
            return vec![[y_min, y_max]];
        };
        if on <= 0.0 || pixels <= 0.0 || span <= 0.0 {
            return vec![[y_min, y_max]];
        }
        let per_pixel = span / pixels;
        let on = on as f64 * per_pixel;
        let period = on + off.max(0.0) as f64 * per_pixel;
        let mut out = Vec::new();
        let mut from = y_min;
        while from < y_max {
            out.push([from, (from + on).min(y_max)]);
            from += period;
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Marker(VerticalMarker),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineSeries> {
        self.series.iter().filter_map(|s| match s {
            Series::Line(line) => Some(line),
            Series::Marker(_) => None,
        })
    }

    pub fn markers(&self) -> impl Iterator<Item = &VerticalMarker> {
        self.series.iter().filter_map(|s| match s {
            Series::Marker(marker) => Some(marker),
            Series::Line(_) => None,
        })
    }

    /// `(x_min, x_max, y_min, y_max)` over all line points and markers.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut xs = self
            .lines()
            .flat_map(|l| l.points.iter().map(|p| p[0]))
            .chain(self.markers().map(|m| m.x))
            .peekable();
        xs.peek()?;
        let (x_min, x_max) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
        let (y_min, y_max) = self
            .lines()
            .flat_map(|l| l.points.iter().map(|p| p[1]))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
                (lo.min(y), hi.max(y))
            });
        if !y_min.is_finite() {
            return Some((x_min, x_max, 0.0, 1.0));
        }
        Some((x_min, x_max, y_min, y_max))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if max_points == 0 || points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    (0..max_points)
        .map(|i| (i as f64 * bucket_size).floor() as usize)
        .take_while(|&start| start < points.len())
        .map(|start| points[start])
        .collect()
}

fn line(name: &str, points: Vec<[f64; 2]>, width: f32, color: Color) -> Series {
    Series::Line(LineSeries {
        name: name.into(),
        points,
        style: Style {
            width,
            dash: None,
            color,
        },
    })
}

/// Raw trace, rolling average, threshold and a dashed marker at every
/// oscillation start and end, x in sample indices.
pub fn figure_from_trace(roi: &str, data: &[f64], trace: &RoiTrace, max_points: usize) -> Figure {
    let mut fig = Figure::new(Some(format!("ROI {}", roi)));
    fig.x.label = Some("sample".into());
    fig.y.label = Some("ratio 340/380".into());

    let indexed = |values: &[f64]| -> Vec<[f64; 2]> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| [i as f64, *v])
            .collect()
    };
    let rolling: Vec<[f64; 2]> = trace
        .rolling
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| [i as f64, v]))
        .collect();

    fig.add_series(line(
        "Bound calcium ratio",
        decimate_points(&indexed(data), max_points),
        1.0,
        RAW_COLOR,
    ));
    fig.add_series(line(
        "Moving average",
        decimate_points(&rolling, max_points),
        1.6,
        ROLLING_COLOR,
    ));
    fig.add_series(line(
        "Oscillation threshold",
        decimate_points(&indexed(trace.threshold.as_slice()), max_points),
        1.6,
        THRESHOLD_COLOR,
    ));
    for (n, (start, end)) in trace.bounds.pairs().enumerate() {
        for (edge, x) in [("start", start), ("end", end)] {
            fig.add_series(Series::Marker(VerticalMarker {
                name: format!("oscillation {} {}", n + 1, edge),
                x: x as f64,
                style: Style {
                    width: 1.0,
                    dash: Some([6.0, 3.0]),
                    color: MARKER_COLOR,
                },
            }));
        }
    }
    fig
}
