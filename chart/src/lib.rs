//! Bar, line and pie charts rendered to fixed PNG files.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, PoisonError};

use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};

static DEJAVU_SANS: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_REGISTRATION: Once = Once::new();

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);

const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("graph data is empty")]
    EmptyData,

    #[error("value for {0:?} is not a finite number")]
    NonFinite(String),

    #[error("pie slice {0:?} is negative")]
    NegativeSlice(String),

    #[error("values span too wide a range to plot")]
    RangeTooWide,

    #[error("drawing failed: {0}")]
    Drawing(String),
}

fn drawing(e: impl Display) -> RenderError {
    RenderError::Drawing(e.to_string())
}

/// Every text style here asks for "sans-serif"; back it with the bundled face.
fn ensure_font() {
    FONT_REGISTRATION.call_once(|| {
        if register_font("sans-serif", FontStyle::Normal, DEJAVU_SANS).is_err() {
            tracing::warn!("bundled chart font is not a valid font file");
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

impl ChartKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar_graph.png",
            ChartKind::Line => "line_graph.png",
            ChartKind::Pie => "pie_chart.png",
        }
    }
}

/// What to plot: labelled values in display order plus captions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphSpec {
    pub data: Vec<(String, f64)>,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
}

impl GraphSpec {
    pub fn new(data: Vec<(String, f64)>, title: impl Into<String>) -> Self {
        Self {
            data,
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_labels(mut self, xlabel: impl Into<String>, ylabel: impl Into<String>) -> Self {
        self.xlabel = xlabel.into();
        self.ylabel = ylabel.into();
        self
    }

    fn validate(&self, kind: ChartKind) -> Result<(), RenderError> {
        if self.data.is_empty() {
            return Err(RenderError::EmptyData);
        }

        for (label, value) in &self.data {
            if !value.is_finite() {
                return Err(RenderError::NonFinite(label.clone()));
            }
            if kind == ChartKind::Pie && *value < 0.0 {
                return Err(RenderError::NegativeSlice(label.clone()));
            }
        }

        if kind == ChartKind::Pie {
            let total: f64 = self.data.iter().map(|(_, v)| v).sum();
            if !total.is_finite() {
                return Err(RenderError::RangeTooWide);
            }
        } else {
            self.value_range()?;
        }

        Ok(())
    }

    /// Value axis bounds, always including zero and never degenerate.
    /// Finite values can still overflow once subtracted or padded.
    fn value_range(&self) -> Result<(f64, f64), RenderError> {
        let (mut lo, mut hi) = self
            .data
            .iter()
            .fold((0.0f64, 0.0f64), |(lo, hi), (_, v)| (lo.min(*v), hi.max(*v)));

        if hi - lo < f64::EPSILON {
            hi = lo + 1.0;
        }

        let pad = (hi - lo) * 0.05;
        if hi > 0.0 {
            hi += pad;
        }
        if lo < 0.0 {
            lo -= pad;
        }

        if !(pad.is_finite() && lo.is_finite() && hi.is_finite()) {
            return Err(RenderError::RangeTooWide);
        }

        Ok((lo, hi))
    }

    fn label_at(&self, value: &SegmentValue<usize>) -> String {
        match value {
            SegmentValue::CenterOf(i) => self
                .data
                .get(*i)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}

/// Writes charts into `output_dir`, one fixed file per kind. Renders are serialised.
#[derive(Debug)]
pub struct ChartRenderer {
    output_dir: PathBuf,
    surface: Mutex<()>,
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        ensure_font();

        Self {
            output_dir: output_dir.into(),
            surface: Mutex::new(()),
        }
    }

    pub fn path_for(&self, kind: ChartKind) -> PathBuf {
        self.output_dir.join(kind.file_name())
    }

    /// Renders `spec`, overwriting any previous file of the same kind.
    pub fn render(&self, kind: ChartKind, spec: &GraphSpec) -> Result<String, RenderError> {
        spec.validate(kind)?;

        let _surface = self.surface.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.path_for(kind);

        match kind {
            ChartKind::Bar => draw_bar(&path, spec)?,
            ChartKind::Line => draw_line(&path, spec)?,
            ChartKind::Pie => draw_pie(&path, spec)?,
        }

        tracing::info!(path = %path.display(), entries = spec.data.len(), "saved chart");
        Ok(format!("Graph has been saved as {}", kind.file_name()))
    }
}

fn draw_bar(path: &Path, spec: &GraphSpec) -> Result<(), RenderError> {
    let root = BitMapBackend::new(path, (1500, 1000)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing)?;

    let (lo, hi) = spec.value_range()?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(220)
        .build_cartesian_2d(lo..hi, (0..spec.data.len()).into_segmented())
        .map_err(drawing)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc(spec.xlabel.as_str())
        .y_desc(spec.ylabel.as_str())
        .y_label_formatter(&|v| spec.label_at(v))
        .draw()
        .map_err(drawing)?;

    chart
        .draw_series(spec.data.iter().enumerate().map(|(i, (_, value))| {
            let mut bar = Rectangle::new(
                [(0.0, SegmentValue::Exact(i)), (*value, SegmentValue::Exact(i + 1))],
                SKY_BLUE.filled(),
            );
            bar.set_margin(6, 6, 0, 0);
            bar
        }))
        .map_err(drawing)?;

    root.present().map_err(drawing)
}

fn draw_line(path: &Path, spec: &GraphSpec) -> Result<(), RenderError> {
    let root = BitMapBackend::new(path, (1500, 1000)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing)?;

    let (lo, hi) = spec.value_range()?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d((0..spec.data.len()).into_segmented(), lo..hi)
        .map_err(drawing)?;

    chart
        .configure_mesh()
        .x_desc(spec.xlabel.as_str())
        .y_desc(spec.ylabel.as_str())
        .x_label_formatter(&|v| spec.label_at(v))
        .draw()
        .map_err(drawing)?;

    let points: Vec<(SegmentValue<usize>, f64)> = spec
        .data
        .iter()
        .enumerate()
        .map(|(i, (_, value))| (SegmentValue::CenterOf(i), *value))
        .collect();

    chart
        .draw_series(LineSeries::new(points.clone(), SKY_BLUE.stroke_width(3)))
        .map_err(drawing)?;

    chart
        .draw_series(
            points
                .into_iter()
                .map(|point| Circle::new(point, 6, SKY_BLUE.filled())),
        )
        .map_err(drawing)?;

    root.present().map_err(drawing)
}

fn draw_pie(path: &Path, spec: &GraphSpec) -> Result<(), RenderError> {
    let root = BitMapBackend::new(path, (1000, 1000)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing)?;

    let area = root
        .titled(&spec.title, ("sans-serif", 32))
        .map_err(drawing)?;

    let (width, height) = area.dim_in_pixel();
    let center = (
        i32::try_from(width / 2).unwrap_or(i32::MAX),
        i32::try_from(height / 2).unwrap_or(i32::MAX),
    );
    let radius = f64::from(width.min(height)) * 0.35;

    let total: f64 = spec.data.iter().map(|(_, v)| v).sum();
    let sizes: Vec<f64> = spec.data.iter().map(|(_, v)| *v).collect();
    let colors: Vec<RGBColor> = (0..sizes.len()).map(|i| PALETTE[i % PALETTE.len()]).collect();
    let labels: Vec<String> = spec
        .data
        .iter()
        .map(|(label, value)| {
            let share = if total > 0.0 { value / total * 100.0 } else { 0.0 };
            format!("{label} ({share:.1}%)")
        })
        .collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(140.0);
    area.draw(&pie).map_err(drawing)?;

    root.present().map_err(drawing)
}
