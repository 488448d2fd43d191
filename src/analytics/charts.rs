//! Six-panel chart rendering with plotters
//!
//! Every age group gets one composite PNG: radar, outer-product heatmap,
//! vertical bars, horizontal bars, pie and mid-step views of the same
//! indicator means, laid out on a 2x3 grid.
//!
//! Text is only drawn once a font has been registered with
//! [`ChartRenderer::with_font`]; without one the panels carry shapes only.

use crate::analytics::metrics::GroupAggregate;
use crate::config::SurveyConfig;
use crate::error::{Result, SurveyError};
use crate::utils::chart_math::{self, PieWedge};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbImage};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;
use std::f64::consts::TAU;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::iter::once;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::{debug, info};

const FONT: &str = "sans-serif";
const MIN_WIDTH: u32 = 300;
const MIN_HEIGHT: u32 = 200;

/// Font files already registered, keyed by path
static LOADED_FONTS: OnceLock<Mutex<HashMap<PathBuf, &'static [u8]>>> = OnceLock::new();

/// matplotlib's default category colours
const TAB10: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// The six views drawn for each group, in grid order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Radar,
    Heatmap,
    Bar,
    BarH,
    Pie,
    Step,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Radar,
        ChartKind::Heatmap,
        ChartKind::Bar,
        ChartKind::BarH,
        ChartKind::Pie,
        ChartKind::Step,
    ];

    pub fn title_suffix(&self) -> &'static str {
        match self {
            ChartKind::Radar => "雷达图",
            ChartKind::Heatmap => "热力图",
            ChartKind::Bar => "柱状图",
            ChartKind::BarH => "条形图",
            ChartKind::Pie => "饼图",
            ChartKind::Step => "阶梯图",
        }
    }

    pub fn title(&self, group: &str) -> String {
        format!("{} {}", group, self.title_suffix())
    }
}

fn render_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> SurveyError {
    SurveyError::Render(err.to_string())
}

fn tick_label(value: f64) -> String {
    format!("{}", (value * 100.0).round() / 100.0)
}

/// Renders composite chart figures for aggregate records
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    labels: bool,
}

impl ChartRenderer {
    /// Renderer without text; sizes below 300x200 are raised to that minimum
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(MIN_WIDTH),
            height: height.max(MIN_HEIGHT),
            labels: false,
        }
    }

    /// Renderer sized from the configuration, with its font if one is set
    pub fn from_config(config: &SurveyConfig) -> Result<Self> {
        let renderer = Self::new(config.chart_width, config.chart_height);
        match &config.font_path {
            Some(path) => renderer.with_font(path),
            None => Ok(renderer),
        }
    }

    /// Register a TrueType/OpenType font and enable chart text
    ///
    /// plotters needs `'static` font bytes, so each distinct font file is
    /// read and leaked once per process and reused on later calls. A file
    /// that fails to parse is not cached.
    pub fn with_font(mut self, path: &Path) -> Result<Self> {
        let font_error = |reason: String| SurveyError::Font {
            path: path.to_path_buf(),
            reason,
        };

        let mut cache = LOADED_FONTS
            .get_or_init(|| Mutex::new(HashMap::new()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let bytes = match cache.get(path) {
            Some(bytes) => *bytes,
            None => {
                let bytes = fs::read(path).map_err(|e| font_error(e.to_string()))?;
                let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
                bytes
            }
        };

        plotters::style::register_font(FONT, FontStyle::Normal, bytes)
            .map_err(|_| font_error("not a valid TrueType/OpenType font".into()))?;
        cache.insert(path.to_path_buf(), bytes);

        info!("Chart font loaded from {}", path.display());
        self.labels = true;
        Ok(self)
    }

    pub fn labels_enabled(&self) -> bool {
        self.labels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Render the composite figure for one group as PNG bytes
    pub fn render_png(&self, aggregate: &GroupAggregate) -> Result<Vec<u8>> {
        if aggregate.means.is_empty() {
            return Err(SurveyError::Render(format!(
                "group {} has no indicators to plot",
                aggregate.group
            )));
        }

        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;

            let panels = root.split_evenly((2, 3));
            for (kind, panel) in ChartKind::ALL.iter().zip(&panels) {
                self.draw_panel(*kind, panel, aggregate)?;
            }

            root.present().map_err(render_error)?;
        }

        debug!("Rendered {}x{} figure for {}", self.width, self.height, aggregate.group);
        encode_png(buffer, self.width, self.height)
    }

    /// Render the composite figure as base64-encoded PNG
    pub fn render_base64(&self, aggregate: &GroupAggregate) -> Result<String> {
        Ok(STANDARD.encode(self.render_png(aggregate)?))
    }

    fn draw_panel<DB: DrawingBackend>(
        &self,
        kind: ChartKind,
        area: &DrawingArea<DB, Shift>,
        aggregate: &GroupAggregate,
    ) -> Result<()> {
        let title = kind.title(&aggregate.group);
        let labels = aggregate.labels();
        let values = aggregate.values();

        match kind {
            ChartKind::Radar => self.draw_radar(area, &title, &labels, &values),
            ChartKind::Heatmap => self.draw_heatmap(area, &title, &values),
            ChartKind::Bar => self.draw_bar(area, &title, &labels, &values),
            ChartKind::BarH => self.draw_barh(area, &title, &labels, &values),
            ChartKind::Pie => self.draw_pie(area, &title, &labels, &values),
            ChartKind::Step => self.draw_step(area, &title, &labels, &values),
        }
    }

    fn panel<'a, DB: DrawingBackend>(
        &self,
        area: &'a DrawingArea<DB, Shift>,
        title: &str,
        x: Range<f64>,
        y: Range<f64>,
    ) -> Result<Chart<'a, DB>> {
        let mut builder = ChartBuilder::on(area);
        builder.margin(16);
        if self.labels {
            builder.caption(title, (FONT, 22));
        }
        builder.build_cartesian_2d(x, y).map_err(render_error)
    }

    fn text<DB: DrawingBackend>(
        &self,
        chart: &mut Chart<'_, DB>,
        text: &str,
        at: (f64, f64),
        size: u32,
        pos: Pos,
    ) -> Result<()> {
        if !self.labels {
            return Ok(());
        }
        let style = TextStyle::from((FONT, size).into_font()).pos(pos);
        chart
            .draw_series(once(Text::new(text.to_string(), at, style)))
            .map_err(render_error)?;
        Ok(())
    }

    fn line<DB: DrawingBackend>(
        chart: &mut Chart<'_, DB>,
        points: Vec<(f64, f64)>,
        style: ShapeStyle,
    ) -> Result<()> {
        chart
            .draw_series(once(PathElement::new(points, style)))
            .map_err(render_error)?;
        Ok(())
    }

    fn draw_radar<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        labels: &[&str],
        values: &[f64],
    ) -> Result<()> {
        let mut chart = self.panel(area, title, -1.35..1.35, -1.35..1.35)?;
        let r_max = chart_math::radar_extent(values);
        let grid = BLACK.mix(0.15).stroke_width(1);

        let rings = if r_max <= 10.0 { r_max as usize } else { 5 };
        for ring in 1..=rings {
            let r = ring as f64 / rings as f64;
            Self::line(&mut chart, chart_math::arc_points((0.0, 0.0), r, 0.0, TAU), grid)?;
            let at = (r * (TAU / 16.0).cos(), r * (TAU / 16.0).sin());
            self.text(&mut chart, &tick_label(r * r_max), at, 12, Pos::new(HPos::Left, VPos::Bottom))?;
        }

        for (angle, label) in chart_math::radar_angles(values.len()).into_iter().zip(labels) {
            let (dx, dy) = (angle.cos(), angle.sin());
            Self::line(&mut chart, vec![(0.0, 0.0), (dx, dy)], grid)?;
            self.text(
                &mut chart,
                label,
                (1.15 * dx, 1.15 * dy),
                14,
                Pos::new(HPos::Center, VPos::Center),
            )?;
        }

        let polygon = chart_math::radar_polygon(values, r_max);
        chart
            .draw_series(once(Polygon::new(polygon.clone(), TAB10[0].mix(0.25).filled())))
            .map_err(render_error)?;
        chart
            .draw_series(LineSeries::new(polygon.clone(), TAB10[0].stroke_width(2)))
            .map_err(render_error)?;
        chart
            .draw_series(
                polygon
                    .iter()
                    .take(values.len())
                    .map(|&p| Circle::new(p, 4, TAB10[0].filled())),
            )
            .map_err(render_error)?;

        Ok(())
    }

    fn draw_heatmap<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        values: &[f64],
    ) -> Result<()> {
        let matrix = chart_math::outer_product(values);
        let (lo, hi) = chart_math::matrix_bounds(&matrix).unwrap_or((0.0, 1.0));
        let n = values.len() as f64;

        // right-hand strip holds the colour bar
        let mut chart = self.panel(area, title, -0.8..n + 1.6, -0.8..n + 0.2)?;

        let cells = matrix.iter().enumerate().flat_map(|(i, row)| {
            row.iter().enumerate().map(move |(j, &v)| {
                let (r, g, b) = chart_math::viridis(chart_math::normalize(v, lo, hi));
                let top = n - i as f64;
                Rectangle::new(
                    [(j as f64, top - 1.0), (j as f64 + 1.0, top)],
                    RGBColor(r, g, b).filled(),
                )
            })
        });
        chart.draw_series(cells).map_err(render_error)?;

        for k in 0..values.len() {
            let center = k as f64 + 0.5;
            let index = k.to_string();
            self.text(&mut chart, &index, (center, -0.1), 12, Pos::new(HPos::Center, VPos::Top))?;
            self.text(&mut chart, &index, (-0.1, n - center), 12, Pos::new(HPos::Right, VPos::Center))?;
        }

        let steps = 48;
        let (bar_left, bar_right) = (n + 0.3, n + 0.6);
        let strip = (0..steps).map(|s| {
            let t0 = s as f64 / steps as f64;
            let t1 = (s + 1) as f64 / steps as f64;
            let (r, g, b) = chart_math::viridis((t0 + t1) / 2.0);
            Rectangle::new([(bar_left, t0 * n), (bar_right, t1 * n)], RGBColor(r, g, b).filled())
        });
        chart.draw_series(strip).map_err(render_error)?;
        self.text(&mut chart, &tick_label(lo), (bar_right + 0.1, 0.0), 12, Pos::new(HPos::Left, VPos::Bottom))?;
        self.text(&mut chart, &tick_label(hi), (bar_right + 0.1, n), 12, Pos::new(HPos::Left, VPos::Top))?;

        Ok(())
    }

    fn draw_bar<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        labels: &[&str],
        values: &[f64],
    ) -> Result<()> {
        let (bottom, top) = value_span(values, true);
        let n = values.len() as f64;
        let label_room = 0.15 * (top - bottom);
        let mut chart = self.panel(area, title, -1.2..n - 0.4, bottom - label_room..top)?;

        let bars = values.iter().enumerate().map(|(i, &v)| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, v)], TAB10[0].filled())
        });
        chart.draw_series(bars).map_err(render_error)?;

        self.value_axis_y(&mut chart, -0.6, bottom, top)?;
        Self::line(&mut chart, vec![(-0.6, 0.0), (n - 0.4, 0.0)], BLACK.stroke_width(1))?;
        for (i, label) in labels.iter().enumerate() {
            self.text(&mut chart, label, (i as f64, bottom), 12, Pos::new(HPos::Center, VPos::Top))?;
        }

        Ok(())
    }

    fn draw_barh<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        labels: &[&str],
        values: &[f64],
    ) -> Result<()> {
        let (left, right) = value_span(values, true);
        let n = values.len() as f64;
        let label_room = 0.3 * (right - left);
        let y_room = 0.08 * n.max(1.0);
        let mut chart = self.panel(area, title, left - label_room..right, -0.6 - y_room..n - 0.4)?;

        let bars = values.iter().enumerate().map(|(i, &v)| {
            let y = i as f64;
            Rectangle::new([(0.0, y - 0.4), (v, y + 0.4)], TAB10[0].filled())
        });
        chart.draw_series(bars).map_err(render_error)?;

        Self::line(&mut chart, vec![(left, -0.6), (right, -0.6)], BLACK.stroke_width(1))?;
        Self::line(&mut chart, vec![(0.0, -0.6), (0.0, n - 0.4)], BLACK.stroke_width(1))?;
        let tick = 0.15 * y_room;
        for x in chart_math::nice_ticks(left, right) {
            Self::line(&mut chart, vec![(x, -0.6), (x, -0.6 - tick)], BLACK.stroke_width(1))?;
            self.text(&mut chart, &tick_label(x), (x, -0.6 - tick), 11, Pos::new(HPos::Center, VPos::Top))?;
        }
        for (i, label) in labels.iter().enumerate() {
            let at = (left - 0.02 * (right - left), i as f64);
            self.text(&mut chart, label, at, 12, Pos::new(HPos::Right, VPos::Center))?;
        }

        Ok(())
    }

    fn draw_pie<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        labels: &[&str],
        values: &[f64],
    ) -> Result<()> {
        let mut chart = self.panel(area, title, -1.5..1.5, -1.5..1.5)?;
        let wedges: Vec<PieWedge> = chart_math::pie_wedges(values);

        for (i, wedge) in wedges.iter().enumerate() {
            if wedge.fraction <= 0.0 {
                continue;
            }
            let mut outline = vec![(0.0, 0.0)];
            outline.extend(chart_math::arc_points((0.0, 0.0), 1.0, wedge.start, wedge.end));
            chart
                .draw_series(once(Polygon::new(outline, TAB10[i % TAB10.len()].filled())))
                .map_err(render_error)?;
        }

        for (wedge, label) in wedges.iter().zip(labels) {
            let (dx, dy) = (wedge.mid_angle().cos(), wedge.mid_angle().sin());
            let h = if dx >= 0.0 { HPos::Left } else { HPos::Right };
            self.text(&mut chart, label, (1.1 * dx, 1.1 * dy), 13, Pos::new(h, VPos::Center))?;
            let percent = format!("{:.1}%", wedge.fraction * 100.0);
            self.text(&mut chart, &percent, (0.6 * dx, 0.6 * dy), 11, Pos::new(HPos::Center, VPos::Center))?;
        }

        Ok(())
    }

    fn draw_step<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        labels: &[&str],
        values: &[f64],
    ) -> Result<()> {
        let (lo, hi) = value_span(values, false);
        let n = values.len() as f64;
        let label_room = 0.15 * (hi - lo);
        let mut chart = self.panel(area, title, -1.2..n - 0.4, lo - label_room..hi)?;

        chart
            .draw_series(LineSeries::new(
                chart_math::step_mid_path(values),
                TAB10[0].stroke_width(2),
            ))
            .map_err(render_error)?;

        self.value_axis_y(&mut chart, -0.6, lo, hi)?;
        Self::line(&mut chart, vec![(-0.6, lo), (n - 0.4, lo)], BLACK.stroke_width(1))?;
        for (i, label) in labels.iter().enumerate() {
            self.text(&mut chart, label, (i as f64, lo), 12, Pos::new(HPos::Center, VPos::Top))?;
        }

        Ok(())
    }

    /// Vertical value axis with tick marks at `x`
    fn value_axis_y<DB: DrawingBackend>(
        &self,
        chart: &mut Chart<'_, DB>,
        x: f64,
        lo: f64,
        hi: f64,
    ) -> Result<()> {
        Self::line(chart, vec![(x, lo), (x, hi)], BLACK.stroke_width(1))?;
        for y in chart_math::nice_ticks(lo, hi) {
            Self::line(chart, vec![(x - 0.1, y), (x, y)], BLACK.stroke_width(1))?;
            self.text(chart, &tick_label(y), (x - 0.15, y), 11, Pos::new(HPos::Right, VPos::Center))?;
        }
        Ok(())
    }
}

/// Axis span for the values, padded by 10%; bar charts always include zero
fn value_span(values: &[f64], from_zero: bool) -> (f64, f64) {
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if from_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }

    let range = hi - lo;
    let pad = if range > 1e-9 { 0.1 * range } else { 0.5 * hi.abs().max(1.0) };
    if from_zero {
        (if lo < 0.0 { lo - pad } else { 0.0 }, hi + pad)
    } else {
        (lo - pad, hi + pad)
    }
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| SurveyError::Render("pixel buffer does not match figure size".into()))?;
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::IndicatorMean;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn aggregate(values: &[f64]) -> GroupAggregate {
        GroupAggregate {
            group: "10-18岁".to_string(),
            row_count: 10,
            means: values
                .iter()
                .enumerate()
                .map(|(i, &mean)| IndicatorMean {
                    indicator: format!("指标{}", i),
                    mean,
                })
                .collect(),
        }
    }

    #[test]
    fn test_titles() {
        assert_eq!(ChartKind::Radar.title("18-22岁"), "18-22岁 雷达图");
        assert_eq!(ChartKind::Step.title("22-30岁"), "22-30岁 阶梯图");
        assert_eq!(ChartKind::ALL.len(), 6);
    }

    #[test]
    fn test_render_png() {
        let renderer = ChartRenderer::new(600, 400);
        let png = renderer
            .render_png(&aggregate(&[3.1, 2.9, 3.0, 3.4, 2.6, 3.0, 3.2, 2.8]))
            .unwrap();

        assert!(png.starts_with(&PNG_SIGNATURE));

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 600);
        assert_eq!(decoded.height(), 400);
    }

    #[test]
    fn test_render_base64_decodes_to_png() {
        let renderer = ChartRenderer::new(450, 300);
        let encoded = renderer.render_base64(&aggregate(&[2.0, 4.0, 1.0])).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        assert!(bytes.starts_with(&PNG_SIGNATURE));
    }

    #[test]
    fn test_render_degenerate_values() {
        let renderer = ChartRenderer::new(300, 200);
        renderer.render_png(&aggregate(&[0.0, 0.0])).unwrap();
        renderer.render_png(&aggregate(&[5.0])).unwrap();
        renderer.render_png(&aggregate(&[-1.0, 2.0, 0.5])).unwrap();
    }

    #[test]
    fn test_render_without_indicators_fails() {
        let renderer = ChartRenderer::new(300, 200);
        let err = renderer.render_png(&aggregate(&[])).unwrap_err();
        assert!(matches!(err, SurveyError::Render(_)));
    }

    #[test]
    fn test_minimum_size() {
        let renderer = ChartRenderer::new(10, 10);
        assert_eq!(renderer.dimensions(), (MIN_WIDTH, MIN_HEIGHT));
        assert!(!renderer.labels_enabled());
    }

    #[test]
    fn test_missing_font_file() {
        let err = ChartRenderer::new(300, 200)
            .with_font(Path::new("/nonexistent/SimHei.ttf"))
            .unwrap_err();
        assert!(matches!(err, SurveyError::Font { .. }));
    }

    #[test]
    fn test_invalid_font_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        fs::write(&path, b"definitely not a font file").unwrap();

        let err = ChartRenderer::new(300, 200).with_font(&path).unwrap_err();
        match err {
            SurveyError::Font { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected Font error, got {:?}", other),
        }
    }

    /// Common system font locations; labelled rendering is skipped when none exist
    const SYSTEM_FONTS: [&str; 4] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/Library/Fonts/Arial.ttf",
    ];

    #[test]
    fn test_render_with_registered_font() {
        let Some(font) = SYSTEM_FONTS.iter().map(Path::new).find(|p| p.exists()) else {
            eprintln!("no system font found, skipping labelled render");
            return;
        };

        let renderer = ChartRenderer::new(900, 600).with_font(font).unwrap();
        assert!(renderer.labels_enabled());

        let png = renderer
            .render_png(&aggregate(&[3.1, 2.9, 3.0, 3.4, 2.6]))
            .unwrap();
        assert!(png.starts_with(&PNG_SIGNATURE));

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (900, 600));

        // Second registration of the same file reuses the cached bytes
        let again = ChartRenderer::new(300, 200).with_font(font).unwrap();
        again.render_png(&aggregate(&[1.0, 5.0])).unwrap();
    }

    #[test]
    fn test_value_span() {
        let (lo, hi) = value_span(&[2.0, 4.0], true);
        assert!(lo == 0.0 && (hi - 4.4).abs() < 1e-9);
        let (lo, hi) = value_span(&[2.0, 4.0], false);
        assert!((lo - 1.8).abs() < 1e-9 && (hi - 4.2).abs() < 1e-9);
        assert_eq!(value_span(&[0.0, 0.0], true), (0.0, 0.5));
        assert_eq!(value_span(&[], false), (0.0, 1.0));
    }
}
