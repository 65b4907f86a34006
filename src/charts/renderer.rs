//! Static Chart Renderer
//! Draws the lead panels with plotters and assembles them into a static page.
//!
//! Layout:
//! 1. Title and a one-line window summary
//! 2. One panel per lead, stacked vertically, scaled to page width
//!    - Shared horizontal range: [start, start + x_range]
//!    - Signal trace, beat markers at the panel's signal maximum
//! 3. Window summary as an embedded JSON block

use crate::charts::{ChartData, ChartPlotter, SIGNAL_COLOR};
use crate::config::AppConfig;
use crate::stats::WindowSummary;
use plotters::coord::Shift;
use plotters::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Half-width of a beat marker in pixels.
const MARKER_SIZE: i32 = 5;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize window summary: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No panels to render")]
    NoPanels,
}

fn drawing_error<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Drawing(err.to_string())
}

/// Panel geometry and the horizontal range shared by all panels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: u32,
    pub height: u32,
    pub x_range: (f64, f64),
}

impl ChartLayout {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            width: config.panel_width,
            height: config.panel_height,
            x_range: config.x_range(),
        }
    }
}

pub struct ChartRenderer;

impl ChartRenderer {
    /// Vertical range of a panel, padded so markers at the maximum stay visible.
    pub fn y_bounds(chart: &ChartData) -> (f64, f64) {
        match chart.value_range() {
            Some((min, max)) => {
                let span = max - min;
                let pad = if span > 0.0 { span * 0.1 } else { 0.5 };
                (min - pad, max + pad)
            }
            None => (-1.0, 1.0),
        }
    }

    /// Points of the trace inside the shared horizontal range.
    fn visible_points(chart: &ChartData, x_range: (f64, f64)) -> Vec<(f64, f64)> {
        chart
            .points
            .iter()
            .copied()
            .filter(|(t, _)| *t >= x_range.0 && *t <= x_range.1)
            .collect()
    }

    /// Draw one lead panel on any plotters backend.
    pub fn draw_panel<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        chart: &ChartData,
        layout: &ChartLayout,
    ) -> Result<(), RenderError> {
        area.fill(&WHITE).map_err(drawing_error)?;

        let (x_start, x_end) = layout.x_range;
        let (y_min, y_max) = Self::y_bounds(chart);

        let mut ctx = ChartBuilder::on(area)
            .caption(format!("Lead {}", chart.lead), ("sans-serif", 16))
            .margin(8)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_start..x_end, y_min..y_max)
            .map_err(drawing_error)?;

        ctx.configure_mesh()
            .x_desc("time (s)")
            .y_desc("V (mV)")
            .draw()
            .map_err(drawing_error)?;

        ctx.draw_series(LineSeries::new(
            Self::visible_points(chart, layout.x_range),
            SIGNAL_COLOR.stroke_width(1),
        ))
        .map_err(drawing_error)?;

        // Inverted triangles centred on (beat time, panel maximum)
        ctx.draw_series(
            chart
                .marker_points()
                .into_iter()
                .filter(|(t, _, _)| *t >= x_start && *t <= x_end)
                .map(|(t, level, class)| {
                    let color = ChartPlotter::marker_color(class);
                    EmptyElement::at((t, level))
                        + PathElement::new(
                            vec![
                                (-MARKER_SIZE, -MARKER_SIZE),
                                (MARKER_SIZE, -MARKER_SIZE),
                                (0, MARKER_SIZE),
                                (-MARKER_SIZE, -MARKER_SIZE),
                            ],
                            color.stroke_width(1),
                        )
                }),
        )
        .map_err(drawing_error)?;

        Ok(())
    }

    /// Render one panel as an SVG document.
    pub fn render_panel_svg(chart: &ChartData, layout: &ChartLayout) -> Result<String, RenderError> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (layout.width, layout.height))
                .into_drawing_area();
            Self::draw_panel(&root, chart, layout)?;
            root.present().map_err(drawing_error)?;
        }
        Ok(svg)
    }

    /// Render every panel (in parallel) and assemble the page.
    pub fn render_html(
        panels: &[ChartData],
        layout: &ChartLayout,
        summary: &WindowSummary,
    ) -> Result<String, RenderError> {
        if panels.is_empty() {
            return Err(RenderError::NoPanels);
        }

        let svgs = panels
            .par_iter()
            .map(|chart| Self::render_panel_svg(chart, layout))
            .collect::<Result<Vec<_>, RenderError>>()?;

        let labelled: Vec<(String, String)> = panels
            .iter()
            .zip(svgs)
            .map(|(chart, svg)| (chart.lead.to_string(), svg))
            .collect();

        Self::assemble_html(&labelled, summary)
    }

    /// Stack pre-rendered panel SVGs into one static HTML page.
    pub fn assemble_html(
        panels: &[(String, String)],
        summary: &WindowSummary,
    ) -> Result<String, RenderError> {
        let title = format!(
            "ECG leads, {} s to {} s",
            summary.start_s, summary.end_s
        );
        let summary_json = serde_json::to_string(summary)?.replace("</", "<\\/");

        let mut html = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{title}</title>\n<style>\n\
             body {{ font-family: sans-serif; margin: 0 auto; max-width: 1400px; }}\n\
             .panel svg {{ width: 100%; height: auto; display: block; }}\n\
             </style>\n</head>\n<body>\n<h1>{title}</h1>\n",
            title = escape_html(&title)
        );
        html.push_str(&format!(
            "<p class=\"summary\">{} beats in window, {} anomalous</p>\n",
            summary.beats.total, summary.beats.anomalous
        ));

        html.push_str("<div class=\"panels\">\n");
        for (lead, svg) in panels {
            html.push_str(&format!(
                "<div class=\"panel\" id=\"lead-{}\">\n{}\n</div>\n",
                escape_html(lead),
                inline_svg(svg)
            ));
        }
        html.push_str("</div>\n");

        html.push_str(&format!(
            "<script type=\"application/json\" id=\"window-summary\">{summary_json}</script>\n"
        ));
        html.push_str("</body>\n</html>\n");

        Ok(html)
    }

    pub fn write_html(path: &Path, html: &str) -> Result<(), RenderError> {
        fs::write(path, html).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render the panels stacked vertically into one PNG image.
    pub fn render_png(
        path: &Path,
        panels: &[ChartData],
        layout: &ChartLayout,
    ) -> Result<(), RenderError> {
        if panels.is_empty() {
            return Err(RenderError::NoPanels);
        }

        let height = layout.height * panels.len() as u32;
        let root = BitMapBackend::new(path, (layout.width, height)).into_drawing_area();
        let areas = root.split_evenly((panels.len(), 1));
        for (area, chart) in areas.iter().zip(panels) {
            Self::draw_panel(area, chart, layout)?;
        }
        root.present().map_err(drawing_error)?;
        Ok(())
    }
}

/// Drop anything before the `<svg` tag so the document can be inlined.
fn inline_svg(svg: &str) -> &str {
    match svg.find("<svg") {
        Some(start) => &svg[start..],
        None => svg,
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::BeatMarker;
    use crate::data::{BeatClass, Lead};
    use crate::stats::BeatSummary;

    fn summary() -> WindowSummary {
        WindowSummary {
            start_s: 3060.0,
            end_s: 3080.0,
            signal_points: 2000,
            beats: BeatSummary {
                total: 24,
                normal: 22,
                anomalous: 2,
                mean_heart_rate_bpm: Some(72.0),
                sdnn_ms: Some(41.5),
            },
            leads: Vec::new(),
        }
    }

    fn chart(points: Vec<(f64, f64)>) -> ChartData {
        ChartData {
            lead: Lead::AVL,
            points,
            markers: vec![BeatMarker {
                time: 3061.0,
                class: BeatClass::Anomalous,
            }],
        }
    }

    #[test]
    fn y_bounds_pad_the_trace() {
        let (lo, hi) = ChartRenderer::y_bounds(&chart(vec![(0.0, -1.0), (1.0, 1.0)]));
        assert!((lo + 1.2).abs() < 1e-12);
        assert!((hi - 1.2).abs() < 1e-12);
    }

    #[test]
    fn y_bounds_of_flat_and_empty_traces() {
        assert_eq!(
            ChartRenderer::y_bounds(&chart(vec![(0.0, 2.0), (1.0, 2.0)])),
            (1.5, 2.5)
        );
        assert_eq!(ChartRenderer::y_bounds(&chart(Vec::new())), (-1.0, 1.0));
    }

    #[test]
    fn trace_is_clipped_to_shared_range() {
        let c = chart(vec![(3059.9, 0.0), (3060.0, 1.0), (3079.0, 2.0), (3081.0, 3.0)]);
        let visible = ChartRenderer::visible_points(&c, (3060.0, 3080.0));
        assert_eq!(visible, vec![(3060.0, 1.0), (3079.0, 2.0)]);
    }

    #[test]
    fn page_stacks_panels_in_order_with_summary() {
        let panels = vec![
            ("I".to_string(), "<svg id=\"a\"></svg>".to_string()),
            (
                "aVR".to_string(),
                "<?xml version=\"1.0\"?>\n<svg id=\"b\"></svg>".to_string(),
            ),
        ];

        let html = ChartRenderer::assemble_html(&panels, &summary()).unwrap();
        let first = html.find("id=\"lead-I\"").unwrap();
        let second = html.find("id=\"lead-aVR\"").unwrap();
        assert!(first < second);
        assert!(!html.contains("<?xml"));
        assert!(html.contains("24 beats in window, 2 anomalous"));
        assert!(html.contains("\"anomalous\":2"));
        assert!(html.contains("<title>ECG leads, 3060 s to 3080 s</title>"));
    }

    #[test]
    fn empty_panel_list_is_rejected() {
        let layout = ChartLayout::from_config(&AppConfig::default());
        assert!(matches!(
            ChartRenderer::render_html(&[], &layout, &summary()),
            Err(RenderError::NoPanels)
        ));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn renders_svg_panel() {
        let layout = ChartLayout::from_config(&AppConfig::default());
        let c = chart(vec![(3060.0, 0.1), (3061.0, 0.9), (3062.0, -0.3)]);
        let svg = ChartRenderer::render_panel_svg(&c, &layout).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Lead aVL"));
    }
}
