//! Chart Plotter Module
//! Prepares per-lead panel data: signal trace and beat markers.

use crate::data::{BeatClass, DataProcessor, Lead, ProcessorError};
use plotters::style::RGBColor;
use polars::prelude::*;
use rayon::prelude::*;

/// Trace color
pub const SIGNAL_COLOR: RGBColor = RGBColor(31, 119, 180); // Blue
/// Normal beat marker
pub const NORMAL_COLOR: RGBColor = RGBColor(0, 128, 0); // Green
/// Anomalous beat marker
pub const ANOMALOUS_COLOR: RGBColor = RGBColor(255, 0, 0); // Red

/// An annotated beat drawn on a panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatMarker {
    pub time: f64,
    pub class: BeatClass,
}

impl BeatMarker {
    pub fn color(&self) -> RGBColor {
        ChartPlotter::marker_color(self.class)
    }
}

/// Chart data for a single lead panel
#[derive(Debug, Clone)]
pub struct ChartData {
    pub lead: Lead,
    pub points: Vec<(f64, f64)>,
    pub markers: Vec<BeatMarker>,
}

impl ChartData {
    /// Height at which the beat markers sit: the panel's signal maximum.
    pub fn marker_level(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|(_, v)| *v)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
    }

    /// Vertical extent of the trace.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &(_, v) in &self.points {
            min = min.min(v);
            max = max.max(v);
        }
        if min.is_finite() && max.is_finite() {
            Some((min, max))
        } else {
            None
        }
    }

    /// Marker positions; empty when the panel has no trace.
    pub fn marker_points(&self) -> Vec<(f64, f64, BeatClass)> {
        match self.marker_level() {
            Some(level) => self
                .markers
                .iter()
                .map(|m| (m.time, level, m.class))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn count_markers(&self, class: BeatClass) -> usize {
        self.markers.iter().filter(|m| m.class == class).count()
    }
}

/// Builds the per-lead panel data from the windowed frames.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn marker_color(class: BeatClass) -> RGBColor {
        match class {
            BeatClass::Normal => NORMAL_COLOR,
            BeatClass::Anomalous => ANOMALOUS_COLOR,
        }
    }

    /// One panel per lead, in plot order. Panels are built in parallel.
    pub fn build_panels(
        signal: &DataFrame,
        annotations: &DataFrame,
    ) -> Result<Vec<ChartData>, ProcessorError> {
        let markers: Vec<BeatMarker> = DataProcessor::beat_events(annotations)?
            .into_iter()
            .map(|(time, class)| BeatMarker { time, class })
            .collect();

        Lead::ALL
            .par_iter()
            .map(|lead| -> Result<ChartData, ProcessorError> {
                Ok(ChartData {
                    lead: *lead,
                    points: DataProcessor::time_series(signal, lead.column_name())?,
                    markers: markers.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(points: Vec<(f64, f64)>) -> ChartData {
        ChartData {
            lead: Lead::II,
            points,
            markers: vec![
                BeatMarker {
                    time: 1.0,
                    class: BeatClass::Normal,
                },
                BeatMarker {
                    time: 2.0,
                    class: BeatClass::Anomalous,
                },
            ],
        }
    }

    #[test]
    fn markers_sit_at_panel_maximum() {
        let chart = panel(vec![(0.0, -0.4), (1.0, 1.3), (2.0, 0.2)]);
        assert_eq!(chart.marker_level(), Some(1.3));
        assert_eq!(
            chart.marker_points(),
            vec![(1.0, 1.3, BeatClass::Normal), (2.0, 1.3, BeatClass::Anomalous)]
        );
        assert_eq!(chart.value_range(), Some((-0.4, 1.3)));
    }

    #[test]
    fn empty_panel_draws_no_markers() {
        let chart = panel(Vec::new());
        assert_eq!(chart.marker_level(), None);
        assert!(chart.marker_points().is_empty());
        assert_eq!(chart.value_range(), None);
    }

    #[test]
    fn marker_colors_follow_beat_class() {
        assert_eq!(ChartPlotter::marker_color(BeatClass::Normal), NORMAL_COLOR);
        assert_eq!(ChartPlotter::marker_color(BeatClass::Anomalous), ANOMALOUS_COLOR);
    }

    #[test]
    fn builds_one_panel_per_lead() {
        let mut columns = vec![Column::new("T".into(), &[0.0f64, 0.1])];
        for (k, lead) in Lead::ALL.iter().enumerate() {
            columns.push(Column::new(
                lead.column_name().into(),
                &[k as f64, k as f64 + 0.5],
            ));
        }
        let signal = DataFrame::new(columns).unwrap();
        let annotations = df!("T" => &[0.05f64], "Annotation" => &[4i32]).unwrap();

        let panels = ChartPlotter::build_panels(&signal, &annotations).unwrap();
        assert_eq!(panels.len(), 12);
        assert_eq!(panels[3].lead, Lead::AVR);
        assert_eq!(panels[3].marker_level(), Some(3.5));
        assert_eq!(panels[0].count_markers(BeatClass::Anomalous), 1);
    }
}
