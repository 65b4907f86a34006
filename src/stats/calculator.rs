//! Statistics Calculator Module
//! Descriptive statistics per lead and beat statistics for the plotted window.

use crate::data::{BeatClass, DataProcessor, Lead, ProcessorError};
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Median, Min};

/// Statistics for a single lead within the window.
#[derive(Debug, Clone, Serialize)]
pub struct LeadStats {
    pub lead: Lead,
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub p05: Option<f64>,
    pub p95: Option<f64>,
}

impl LeadStats {
    fn empty(lead: Lead) -> Self {
        Self {
            lead,
            count: 0,
            min: None,
            max: None,
            mean: None,
            median: None,
            std: None,
            p05: None,
            p95: None,
        }
    }
}

/// Annotated beats falling inside the window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BeatSummary {
    pub total: usize,
    pub normal: usize,
    pub anomalous: usize,
    /// Mean heart rate from beat-to-beat intervals (bpm).
    pub mean_heart_rate_bpm: Option<f64>,
    /// Standard deviation of beat-to-beat intervals (ms).
    pub sdnn_ms: Option<f64>,
}

/// Everything known about the plotted window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub start_s: f64,
    pub end_s: f64,
    pub signal_points: usize,
    pub beats: BeatSummary,
    pub leads: Vec<LeadStats>,
}

impl WindowSummary {
    pub fn lead(&self, lead: Lead) -> Option<&LeadStats> {
        self.leads.iter().find(|s| s.lead == lead)
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(lead: Lead, values: &[f64]) -> LeadStats {
        let n = values.len();
        if n == 0 {
            return LeadStats::empty(lead);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let data = Data::new(values.to_vec());
        let std = if n > 1 { data.std_dev() } else { Some(0.0) };

        LeadStats {
            lead,
            count: n,
            min: Some(data.min()),
            max: Some(data.max()),
            mean: data.mean(),
            median: Some(data.median()),
            std,
            p05: Some(Self::percentile(&sorted, 5.0)),
            p95: Some(Self::percentile(&sorted, 95.0)),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Count beats and derive heart rate figures from their spacing.
    pub fn compute_beat_summary(events: &[(f64, BeatClass)]) -> BeatSummary {
        let anomalous = events
            .iter()
            .filter(|(_, class)| *class == BeatClass::Anomalous)
            .count();

        let mut times: Vec<f64> = events.iter().map(|(t, _)| *t).collect();
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let intervals: Vec<f64> = times
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|rr| *rr > 0.0)
            .collect();

        let mean_rr = if intervals.is_empty() {
            None
        } else {
            Data::new(intervals.clone()).mean()
        };
        let sdnn_ms = if intervals.len() > 1 {
            Data::new(intervals).std_dev().map(|s| s * 1000.0)
        } else {
            None
        };

        BeatSummary {
            total: events.len(),
            normal: events.len() - anomalous,
            anomalous,
            mean_heart_rate_bpm: mean_rr.map(|rr| 60.0 / rr),
            sdnn_ms,
        }
    }

    /// Summarise the (already windowed) signal and annotation frames.
    ///
    /// Lead statistics are computed in parallel.
    pub fn compute_window_summary(
        signal: &DataFrame,
        annotations: &DataFrame,
        start_s: f64,
        end_s: f64,
    ) -> Result<WindowSummary, ProcessorError> {
        let leads = Lead::ALL
            .par_iter()
            .map(|lead| -> Result<LeadStats, ProcessorError> {
                let values: Vec<f64> = DataProcessor::time_series(signal, lead.column_name())?
                    .into_iter()
                    .map(|(_, v)| v)
                    .collect();
                Ok(Self::compute_descriptive_stats(*lead, &values))
            })
            .collect::<Result<Vec<_>, ProcessorError>>()?;

        let events = DataProcessor::beat_events(annotations)?;

        Ok(WindowSummary {
            start_s,
            end_s,
            signal_points: signal.height(),
            beats: Self::compute_beat_summary(&events),
            leads,
        })
    }
}
