//! ECG Plot Application
//! Batch run: load, unpack, export, window, summarise and render.

use crate::charts::{ChartData, ChartLayout, ChartPlotter, ChartRenderer, RenderError};
use crate::config::{AppConfig, ConfigError};
use crate::data::{
    CsvExporter, DataLoader, DataProcessor, ExportError, ExportPaths, LoaderError,
    ProcessorError,
};
use crate::stats::{StatsCalculator, WindowSummary};
use polars::prelude::*;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Input and output locations of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub signal_files: Vec<PathBuf>,
    pub annotation_files: Vec<PathBuf>,
    pub output_html: PathBuf,
    pub output_png: Option<PathBuf>,
}

/// Unpacked signal, annotations and their merged timeline.
#[derive(Debug, Clone)]
pub struct UnpackedData {
    pub signal: DataFrame,
    pub annotations: DataFrame,
    pub merged: DataFrame,
}

/// Frames and panel data restricted to the plot window.
#[derive(Debug, Clone)]
pub struct PlotWindow {
    /// Windowed and downsampled signal
    pub signal: DataFrame,
    /// Windowed annotations (never downsampled)
    pub annotations: DataFrame,
    pub summary: WindowSummary,
    pub panels: Vec<ChartData>,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub signal_rows: usize,
    pub annotation_rows: usize,
    pub exports: ExportPaths,
    pub summary: WindowSummary,
    pub html: PathBuf,
    pub png: Option<PathBuf>,
}

/// Main application driver.
pub struct EcgApp {
    config: AppConfig,
    loader: DataLoader,
}

impl EcgApp {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            config,
            loader: DataLoader::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load the input files and build the signal, annotation and merged frames.
    pub fn unpack(
        &mut self,
        signal_files: &[PathBuf],
        annotation_files: &[PathBuf],
    ) -> Result<UnpackedData, AppError> {
        let rate = self.config.data_sampling_hz;

        let raw_signal = self.loader.load_signal_files(signal_files)?;
        info!(
            "Read file consisting of {} entries, corresponding to {} s",
            raw_signal.height(),
            format_elapsed(raw_signal.height() as f64 / rate)
        );
        debug!("\n{}", raw_signal.head(Some(10)));
        let signal = DataProcessor::build_signal_frame(raw_signal, rate)?;

        let raw_annotations = self.loader.load_annotation_files(annotation_files)?;
        info!(
            "Read annotation file consisting of {} entries",
            raw_annotations.height()
        );
        let annotations = DataProcessor::build_annotation_frame(raw_annotations, rate)?;

        debug!("\n{}", signal.head(Some(10)));
        debug!(
            "{} anomalous annotations overall",
            DataProcessor::count_anomalous(&annotations)?
        );

        let merged = DataProcessor::merge_timeline(&signal, &annotations)?;

        Ok(UnpackedData {
            signal,
            annotations,
            merged,
        })
    }

    /// Write the three CSV exports into the configured directory.
    pub fn export(&self, data: &UnpackedData) -> Result<ExportPaths, AppError> {
        info!("Saving output files");
        Ok(CsvExporter::export_all(
            &self.config.export_dir,
            &data.signal,
            &data.annotations,
            &data.merged,
        )?)
    }

    /// Restrict to the plot window, downsample the signal and build the panels.
    pub fn prepare_window(&self, data: &UnpackedData) -> Result<PlotWindow, AppError> {
        let start = self.config.window_start_s;
        let end = self.config.window_end_s;

        let windowed = DataProcessor::select_window(&data.signal, start, end)?;
        let annotations = DataProcessor::select_window(&data.annotations, start, end)?;
        if windowed.height() == 0 {
            warn!("No signal samples between {} s and {} s", start, end);
        }

        let signal = DataProcessor::downsample(&windowed, self.config.downsample_step())?;
        let summary =
            StatsCalculator::compute_window_summary(&signal, &annotations, start, end)?;
        info!(
            "In the selected interval, {} anomalous beats have been found",
            summary.beats.anomalous
        );
        if let Some(bpm) = summary.beats.mean_heart_rate_bpm {
            debug!("Mean heart rate in window: {:.1} bpm", bpm);
        }

        let panels = ChartPlotter::build_panels(&signal, &annotations)?;

        Ok(PlotWindow {
            signal,
            annotations,
            summary,
            panels,
        })
    }

    /// Render the window as a static HTML page, plus a PNG when requested.
    pub fn render(&self, window: &PlotWindow, options: &RunOptions) -> Result<(), AppError> {
        let layout = ChartLayout::from_config(&self.config);

        let html = ChartRenderer::render_html(&window.panels, &layout, &window.summary)?;
        ChartRenderer::write_html(&options.output_html, &html)?;

        if let Some(png) = &options.output_png {
            ChartRenderer::render_png(png, &window.panels, &layout)?;
            info!("PNG saved to {}", png.display());
        }
        Ok(())
    }

    /// Full batch run.
    pub fn run(&mut self, options: &RunOptions) -> Result<RunReport, AppError> {
        let data = self.unpack(&options.signal_files, &options.annotation_files)?;
        let exports = self.export(&data)?;

        info!("Plotting selected range");
        let window = self.prepare_window(&data)?;
        self.render(&window, options)?;
        info!("Output saved to {}", options.output_html.display());

        Ok(RunReport {
            signal_rows: data.signal.height(),
            annotation_rows: data.annotations.height(),
            exports,
            summary: window.summary,
            html: options.output_html.clone(),
            png: options.output_png.clone(),
        })
    }
}

/// Format seconds as `H:MM:SS.mmm`.
pub fn format_elapsed(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms % 60_000) as f64 / 1000.0;
    format!("{}:{:02}:{:06.3}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_elapsed_time() {
        assert_eq!(format_elapsed(0.0), "0:00:00.000");
        assert_eq!(format_elapsed(3661.5), "1:01:01.500");
        assert_eq!(format_elapsed(3600.0 * 10.0 + 59.999), "10:00:59.999");
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = AppConfig {
            plot_sampling_hz: -1.0,
            ..AppConfig::default()
        };
        assert!(matches!(EcgApp::new(config), Err(AppError::Config(_))));
    }
}
