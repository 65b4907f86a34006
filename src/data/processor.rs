//! Data Processor Module
//! Timeline reconstruction, lead derivation, merging and windowing.

use crate::data::lead::{BeatClass, Lead};
use crate::data::loader::{ANNOTATION_CODE_COLUMN, ANNOTATION_TIME_COLUMN};
use polars::prelude::*;
use thiserror::Error;

/// Elapsed time column (seconds).
pub const TIME_COLUMN: &str = "T";
/// Record discriminator column.
pub const TYPE_COLUMN: &str = "TYPE";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Required column '{0}' is missing")]
    MissingColumn(String),
    #[error("Sampling rate must be positive, got {0}")]
    InvalidSamplingRate(f64),
}

/// Discriminator stored in the `TYPE` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Signal = 0,
    Annotation = 1,
}

impl RecordType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Recorded limb leads of a single sample, with the derived leads as methods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadSample {
    pub i: f64,
    pub ii: f64,
}

impl LeadSample {
    pub fn new(i: f64, ii: f64) -> Self {
        Self { i, ii }
    }

    pub fn iii(&self) -> f64 {
        self.ii - self.i
    }

    pub fn avr(&self) -> f64 {
        -(self.i + self.ii) / 2.0
    }

    pub fn avl(&self) -> f64 {
        (self.i - self.iii()) / 2.0
    }

    pub fn avf(&self) -> f64 {
        (self.ii + self.iii()) / 2.0
    }
}

/// Handles the transformation of raw frames into the unpacked representation.
pub struct DataProcessor;

impl DataProcessor {
    /// Compute III, aVR, aVL and aVF from the recorded I and II columns.
    pub fn derive_leads(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        Self::require_columns(df, &[Lead::I.column_name(), Lead::II.column_name()])?;

        let derived = df
            .clone()
            .lazy()
            .with_column((col("II") - col("I")).alias("III"))
            .with_columns([
                ((col("I") + col("II")) / lit(-2.0)).alias("aVR"),
                ((col("I") - col("III")) / lit(2.0)).alias("aVL"),
                ((col("II") + col("III")) / lit(2.0)).alias("aVF"),
            ])
            .collect()?;

        Ok(derived)
    }

    /// Overwrite `T` with `row_index / sampling_hz`.
    ///
    /// Whatever the recorded time column holds is discarded.
    pub fn normalize_signal_time(
        df: &DataFrame,
        sampling_hz: f64,
    ) -> Result<DataFrame, ProcessorError> {
        Self::check_rate(sampling_hz)?;

        let times: Vec<f64> = (0..df.height())
            .map(|k| k as f64 / sampling_hz)
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(TIME_COLUMN.into(), times))?;
        Ok(out)
    }

    /// Set `T` to the recorded sample index divided by `sampling_hz`.
    pub fn normalize_annotation_time(
        df: &DataFrame,
        sampling_hz: f64,
    ) -> Result<DataFrame, ProcessorError> {
        Self::check_rate(sampling_hz)?;
        Self::require_columns(df, &[ANNOTATION_TIME_COLUMN])?;

        // Same division as the signal rows so equal sample indices get equal times
        let index = df.column(ANNOTATION_TIME_COLUMN)?.cast(&DataType::Float64)?;
        let times: Vec<Option<f64>> = index
            .f64()?
            .into_iter()
            .map(|k| k.map(|k| k / sampling_hz))
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(TIME_COLUMN.into(), times))?;
        Ok(out)
    }

    /// Build the unpacked signal frame: `T, TYPE, I, II, III, aVR, aVL, aVF, V1..V6`.
    pub fn build_signal_frame(
        raw: &DataFrame,
        sampling_hz: f64,
    ) -> Result<DataFrame, ProcessorError> {
        Self::require_columns(raw, &Self::recorded_columns())?;

        let timed = Self::normalize_signal_time(raw, sampling_hz)?;
        let derived = Self::derive_leads(&timed)?;

        let mut order = vec![col(TIME_COLUMN), col(TYPE_COLUMN)];
        order.extend(Lead::ALL.iter().map(|lead| col(lead.column_name())));

        let frame = derived
            .lazy()
            .with_column(lit(RecordType::Signal.code()).alias(TYPE_COLUMN))
            .select(order)
            .collect()?;
        Ok(frame)
    }

    /// Build the annotation frame: `T, TYPE, Annotation`.
    pub fn build_annotation_frame(
        raw: &DataFrame,
        sampling_hz: f64,
    ) -> Result<DataFrame, ProcessorError> {
        Self::require_columns(raw, &[ANNOTATION_TIME_COLUMN, ANNOTATION_CODE_COLUMN])?;

        let frame = Self::normalize_annotation_time(raw, sampling_hz)?
            .lazy()
            .with_column(lit(RecordType::Annotation.code()).alias(TYPE_COLUMN))
            .select([
                col(TIME_COLUMN),
                col(TYPE_COLUMN),
                col(ANNOTATION_CODE_COLUMN).cast(DataType::Int32),
            ])
            .collect()?;
        Ok(frame)
    }

    /// Column order of the merged timeline.
    pub fn merged_columns() -> Vec<&'static str> {
        let mut names = vec![TIME_COLUMN, TYPE_COLUMN];
        names.extend(Lead::column_names());
        names.push(ANNOTATION_CODE_COLUMN);
        names
    }

    /// Union of signal and annotation records ordered by `T`.
    ///
    /// Cells a record does not carry are null. Equal times keep signal rows
    /// ahead of annotation rows.
    pub fn merge_timeline(
        signal: &DataFrame,
        annotations: &DataFrame,
    ) -> Result<DataFrame, ProcessorError> {
        let order: Vec<Expr> = Self::merged_columns().into_iter().map(col).collect();

        let signal_part = signal
            .clone()
            .lazy()
            .with_column(lit(NULL).cast(DataType::Int32).alias(ANNOTATION_CODE_COLUMN))
            .select(order.clone())
            .collect()?;

        let lead_nulls: Vec<Expr> = Lead::ALL
            .iter()
            .map(|lead| lit(NULL).cast(DataType::Float64).alias(lead.column_name()))
            .collect();
        let annotation_part = annotations
            .clone()
            .lazy()
            .with_columns(lead_nulls)
            .select(order)
            .collect()?;

        let mut merged = signal_part;
        merged.vstack_mut(&annotation_part)?;

        let merged = merged
            .lazy()
            .sort(
                [TIME_COLUMN],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;
        Ok(merged)
    }

    /// Keep rows with `start <= T < end`.
    pub fn select_window(
        df: &DataFrame,
        start: f64,
        end: f64,
    ) -> Result<DataFrame, ProcessorError> {
        Self::require_columns(df, &[TIME_COLUMN])?;

        let windowed = df
            .clone()
            .lazy()
            .filter(
                col(TIME_COLUMN)
                    .gt_eq(lit(start))
                    .and(col(TIME_COLUMN).lt(lit(end))),
            )
            .collect()?;
        Ok(windowed)
    }

    /// Keep one row every `step`, starting with the first.
    pub fn downsample(df: &DataFrame, step: usize) -> Result<DataFrame, ProcessorError> {
        let step = step.max(1);
        if step == 1 {
            return Ok(df.clone());
        }

        let indices: Vec<IdxSize> = (0..df.height())
            .step_by(step)
            .map(|i| i as IdxSize)
            .collect();
        let idx = IdxCa::from_vec("idx".into(), indices);
        Ok(df.take(&idx)?)
    }

    /// Pair every non-null value of `column` with its elapsed time.
    pub fn time_series(df: &DataFrame, column: &str) -> Result<Vec<(f64, f64)>, ProcessorError> {
        Self::require_columns(df, &[TIME_COLUMN, column])?;

        let times = df.column(TIME_COLUMN)?.cast(&DataType::Float64)?;
        let values = df.column(column)?.cast(&DataType::Float64)?;

        let points = times
            .f64()?
            .into_iter()
            .zip(values.f64()?.into_iter())
            .filter_map(|(t, v)| match (t, v) {
                (Some(t), Some(v)) if !v.is_nan() => Some((t, v)),
                _ => None,
            })
            .collect();
        Ok(points)
    }

    /// Beat times and classes from an annotation frame.
    pub fn beat_events(df: &DataFrame) -> Result<Vec<(f64, BeatClass)>, ProcessorError> {
        Self::require_columns(df, &[TIME_COLUMN, ANNOTATION_CODE_COLUMN])?;

        let times = df.column(TIME_COLUMN)?.cast(&DataType::Float64)?;
        let codes = df.column(ANNOTATION_CODE_COLUMN)?.cast(&DataType::Int32)?;

        let events = times
            .f64()?
            .into_iter()
            .zip(codes.i32()?.into_iter())
            .filter_map(|(t, code)| Some((t?, BeatClass::from_code(code?))))
            .collect();
        Ok(events)
    }

    /// Number of annotation rows flagged anomalous.
    pub fn count_anomalous(df: &DataFrame) -> Result<usize, ProcessorError> {
        Ok(Self::beat_events(df)?
            .iter()
            .filter(|(_, class)| *class == BeatClass::Anomalous)
            .count())
    }

    fn recorded_columns() -> Vec<&'static str> {
        Lead::ALL
            .iter()
            .filter(|lead| !lead.is_derived())
            .map(|lead| lead.column_name())
            .collect()
    }

    fn require_columns(df: &DataFrame, names: &[&str]) -> Result<(), ProcessorError> {
        match names.iter().find(|name| df.column(name).is_err()) {
            Some(missing) => Err(ProcessorError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    fn check_rate(sampling_hz: f64) -> Result<(), ProcessorError> {
        if sampling_hz > 0.0 {
            Ok(())
        } else {
            Err(ProcessorError::InvalidSamplingRate(sampling_hz))
        }
    }
}
