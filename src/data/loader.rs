//! CSV Data Loader Module
//! Reads raw ECG sample files and beat annotation files using Polars.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Fixed layout of the raw sample files (no header row).
pub const SIGNAL_COLUMNS: [&str; 9] = ["T", "I", "II", "V1", "V2", "V3", "V4", "V5", "V6"];

/// Column holding the recorded sample index of an annotated beat.
pub const ANNOTATION_TIME_COLUMN: &str = "Time";
/// Column holding the annotation code.
pub const ANNOTATION_CODE_COLUMN: &str = "Annotation";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Column '{column}' missing from {path}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("No data loaded")]
    NoData,
}

/// Loads and concatenates signal and annotation files.
pub struct DataLoader {
    signal: Option<DataFrame>,
    annotations: Option<DataFrame>,
    signal_files: Vec<PathBuf>,
    annotation_files: Vec<PathBuf>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            signal: None,
            annotations: None,
            signal_files: Vec::new(),
            annotation_files: Vec::new(),
        }
    }

    /// Schema of the raw sample files. The recorded time column is kept as text
    /// since it is never trusted and gets rebuilt from the row index.
    pub fn signal_schema() -> Schema {
        let mut schema = Schema::with_capacity(SIGNAL_COLUMNS.len());
        for name in SIGNAL_COLUMNS {
            let dtype = if name == "T" {
                DataType::String
            } else {
                DataType::Float64
            };
            schema.with_column(name.into(), dtype);
        }
        schema
    }

    /// Read one headerless raw sample file.
    pub fn read_signal_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(false)
            .with_schema(Some(Arc::new(Self::signal_schema())))
            .finish()?
            .collect()?;

        debug!("Read {} lines from file {}", df.height(), path.display());
        Ok(df)
    }

    /// Read one annotation file, keeping only the beat index and code.
    pub fn read_annotation_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()?
            .collect()?;

        for required in [ANNOTATION_TIME_COLUMN, ANNOTATION_CODE_COLUMN] {
            if df.column(required).is_err() {
                return Err(LoaderError::MissingColumn {
                    column: required.to_string(),
                    path: path.to_path_buf(),
                });
            }
        }

        let df = df
            .lazy()
            .select([
                col(ANNOTATION_TIME_COLUMN).cast(DataType::Float64),
                col(ANNOTATION_CODE_COLUMN).cast(DataType::Int32),
            ])
            .collect()?;

        debug!("Read {} lines from file {}", df.height(), path.display());
        Ok(df)
    }

    /// Load and append raw sample files in the given order.
    ///
    /// Rows are stacked so the row position runs across all files, which is
    /// what the timeline is rebuilt from.
    pub fn load_signal_files<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
    ) -> Result<&DataFrame, LoaderError> {
        self.signal_files = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        self.signal = Some(Self::stack_files(paths, Self::read_signal_csv)?);
        self.signal.as_ref().ok_or(LoaderError::NoData)
    }

    /// Load and append annotation files in the given order.
    pub fn load_annotation_files<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
    ) -> Result<&DataFrame, LoaderError> {
        self.annotation_files = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        self.annotations = Some(Self::stack_files(paths, Self::read_annotation_csv)?);
        self.annotations.as_ref().ok_or(LoaderError::NoData)
    }

    fn stack_files<P, F>(paths: &[P], read: F) -> Result<DataFrame, LoaderError>
    where
        P: AsRef<Path>,
        F: Fn(&Path) -> Result<DataFrame, LoaderError>,
    {
        let mut stacked: Option<DataFrame> = None;
        for path in paths {
            let df = read(path.as_ref())?;
            match stacked.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&df)?;
                }
                None => stacked = Some(df),
            }
        }
        stacked.ok_or(LoaderError::NoData)
    }

    /// Get the number of raw sample rows loaded.
    pub fn get_signal_row_count(&self) -> usize {
        self.signal.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    /// Get the number of annotation rows loaded.
    pub fn get_annotation_row_count(&self) -> usize {
        self.annotations.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    pub fn get_signal(&self) -> Option<&DataFrame> {
        self.signal.as_ref()
    }

    pub fn get_annotations(&self) -> Option<&DataFrame> {
        self.annotations.as_ref()
    }

    pub fn get_signal_files(&self) -> &[PathBuf] {
        &self.signal_files
    }

    pub fn get_annotation_files(&self) -> &[PathBuf] {
        &self.annotation_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reads_headerless_signal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "hour1.csv",
            "00:00:00.000,0.1,0.3,1,2,3,4,5,6\n00:00:00.001,0.2,0.5,1,2,3,4,5,6\n",
        );

        let df = DataLoader::read_signal_csv(&path).unwrap();
        assert_eq!(df.height(), 2);
        let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, SIGNAL_COLUMNS);
        let lead_ii = df.column("II").unwrap().f64().unwrap();
        assert_eq!(lead_ii.get(1), Some(0.5));
    }

    #[test]
    fn stacks_multiple_signal_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "x,1,1,1,1,1,1,1,1\nx,2,2,2,2,2,2,2,2\n");
        let b = write(dir.path(), "b.csv", "y,3,3,3,3,3,3,3,3\n");

        let mut loader = DataLoader::new();
        let df = loader.load_signal_files(&[a, b]).unwrap();
        assert_eq!(df.height(), 3);
        let lead_i = df.column("I").unwrap().f64().unwrap();
        assert_eq!(lead_i.get(2), Some(3.0));
        assert_eq!(loader.get_signal_row_count(), 3);
        assert_eq!(loader.get_signal_files().len(), 2);
    }

    #[test]
    fn annotation_extra_columns_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "qt.csv",
            "Time,Annotation,QT,RR\n1024,0,400,800\n2048,1,410,790\n",
        );

        let df = DataLoader::read_annotation_csv(&path).unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["Time", "Annotation"]);
        assert_eq!(df.column("Annotation").unwrap().dtype(), &DataType::Int32);
        let time = df.column("Time").unwrap().f64().unwrap();
        assert_eq!(time.get(1), Some(2048.0));
    }

    #[test]
    fn annotation_without_code_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "qt.csv", "Time,QT\n1024,400\n");

        let err = DataLoader::read_annotation_csv(&path).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn { ref column, .. } if column == "Annotation"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = DataLoader::read_signal_csv(Path::new("/nonexistent/hour1.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn empty_file_list_has_no_data() {
        let mut loader = DataLoader::new();
        let paths: [PathBuf; 0] = [];
        assert!(matches!(
            loader.load_annotation_files(&paths),
            Err(LoaderError::NoData)
        ));
    }
}
