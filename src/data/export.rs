//! CSV Export Module
//! Writes the unpacked signal, annotation and merged frames to disk.

use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const UNPACKED_FILE: &str = "UnpackedData.csv";
pub const ANNOTATIONS_FILE: &str = "Annotations.csv";
pub const MERGED_FILE: &str = "MergedData.csv";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Polars(#[from] PolarsError),
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Paths of the three exported files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub unpacked: PathBuf,
    pub annotations: PathBuf,
    pub merged: PathBuf,
}

impl ExportPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            unpacked: dir.join(UNPACKED_FILE),
            annotations: dir.join(ANNOTATIONS_FILE),
            merged: dir.join(MERGED_FILE),
        }
    }
}

pub struct CsvExporter;

impl CsvExporter {
    /// Write one frame with a header row and a leading unnamed row index.
    /// Null cells are left empty.
    pub fn write_csv(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
        let mut indexed = df.with_row_index("".into(), None)?;

        let mut file = File::create(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut indexed)?;

        debug!("Wrote {} rows to {}", df.height(), path.display());
        Ok(())
    }

    /// Write the three exports into `dir`, creating it if needed.
    pub fn export_all(
        dir: &Path,
        signal: &DataFrame,
        annotations: &DataFrame,
        merged: &DataFrame,
    ) -> Result<ExportPaths, ExportError> {
        fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let paths = ExportPaths::in_dir(dir);
        Self::write_csv(signal, &paths.unpacked)?;
        Self::write_csv(annotations, &paths.annotations)?;
        Self::write_csv(merged, &paths.merged)?;
        Ok(paths)
    }
}
