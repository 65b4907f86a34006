//! Data module - CSV loading, processing and export

mod export;
mod lead;
mod loader;
mod processor;

pub use export::{CsvExporter, ExportError, ExportPaths};
pub use lead::{BeatClass, Lead};
pub use loader::{DataLoader, LoaderError, SIGNAL_COLUMNS};
pub use processor::{
    DataProcessor, LeadSample, ProcessorError, RecordType, TIME_COLUMN, TYPE_COLUMN,
};
