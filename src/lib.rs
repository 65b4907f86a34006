//! ECG Plot - 12-lead ECG unpacking, annotation merge & static chart export
//!
//! Reads raw ECG sample files and beat annotations, derives the missing limb
//! and augmented leads, exports the unpacked streams and renders a time window.

pub mod app;
pub mod charts;
pub mod config;
pub mod data;
pub mod stats;

pub use app::{AppError, EcgApp, RunOptions, RunReport};
pub use config::AppConfig;
