use mzrecal::RecalError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Recalibration error: {0}")]
    Recal(#[from] RecalError),

    #[error("Progress bar template error: {0}")]
    ProgressTemplate(#[from] indicatif::style::TemplateError),

    #[error("Failed to read spectrum from {path}: {source}")]
    SpectrumReading {
        path: PathBuf,
        source: serde_json::Error,
    },
}
