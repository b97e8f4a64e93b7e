use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Base directory is not readable: {}", .0.display())]
    BaseDir(PathBuf),

    #[error("Workbook read failed: {0}")]
    Read(#[from] calamine::Error),

    #[error("Workbook write failed: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sheet '{sheet}': {message}")]
    Sheet { sheet: String, message: String },

    #[error("Unexpected layout: {0}")]
    Layout(String),
}

impl PipelineError {
    pub fn sheet(sheet: &str, message: impl Into<String>) -> Self {
        PipelineError::Sheet {
            sheet: sheet.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
