use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DotSolError>;

#[derive(Error, Debug)]
pub enum DotSolError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("TIFF decoding error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Coverage service error: {0}")]
    Coverage(String),

    #[error("Input not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("Solver executable not found: {}", path.display())]
    SolverUnavailable { path: PathBuf },

    #[error("Solver produced no output in {}", dir.display())]
    SolverProducedNoOutput { dir: PathBuf },

    #[error("Solver did not finish within {secs}s")]
    SolverTimeout { secs: u64 },

    #[error("Pipeline for {key} failed during {stage}: {message}")]
    PipelineFailed {
        key: String,
        stage: String,
        message: String,
    },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}
