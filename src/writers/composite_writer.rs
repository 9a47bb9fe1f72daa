use crate::error::{DotSolError, Result};
use crate::utils::constants::STAGED_EXTENSION;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Concatenates per-point records into one composite file
pub struct BatchMerger {
    extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub destination: PathBuf,
    pub records: usize,
    pub bytes_written: u64,
}

impl MergeSummary {
    pub fn summary(&self) -> String {
        format!(
            "Composite File Summary:\n\
            - Path: {}\n\
            - Records: {}\n\
            - Size: {:.2} KB",
            self.destination.display(),
            self.records,
            self.bytes_written as f64 / 1024.0
        )
    }
}

impl BatchMerger {
    pub fn new() -> Self {
        Self {
            extension: STAGED_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    /// Records in `outputs_dir` carrying the merger's extension, sorted by file name
    pub fn list_records(&self, outputs_dir: &Path) -> Result<Vec<PathBuf>> {
        if !outputs_dir.is_dir() {
            return Err(DotSolError::MissingInput {
                path: outputs_dir.to_path_buf(),
            });
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(outputs_dir)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .map_or(false, |ext| ext == self.extension.as_str());
            if path.is_file() && matches {
                records.push(path);
            }
        }
        records.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(records)
    }

    /// Write every record's bytes, each followed by a newline, into `destination`.
    ///
    /// Order is by file name, which for keyed records is location-key order.
    pub fn merge(&self, outputs_dir: &Path, destination: &Path) -> Result<MergeSummary> {
        let records = self.list_records(outputs_dir)?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(destination)?);
        let mut bytes_written = 0u64;

        for path in &records {
            let content = fs::read(path)?;
            writer.write_all(&content)?;
            writer.write_all(b"\n")?;
            bytes_written += content.len() as u64 + 1;
            debug!(record = %path.display(), "Merged record");
        }
        writer.flush()?;

        info!(
            records = records.len(),
            destination = %destination.display(),
            "Composite written"
        );

        Ok(MergeSummary {
            destination: destination.to_path_buf(),
            records: records.len(),
            bytes_written,
        })
    }
}

impl Default for BatchMerger {
    fn default() -> Self {
        Self::new()
    }
}
