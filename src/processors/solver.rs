use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::error::{DotSolError, Result};
use crate::models::LocationKey;
use crate::utils::constants::{DEFAULT_SOLVER_TIMEOUT_SECS, HEADER_CODE_WIDTH, SOLVER_EXTENSION};

/// Turns a sample file into a soil record (allows mocking in tests)
#[async_trait::async_trait]
pub trait SoilSolver: Send + Sync {
    /// Run against `sample` inside `workdir` and return the record it wrote there
    async fn invoke(&self, sample: &Path, workdir: &Path) -> Result<PathBuf>;
}

/// Runs the solver executable as a child process
#[derive(Debug, Clone)]
pub struct ProcessSolver {
    executable: PathBuf,
    extension: String,
    timeout: Duration,
}

impl ProcessSolver {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            extension: SOLVER_EXTENSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_SOLVER_TIMEOUT_SECS),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.solver_path)
            .with_extension(&settings.solver_extension)
            .with_timeout(Duration::from_secs(settings.solver_timeout_secs))
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl SoilSolver for ProcessSolver {
    #[instrument(skip_all, fields(sample = %sample.display()))]
    async fn invoke(&self, sample: &Path, workdir: &Path) -> Result<PathBuf> {
        if !self.executable.is_file() {
            return Err(DotSolError::SolverUnavailable {
                path: self.executable.clone(),
            });
        }
        if !sample.is_file() {
            return Err(DotSolError::MissingInput {
                path: sample.to_path_buf(),
            });
        }

        // The child runs inside `workdir`, so relative paths would resolve there
        let executable = self.executable.canonicalize()?;
        let sample = sample.canonicalize()?;

        let mut child = Command::new(&executable)
            .arg(&sample)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let status = match timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Could not stop solver after timeout");
                }
                return Err(DotSolError::SolverTimeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !status.success() {
            warn!(%status, "Solver exited with a failure status");
        }

        find_record(workdir, &self.extension)
    }
}

/// First file in `dir` (by name) with the given extension
pub fn find_record(dir: &Path, extension: &str) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext == extension)
        })
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| DotSolError::SolverProducedNoOutput {
            dir: dir.to_path_buf(),
        })
}

/// Replace the record code at the start of the header line with `*{key}`.
///
/// The first 12 bytes of the first line are replaced (the whole line when it
/// is shorter); the line terminator and every following byte are kept.
pub fn patch_header(path: &Path, key: &LocationKey) -> Result<()> {
    let content = fs::read(path)?;

    let line_end = content
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(content.len());
    let text_end = if line_end > 0 && content[line_end - 1] == b'\r' {
        line_end - 1
    } else {
        line_end
    };
    let replaced = text_end.min(HEADER_CODE_WIDTH);

    let code = key.record_code();
    let mut patched = Vec::with_capacity(content.len() + code.len());
    patched.extend_from_slice(code.as_bytes());
    patched.extend_from_slice(&content[replaced..]);

    fs::write(path, patched)?;
    debug!(path = %path.display(), %code, "Header patched");

    Ok(())
}

/// Result of moving a record to its final location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Moved,
    /// A record already existed at the destination and was left untouched
    Skipped,
}

/// Move `source` to `destination` unless the destination already exists.
///
/// Falls back to copy and delete when a rename is not possible, e.g. across
/// filesystems.
pub fn place(source: &Path, destination: &Path) -> Result<Placement> {
    if destination.exists() {
        info!(
            destination = %destination.display(),
            "Record already exists, leaving it in place"
        );
        return Ok(Placement::Skipped);
    }

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    if let Err(e) = fs::rename(source, destination) {
        debug!(error = %e, "Rename failed, copying instead");
        fs::copy(source, destination)?;
        fs::remove_file(source)?;
    }

    Ok(Placement::Moved)
}
