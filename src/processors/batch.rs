use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Settings;
use crate::coverage::CoverageSource;
use crate::error::Result;
use crate::models::Point;
use crate::processors::pipeline::{DotSolPipeline, PipelineReport};
use crate::processors::solver::SoilSolver;
use crate::utils::constants::STAGED_EXTENSION;
use crate::utils::progress::ProgressReporter;
use crate::writers::{BatchMerger, MergeSummary};

/// Runs many points concurrently and merges their records into one file
pub struct BatchDriver {
    settings: Settings,
    source: Arc<dyn CoverageSource>,
    solver: Arc<dyn SoilSolver>,
    max_workers: usize,
    outputs_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// One report per input point, in input order
    pub points: Vec<PipelineReport>,
    pub merge: MergeSummary,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.points.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.points.len() - self.succeeded()
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Batch Summary:\n\
            - Points: {}\n\
            - Succeeded: {}\n\
            - Failed: {}",
            self.points.len(),
            self.succeeded(),
            self.failed()
        )];
        for report in self.points.iter().filter(|r| !r.succeeded()) {
            lines.push(format!("  {}", report.summary()));
        }
        lines.push(self.merge.summary());
        lines.join("\n")
    }
}

impl BatchDriver {
    pub fn new(
        settings: &Settings,
        source: Arc<dyn CoverageSource>,
        solver: Arc<dyn SoilSolver>,
    ) -> Self {
        Self {
            settings: settings.clone(),
            source,
            solver,
            max_workers: settings.max_workers.max(1),
            outputs_dir: None,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Keep per-point records in `dir` instead of a temporary staging directory
    pub fn with_outputs_dir(mut self, dir: PathBuf) -> Self {
        self.outputs_dir = Some(dir);
        self
    }

    /// Process every point, then merge whatever records were produced into
    /// `destination`. A failing point never stops the others.
    pub async fn run(
        &self,
        points: Vec<Point>,
        destination: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<BatchReport> {
        std::fs::create_dir_all(&self.settings.work_dir)?;

        // Staging lives under the work dir unless the caller keeps the records
        let (staging, outputs_dir) = match &self.outputs_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                (None, dir.clone())
            }
            None => {
                let staging = tempfile::Builder::new()
                    .prefix("staged-")
                    .tempdir_in(&self.settings.work_dir)?;
                let path = staging.path().to_path_buf();
                (Some(staging), path)
            }
        };

        let pipeline = Arc::new(
            DotSolPipeline::new(&self.settings, self.source.clone(), self.solver.clone())
                .with_output(&outputs_dir, STAGED_EXTENSION),
        );

        info!(
            points = points.len(),
            max_workers = self.max_workers,
            "Starting batch"
        );

        let total = points.len();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set = JoinSet::new();

        for (index, point) in points.into_iter().enumerate() {
            let pipeline = pipeline.clone();
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, pipeline.run(point).await)
            });
        }

        let mut reports = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, report)) => {
                    if let Some(progress) = progress {
                        progress.increment(1);
                        progress.set_message(&format!("Processed {}", report.key));
                    }
                    reports.push((index, report));
                }
                Err(e) => warn!(error = %e, "Point task did not complete"),
            }
        }
        reports.sort_by_key(|(index, _)| *index);

        let merge = BatchMerger::new()
            .with_extension(STAGED_EXTENSION)
            .merge(&outputs_dir, destination)?;

        if let Some(staging) = staging {
            staging.close()?;
        }

        Ok(BatchReport {
            points: reports.into_iter().map(|(_, report)| report).collect(),
            merge,
        })
    }
}
