use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::TempDir;
use tracing::{info, instrument, warn};

use crate::config::Settings;
use crate::coverage::CoverageSource;
use crate::error::{DotSolError, Result};
use crate::models::{LocationKey, Point};
use crate::processors::sampler::SoilPropertySampler;
use crate::processors::solver::{patch_header, place, Placement, SoilSolver};
use crate::utils::constants::TILES_DIR;
use crate::utils::filename::{output_file_name, sample_file_name};

/// Stage of a single-point run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Sampling,
    Solving,
    Patching,
    Placing,
    Cleanup,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Sampling => "sampling",
            PipelineState::Solving => "solving",
            PipelineState::Patching => "patching",
            PipelineState::Placing => "placing",
            PipelineState::Cleanup => "cleanup",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineFailure {
    /// Last stage entered before the error
    pub stage: PipelineState,
    pub message: String,
}

/// What happened to one point
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub longitude: f64,
    pub latitude: f64,
    pub key: LocationKey,
    /// Every stage entered, in order
    pub states: Vec<PipelineState>,
    pub output: Option<PathBuf>,
    pub placement: Option<Placement>,
    pub failure: Option<PipelineFailure>,
}

impl PipelineReport {
    fn new(point: Point, key: LocationKey) -> Self {
        Self {
            longitude: point.longitude,
            latitude: point.latitude,
            key,
            states: vec![PipelineState::Sampling],
            output: None,
            placement: None,
            failure: None,
        }
    }

    fn enter(&mut self, state: PipelineState) {
        self.states.push(state);
    }

    pub fn state(&self) -> PipelineState {
        self.states
            .last()
            .copied()
            .unwrap_or(PipelineState::Sampling)
    }

    pub fn succeeded(&self) -> bool {
        self.state() == PipelineState::Done
    }

    /// Turn a failed run into an error carrying its stage and message
    pub fn into_result(self) -> Result<Self> {
        match &self.failure {
            Some(failure) => Err(DotSolError::PipelineFailed {
                key: self.key.to_string(),
                stage: failure.stage.to_string(),
                message: failure.message.clone(),
            }),
            None => Ok(self),
        }
    }

    pub fn summary(&self) -> String {
        match (&self.failure, &self.output) {
            (Some(failure), _) => format!(
                "Point ({}, {}) [{}] failed: {}: {}",
                self.longitude, self.latitude, self.key, failure.stage, failure.message
            ),
            (None, Some(output)) if self.placement == Some(Placement::Skipped) => format!(
                "Point ({}, {}) [{}] already had a record at {}",
                self.longitude,
                self.latitude,
                self.key,
                output.display()
            ),
            (None, Some(output)) => format!(
                "Created a soil record for ({}, {}) with geohashed value {} at {}",
                self.longitude,
                self.latitude,
                self.key,
                output.display()
            ),
            (None, None) => format!(
                "Point ({}, {}) [{}] is {}",
                self.longitude,
                self.latitude,
                self.key,
                self.state()
            ),
        }
    }
}

/// Runs one point through sampling, solving, header patching, placement and
/// cleanup inside its own working directory
pub struct DotSolPipeline {
    sampler: SoilPropertySampler,
    solver: Arc<dyn SoilSolver>,
    work_dir: PathBuf,
    output_dir: PathBuf,
    output_extension: String,
    geohash_precision: usize,
}

impl DotSolPipeline {
    pub fn new(
        settings: &Settings,
        source: Arc<dyn CoverageSource>,
        solver: Arc<dyn SoilSolver>,
    ) -> Self {
        Self {
            sampler: SoilPropertySampler::new(source, settings),
            solver,
            work_dir: settings.work_dir.clone(),
            output_dir: settings.output_dir.clone(),
            output_extension: settings.output_extension.clone(),
            geohash_precision: settings.geohash_precision,
        }
    }

    /// Place records in `dir` with `extension` instead of the configured output
    pub fn with_output(mut self, dir: &Path, extension: &str) -> Self {
        self.output_dir = dir.to_path_buf();
        self.output_extension = extension.to_string();
        self
    }

    pub fn output_path(&self, key: &LocationKey) -> PathBuf {
        self.output_dir
            .join(output_file_name(key.as_str(), &self.output_extension))
    }

    /// Run every stage for `point`.
    ///
    /// Never returns early: failures are recorded in the report and the
    /// working directory is removed whatever the outcome.
    #[instrument(skip(self), fields(point = %point))]
    pub async fn run(&self, point: Point) -> PipelineReport {
        let key = LocationKey::encode_with_precision(&point, self.geohash_precision);
        let mut report = PipelineReport::new(point, key.clone());

        let (arena, result) = match self.open_arena(&key) {
            Ok(arena) => {
                let result = self.advance(&point, &key, arena.path(), &mut report).await;
                (Some(arena), result)
            }
            Err(e) => (None, Err(e)),
        };

        let last_stage = report.state();
        report.enter(PipelineState::Cleanup);
        if let Some(arena) = arena {
            self.cleanup(arena, &key);
        }

        match result {
            Ok(()) => {
                report.enter(PipelineState::Done);
                info!("{}", report.summary());
            }
            Err(e) => {
                warn!(stage = %last_stage, error = %e, "Point failed");
                report.failure = Some(PipelineFailure {
                    stage: last_stage,
                    message: e.to_string(),
                });
                report.enter(PipelineState::Failed);
            }
        }

        report
    }

    fn open_arena(&self, key: &LocationKey) -> Result<TempDir> {
        fs::create_dir_all(&self.work_dir)?;
        let arena = tempfile::Builder::new()
            .prefix(&format!("{}-", key))
            .tempdir_in(&self.work_dir)?;
        Ok(arena)
    }

    async fn advance(
        &self,
        point: &Point,
        key: &LocationKey,
        arena: &Path,
        report: &mut PipelineReport,
    ) -> Result<()> {
        let arena = arena.canonicalize()?;

        let record = self.sampler.sample(point, key, &arena).await?;
        let sample = self.sampler.persist(&record, &arena)?;

        report.enter(PipelineState::Solving);
        let produced = self.solver.invoke(&sample, &arena).await?;

        report.enter(PipelineState::Patching);
        patch_header(&produced, key)?;

        report.enter(PipelineState::Placing);
        let destination = self.output_path(key);
        let placement = place(&produced, &destination)?;

        report.output = Some(destination);
        report.placement = Some(placement);

        Ok(())
    }

    fn cleanup(&self, arena: TempDir, key: &LocationKey) {
        let tiles = arena.path().join(TILES_DIR);
        if tiles.exists() {
            if let Err(e) = fs::remove_dir_all(&tiles) {
                warn!(path = %tiles.display(), error = %e, "Could not remove tiles");
            }
        }

        let sample = arena.path().join(sample_file_name(key.as_str()));
        if sample.exists() {
            if let Err(e) = fs::remove_file(&sample) {
                warn!(path = %sample.display(), error = %e, "Could not remove sample");
            }
        }

        let path = arena.path().to_path_buf();
        if let Err(e) = arena.close() {
            warn!(path = %path.display(), error = %e, "Could not remove working directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CoverageResponse;
    use crate::models::{DepthInterval, SoilLayer};
    use crate::utils::geodesy::BoundingBox;
    use pretty_assertions::assert_eq;

    struct EmptyCatalog;

    #[async_trait::async_trait]
    impl CoverageSource for EmptyCatalog {
        async fn fetch(
            &self,
            _layer: SoilLayer,
            _depth: DepthInterval,
            _bbox: &BoundingBox,
        ) -> Result<CoverageResponse> {
            Ok(CoverageResponse::NotFound)
        }
    }

    /// Writes a fixed record next to the sample
    struct EchoSolver;

    #[async_trait::async_trait]
    impl SoilSolver for EchoSolver {
        async fn invoke(&self, sample: &Path, workdir: &Path) -> Result<PathBuf> {
            assert!(sample.starts_with(workdir));
            let record = workdir.join("TH_00001.SOL");
            fs::write(&record, "*TH00000001  SoilGrids  SCL   200\n@SITE\n")?;
            Ok(record)
        }
    }

    struct BrokenSolver;

    #[async_trait::async_trait]
    impl SoilSolver for BrokenSolver {
        async fn invoke(&self, _sample: &Path, workdir: &Path) -> Result<PathBuf> {
            Err(DotSolError::SolverProducedNoOutput {
                dir: workdir.to_path_buf(),
            })
        }
    }

    fn pipeline(root: &Path, solver: Arc<dyn SoilSolver>) -> DotSolPipeline {
        DotSolPipeline::new(&Settings::rooted_at(root), Arc::new(EmptyCatalog), solver)
    }

    fn work_dir_is_empty(root: &Path) -> Result<bool> {
        Ok(fs::read_dir(root.join("tmp"))?.next().is_none())
    }

    #[tokio::test]
    async fn test_run_places_patched_record() -> Result<()> {
        let root = tempfile::TempDir::new()?;
        let pipeline = pipeline(root.path(), Arc::new(EchoSolver));

        let report = pipeline.run(Point::new(-15.657, 16.107)).await;

        assert!(report.succeeded(), "{}", report.summary());
        assert_eq!(
            report.states,
            vec![
                PipelineState::Sampling,
                PipelineState::Solving,
                PipelineState::Patching,
                PipelineState::Placing,
                PipelineState::Cleanup,
                PipelineState::Done,
            ]
        );

        let output = root.path().join("dotsol_outputs").join("edugesnyj6.SOL");
        assert_eq!(report.output.as_deref(), Some(output.as_path()));
        assert_eq!(report.placement, Some(Placement::Moved));
        assert!(fs::read_to_string(&output)?.starts_with("*edugesnyj6 SoilGrids"));
        assert!(work_dir_is_empty(root.path())?);

        Ok(())
    }

    #[tokio::test]
    async fn test_second_run_leaves_existing_record() -> Result<()> {
        let root = tempfile::TempDir::new()?;
        let pipeline = pipeline(root.path(), Arc::new(EchoSolver));
        let output = root.path().join("dotsol_outputs").join("edugesnyj6.SOL");
        fs::create_dir_all(output.parent().unwrap())?;
        fs::write(&output, "existing")?;

        let report = pipeline.run(Point::new(-15.657, 16.107)).await;

        assert!(report.succeeded());
        assert_eq!(report.placement, Some(Placement::Skipped));
        assert_eq!(fs::read_to_string(&output)?, "existing");
        Ok(())
    }

    #[tokio::test]
    async fn test_solver_failure_still_cleans_up() -> Result<()> {
        let root = tempfile::TempDir::new()?;
        let pipeline = pipeline(root.path(), Arc::new(BrokenSolver));

        let report = pipeline.run(Point::new(-15.657, 16.107)).await;

        assert_eq!(report.state(), PipelineState::Failed);
        let failure = report.failure.clone().unwrap();
        assert_eq!(failure.stage, PipelineState::Solving);
        assert!(report.states.contains(&PipelineState::Cleanup));
        assert!(report.output.is_none());
        assert!(work_dir_is_empty(root.path())?);
        assert!(matches!(
            report.into_result(),
            Err(DotSolError::PipelineFailed { .. })
        ));

        Ok(())
    }

    /// Loses the sample before handing it to a real solver process
    #[cfg(unix)]
    struct SampleLosingSolver {
        inner: crate::processors::solver::ProcessSolver,
    }

    #[cfg(unix)]
    #[async_trait::async_trait]
    impl SoilSolver for SampleLosingSolver {
        async fn invoke(&self, sample: &Path, workdir: &Path) -> Result<PathBuf> {
            fs::remove_file(sample)?;
            self.inner.invoke(sample, workdir).await
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_sample_fails_at_solving() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::TempDir::new()?;
        let exec_dir = tempfile::TempDir::new()?;
        let script = exec_dir.path().join("solver.sh");
        fs::write(&script, "#!/bin/sh\necho \"*TH_00001\" > out.SOL\n")?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

        let solver = SampleLosingSolver {
            inner: crate::processors::solver::ProcessSolver::new(script),
        };
        let report = pipeline(root.path(), Arc::new(solver))
            .run(Point::new(-15.657, 16.107))
            .await;

        assert_eq!(report.state(), PipelineState::Failed);
        let failure = report.failure.clone().unwrap();
        assert_eq!(failure.stage, PipelineState::Solving);
        assert!(failure.message.starts_with("Input not found"));
        assert!(report.states.contains(&PipelineState::Cleanup));
        assert!(report.output.is_none());
        assert!(work_dir_is_empty(root.path())?);

        Ok(())
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Cleanup.is_terminal());
    }
}
