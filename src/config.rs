use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::models::SampleLayout;
use crate::utils::constants::*;

/// Paths and service endpoints for a run.
///
/// Layered as defaults rooted at a base directory, then an optional
/// configuration file, then `DOTSOL_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// Parent directory of the per-point working directories
    pub work_dir: PathBuf,

    /// Destination of single-point records
    pub output_dir: PathBuf,

    /// Map server prefix; the layer's map file name is appended to it
    #[validate(length(min = 1))]
    pub coverage_url: String,

    pub solver_path: PathBuf,

    /// Extension of the record the solver writes
    #[validate(length(min = 1))]
    pub solver_extension: String,

    /// Extension given to placed single-point records
    #[validate(length(min = 1))]
    pub output_extension: String,

    #[validate(range(min = 1.0))]
    pub bbox_radius_m: f64,

    #[validate(range(min = 1))]
    pub tile_size: u32,

    pub crs: String,

    pub coverage_format: String,

    #[validate(range(min = 1))]
    pub fetch_timeout_secs: u64,

    #[validate(range(min = 1))]
    pub solver_timeout_secs: u64,

    #[validate(range(min = 1))]
    pub fetch_concurrency: usize,

    #[validate(range(min = 1))]
    pub max_workers: usize,

    #[validate(range(min = 1, max = 22))]
    pub geohash_precision: usize,

    pub sample_layout: SampleLayout,
}

impl Settings {
    /// Defaults laid out under `root`: `tmp/`, `dotsol_outputs/` and
    /// `exec/dotSolAPI2.exe`.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            work_dir: root.join("tmp"),
            output_dir: root.join("dotsol_outputs"),
            coverage_url: DEFAULT_COVERAGE_URL.to_string(),
            solver_path: root.join("exec").join("dotSolAPI2.exe"),
            solver_extension: SOLVER_EXTENSION.to_string(),
            output_extension: SOLVER_EXTENSION.to_string(),
            bbox_radius_m: DEFAULT_BBOX_RADIUS_M,
            tile_size: DEFAULT_TILE_SIZE,
            crs: DEFAULT_CRS.to_string(),
            coverage_format: DEFAULT_COVERAGE_FORMAT.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            solver_timeout_secs: DEFAULT_SOLVER_TIMEOUT_SECS,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            max_workers: num_cpus::get(),
            geohash_precision: DEFAULT_GEOHASH_PRECISION,
            sample_layout: SampleLayout::default(),
        }
    }

    /// Layer an optional file and `DOTSOL_*` environment variables over the
    /// defaults for `root`, then validate the result.
    pub fn load(root: &Path, config_file: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&Self::rooted_at(root))?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("DOTSOL"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Create the directories the pipeline writes into
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_rooted() {
        let settings = Settings::rooted_at(Path::new("/data/run"));

        assert_eq!(settings.work_dir, PathBuf::from("/data/run/tmp"));
        assert_eq!(settings.output_dir, PathBuf::from("/data/run/dotsol_outputs"));
        assert_eq!(
            settings.solver_path,
            PathBuf::from("/data/run/exec/dotSolAPI2.exe")
        );
        assert_eq!(settings.tile_size, 8);
        assert_eq!(settings.bbox_radius_m, 1000.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_merges_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("dotsol.toml");
        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "coverage_url = \"http://localhost:8080/mapserv?map=/map/\"")?;
        writeln!(file, "bbox_radius_m = 250.0")?;
        writeln!(file, "sample_layout = \"profile\"")?;

        let settings = Settings::load(dir.path(), Some(&config_path))?;

        assert_eq!(settings.coverage_url, "http://localhost:8080/mapserv?map=/map/");
        assert_eq!(settings.bbox_radius_m, 250.0);
        assert_eq!(settings.sample_layout, SampleLayout::Profile);
        assert_eq!(settings.work_dir, dir.path().join("tmp"));

        Ok(())
    }

    #[test]
    fn test_load_rejects_invalid_values() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("dotsol.toml");
        std::fs::write(&config_path, "tile_size = 0\n")?;

        assert!(Settings::load(dir.path(), Some(&config_path)).is_err());
        Ok(())
    }
}
