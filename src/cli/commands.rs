use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use validator::Validate;

use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::coverage::WcsClient;
use crate::error::Result;
use crate::models::Point;
use crate::processors::{BatchDriver, DotSolPipeline, ProcessSolver, WaterRetention};
use crate::readers::PointReader;
use crate::utils::filename::generate_default_composite_filename;
use crate::utils::logging::init_logging;
use crate::utils::progress::ProgressReporter;
use crate::writers::BatchMerger;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Point {
            lon,
            lat,
            extension,
        } => {
            let point = Point::new(lon, lat);
            point.validate()?;

            let mut settings = load_settings(&cli.root, cli.config.as_deref())?;
            if let Some(extension) = extension {
                settings.output_extension = extension;
            }
            settings.ensure_dirs()?;

            println!("Building soil record for {}", point);
            println!("Coverage service: {}", settings.coverage_url);
            println!("Output directory: {}", settings.output_dir.display());

            let pipeline = DotSolPipeline::new(
                &settings,
                Arc::new(WcsClient::new(&settings)?),
                Arc::new(ProcessSolver::from_settings(&settings)),
            );

            let progress = ProgressReporter::new_spinner("Sampling soil coverages...", false);
            let report = pipeline.run(point).await;
            progress.finish_with_message(&format!("Point {} finished", report.key));

            println!("\n{}", report.summary());
            report.into_result()?;
        }

        Commands::Batch {
            input,
            output,
            max_workers,
            outputs_dir,
            report,
        } => {
            let mut settings = load_settings(&cli.root, cli.config.as_deref())?;
            if let Some(max_workers) = max_workers {
                settings.max_workers = max_workers;
            }
            settings.ensure_dirs()?;

            let output = output.unwrap_or_else(|| generate_default_composite_filename(&cli.root));

            println!("Reading points from {}", input.display());
            let table = PointReader::new().read_points(&input)?;
            for rejected in &table.rejected {
                println!("Skipping line {}: {}", rejected.line, rejected.reason);
            }
            println!(
                "Processing {} points with {} workers",
                table.points.len(),
                settings.max_workers
            );

            let mut driver = BatchDriver::new(
                &settings,
                Arc::new(WcsClient::new(&settings)?),
                Arc::new(ProcessSolver::from_settings(&settings)),
            );
            if let Some(dir) = outputs_dir {
                driver = driver.with_outputs_dir(dir);
            }

            let progress =
                ProgressReporter::new(table.points.len() as u64, "Building soil records...", false);
            let batch = driver.run(table.points, &output, Some(&progress)).await?;
            progress.finish_with_message(&format!("Processed {} points", batch.points.len()));

            println!("\n{}", batch.summary());

            if let Some(path) = report {
                std::fs::write(&path, serde_json::to_string_pretty(&batch)?)?;
                println!("Report written to {}", path.display());
            }

            println!("Created a static .SOL at: {}", output.display());
        }

        Commands::Merge {
            outputs_dir,
            output,
            extension,
        } => {
            println!("Merging records from {}", outputs_dir.display());

            let summary = BatchMerger::new()
                .with_extension(&extension)
                .merge(&outputs_dir, &output)?;

            println!("\n{}", summary.summary());
        }

        Commands::Hydraulics { clay, oc, sand } => {
            let retention = WaterRetention::from_texture(clay, oc, sand);

            println!("Soil water retention (clay {}%, OC {}%, sand {}%):", clay, oc, sand);
            println!("- Field capacity: {:.2}", retention.field_capacity);
            println!(
                "- Permanent wilting point: {:.2}",
                retention.permanent_wilting_point
            );
            println!("- Available water: {:.2}", retention.available_water());
        }
    }

    Ok(())
}

fn load_settings(root: &Path, config_file: Option<&Path>) -> Result<Settings> {
    let settings = Settings::load(root, config_file)?;
    debug!(?settings, "Settings loaded");
    Ok(settings)
}
