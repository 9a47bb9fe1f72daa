use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dotsol-maker")]
#[command(about = "Builds DSSAT soil profile records for point locations from SoilGrids coverages")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file (TOML, YAML or JSON) layered over the defaults"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Base directory holding tmp/, dotsol_outputs/ and exec/"
    )]
    pub root: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the soil record for a single point
    Point {
        #[arg(long, allow_negative_numbers = true, help = "Longitude in decimal degrees")]
        lon: f64,

        #[arg(long, allow_negative_numbers = true, help = "Latitude in decimal degrees")]
        lat: f64,

        #[arg(short, long, help = "Extension of the placed record [default: SOL]")]
        extension: Option<String>,
    },

    /// Build records for every row of a lon/lat table and merge them into one file
    Batch {
        #[arg(short, long, help = "CSV file with lon and lat columns")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Composite output path [default: <root>/output/dotsol-{YYMMDD}.SOL]"
        )]
        output: Option<PathBuf>,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long, help = "Keep per-point records in this directory")]
        outputs_dir: Option<PathBuf>,

        #[arg(long, help = "Write a JSON report of every point to this path")]
        report: Option<PathBuf>,
    },

    /// Merge existing per-point records into one composite file
    Merge {
        #[arg(short = 'd', long, help = "Directory holding per-point records")]
        outputs_dir: PathBuf,

        #[arg(short, long, help = "Composite output path")]
        output: PathBuf,

        #[arg(short, long, default_value = "SOLD")]
        extension: String,
    },

    /// Field capacity and wilting point for a soil texture
    Hydraulics {
        #[arg(long, help = "Clay content (%)")]
        clay: f64,

        #[arg(long, help = "Organic carbon (%)")]
        oc: f64,

        #[arg(long, help = "Sand content (%)")]
        sand: f64,
    },
}
