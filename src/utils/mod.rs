pub mod constants;
pub mod filename;
pub mod geodesy;
pub mod geohash;
pub mod logging;
pub mod numeric;
pub mod progress;

pub use constants::*;
pub use filename::{generate_default_composite_filename, output_file_name, sample_file_name};
pub use geodesy::{bounding_box, BoundingBox};
pub use logging::init_logging;
pub use numeric::{format_float, round2};
pub use progress::ProgressReporter;
