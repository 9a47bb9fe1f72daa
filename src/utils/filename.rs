use crate::utils::constants::{SAMPLE_FILE_PREFIX, SOLVER_EXTENSION};
use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// Generate default composite filename under `root`: output/dotsol-{YYMMDD}.SOL
pub fn generate_default_composite_filename(root: &Path) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!(
        "dotsol-{:02}{:02}{:02}.{}",
        year, month, day, SOLVER_EXTENSION
    );
    root.join("output").join(filename)
}

/// Name of the tab-separated sample record for a location key
pub fn sample_file_name(key: &str) -> String {
    format!("{}{}.csv", SAMPLE_FILE_PREFIX, key)
}

/// Name of a per-point output record
pub fn output_file_name(key: &str, extension: &str) -> String {
    format!("{}.{}", key, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default_composite_filename() {
        let filename = generate_default_composite_filename(Path::new("."));
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("./output/"));

        let parts: Vec<&str> = filename_str.split('/').collect();
        assert_eq!(parts.len(), 3);

        let file_part = parts[2];
        assert!(file_part.starts_with("dotsol-"));
        assert!(file_part.ends_with(".SOL"));
        assert_eq!(file_part.len(), "dotsol-YYMMDD.SOL".len());
    }

    #[test]
    fn test_default_composite_follows_root() {
        let root = Path::new("/srv/soil");
        let filename = generate_default_composite_filename(root);

        assert_eq!(filename.parent(), Some(root.join("output").as_path()));
        assert!(filename.starts_with(root));
    }

    #[test]
    fn test_point_file_names() {
        assert_eq!(sample_file_name("edugesnyj6"), "sample_asc_edugesnyj6.csv");
        assert_eq!(output_file_name("edugesnyj6", "SOLD"), "edugesnyj6.SOLD");
    }
}
