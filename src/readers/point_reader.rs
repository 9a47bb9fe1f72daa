use crate::error::{DotSolError, Result};
use crate::models::Point;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;
use validator::Validate;

#[derive(Debug, Deserialize)]
struct PointRow {
    lon: f64,
    lat: f64,
}

/// A row that could not be turned into a point
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// 1-based line in the input, header included
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct PointTable {
    pub points: Vec<Point>,
    pub rejected: Vec<RejectedRow>,
}

/// Reads batch inputs: a comma-separated table with `lon` and `lat` columns
pub struct PointReader {
    delimiter: u8,
}

impl PointReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Read every row; unparseable or out-of-range rows are collected as rejected
    pub fn read_points(&self, path: &Path) -> Result<PointTable> {
        if !path.is_file() {
            return Err(DotSolError::MissingInput {
                path: path.to_path_buf(),
            });
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .flexible(true)
            .from_path(path)?;

        let mut table = PointTable::default();

        for (index, row) in reader.deserialize::<PointRow>().enumerate() {
            // Header is line 1
            let line = index as u64 + 2;

            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(line, error = %e, "Skipping unreadable row");
                    table.rejected.push(RejectedRow {
                        line,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let point = Point::new(row.lon, row.lat);
            if let Err(e) = point.validate() {
                warn!(line, %point, "Skipping out-of-range coordinate");
                table.rejected.push(RejectedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }

            table.points.push(point);
        }

        Ok(table)
    }
}

impl Default for PointReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_points() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "lon,lat,name")?;
        writeln!(file, "-15.657, 16.107, Thies")?;
        writeln!(file, "10.0,50.0,Bayreuth")?;

        let table = PointReader::new().read_points(file.path())?;

        assert_eq!(
            table.points,
            vec![Point::new(-15.657, 16.107), Point::new(10.0, 50.0)]
        );
        assert!(table.rejected.is_empty());
        Ok(())
    }

    #[test]
    fn test_column_order_does_not_matter() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "lat,lon")?;
        writeln!(file, "16.107,-15.657")?;

        let table = PointReader::new().read_points(file.path())?;
        assert_eq!(table.points, vec![Point::new(-15.657, 16.107)]);
        Ok(())
    }

    #[test]
    fn test_invalid_rows_are_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "lon,lat")?;
        writeln!(file, "abc,16.0")?;
        writeln!(file, "200.0,16.0")?;
        writeln!(file, "1.0,2.0")?;

        let table = PointReader::new().read_points(file.path())?;

        assert_eq!(table.points, vec![Point::new(1.0, 2.0)]);
        assert_eq!(table.rejected.len(), 2);
        assert_eq!(table.rejected[0].line, 2);
        assert_eq!(table.rejected[1].line, 3);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let result = PointReader::new().read_points(Path::new("/nonexistent/points.csv"));
        assert!(matches!(result, Err(DotSolError::MissingInput { .. })));
    }
}
