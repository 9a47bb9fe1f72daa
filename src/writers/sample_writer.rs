use crate::error::Result;
use crate::models::{SampleLayout, SampleRecord};
use csv::WriterBuilder;
use std::path::Path;

/// Writes sample records as the tab-separated file the solver reads
pub struct SampleWriter {
    layout: SampleLayout,
}

impl SampleWriter {
    pub fn new() -> Self {
        Self {
            layout: SampleLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: SampleLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn write_record(&self, record: &SampleRecord, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;

        writer.write_record(record.header(self.layout))?;
        for row in record.rows(self.layout) {
            writer.write_record(&row)?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl Default for SampleWriter {
    fn default() -> Self {
        Self::new()
    }
}
