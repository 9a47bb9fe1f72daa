pub mod composite_writer;
pub mod sample_writer;

pub use composite_writer::{BatchMerger, MergeSummary};
pub use sample_writer::SampleWriter;
