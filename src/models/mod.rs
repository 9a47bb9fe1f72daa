pub mod point;
pub mod sample;
pub mod soil;

pub use point::{LocationKey, Point};
pub use sample::{SampleLayout, SampleRecord, SampleRecordBuilder};
pub use soil::{DepthInterval, RasterValue, SoilLayer};
