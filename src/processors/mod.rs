pub mod batch;
pub mod pedotransfer;
pub mod pipeline;
pub mod sampler;
pub mod solver;

pub use batch::{BatchDriver, BatchReport};
pub use pedotransfer::{field_capacity, permanent_wilting_point, WaterRetention};
pub use pipeline::{DotSolPipeline, PipelineFailure, PipelineReport, PipelineState};
pub use sampler::SoilPropertySampler;
pub use solver::{find_record, patch_header, place, Placement, ProcessSolver, SoilSolver};
