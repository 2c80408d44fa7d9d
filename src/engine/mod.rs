//! Pipeline engine: argument builders, orchestration and error fan-in

pub mod args;
pub mod fan_in;
pub mod pipeline;
pub mod stream;

pub use args::PipelinePlan;
pub use fan_in::ErrorFanIn;
pub use pipeline::{GifPipeline, PipelineSettings};
pub use stream::GifStream;
