// Core pipeline exports
pub mod pipeline;
pub mod sampler;

pub use pipeline::{PipelineError, RouteWeatherPipeline};
pub use sampler::sample_waypoints;
