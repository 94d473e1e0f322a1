pub mod config;
pub mod entities;
pub mod http_control;
pub mod metrics_server;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod statistics;
pub mod transform;

pub use model::{ConsumptionModel, ConsumptionModelBuilder};
pub use pipeline::{Envelope, Pipeline};
