pub mod message;
pub mod metrics;

pub use message::{GameUpdateMessage, SteeringMessage};
pub use metrics::IngestMetrics;
