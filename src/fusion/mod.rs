pub mod engine;
pub mod hub;
pub mod registry;

pub use engine::{FusionConfig, FusionEngine};
pub use hub::{SteeringHub, SteeringSnapshot};
pub use registry::{SourceRegistry, SourceSample};

use chrono::Utc;

pub const STEERING_MIN: f64 = -1.0;
pub const STEERING_MAX: f64 = 1.0;

/// Saturate a steering value at the [-1.0, 1.0] bounds.
pub fn clamp_steering(value: f64) -> f64 {
    value.clamp(STEERING_MIN, STEERING_MAX)
}

/// Wall-clock time in fractional seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_steering() {
        assert_eq!(clamp_steering(0.25), 0.25);
        assert_eq!(clamp_steering(1.0), 1.0);
        assert_eq!(clamp_steering(-1.0), -1.0);
        assert_eq!(clamp_steering(2.0), 1.0);
        assert_eq!(clamp_steering(-2.0), -1.0);
    }
}
