pub mod config;
pub mod health;
pub mod logging;

pub use self::config::Config;
pub use self::health::{HealthChecker, HealthStatus};
pub use self::logging::{init_logging, LogFormat};
