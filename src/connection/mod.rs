pub mod manager;

pub use manager::{ClientRole, ConnectionManager, ConnectionStats, RoleStats};
