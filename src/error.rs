use thiserror::Error;

/// Reasons an inbound steering frame is dropped at the ingestion boundary.
///
/// None of these reach the fusion core; the socket handler logs them and
/// keeps reading.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("missing `steering` field")]
    MissingSteering,

    #[error("`steering` is not a number: {0}")]
    NonNumericSteering(String),

    #[error("`steering` is not finite: {0}")]
    NonFiniteSteering(f64),
}

impl IngestError {
    /// Short label used for the rejection counter.
    pub fn reason(&self) -> &'static str {
        match self {
            IngestError::InvalidJson(_) => "invalid_json",
            IngestError::NotAnObject => "not_an_object",
            IngestError::MissingSteering => "missing_steering",
            IngestError::NonNumericSteering(_) => "non_numeric",
            IngestError::NonFiniteSteering(_) => "non_finite",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("malformed weight entry `{0}` (expected name=weight)")]
    MalformedWeight(String),

    #[error("weight for `{source_name}` must be a non-negative number, got `{raw}`")]
    InvalidWeight { source_name: String, raw: String },

    #[error("smoothing_alpha must lie in (0, 1], got {0}")]
    InvalidAlpha(f64),

    #[error("smoothing_window must be at least 1")]
    ZeroWindow,

    #[error("game_update_rate_hz must be greater than 0")]
    ZeroUpdateRate,

    #[error("unknown log format `{0}` (expected json or text)")]
    UnknownLogFormat(String),
}
