use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::logging::LogFormat;
use crate::error::ConfigError;
use crate::fusion::FusionConfig;

/// Environment variables are read as `RACING_CV_<FIELD>`, e.g. `RACING_CV_SERVER_PORT`.
pub const ENV_PREFIX: &str = "RACING_CV";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub connections: ConnectionLimits,
    pub fusion: FusionSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub ws_input_endpoint: String,
    pub ws_game_endpoint: String,
    pub allowed_origins: String,
    pub game_update_rate_hz: u32,
    pub phone_client_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ConnectionLimits {
    pub max_input_clients: usize,
    pub max_game_clients: usize,
}

#[derive(Debug, Clone)]
pub struct FusionSettings {
    pub weights: HashMap<String, f64>,
    pub smoothing_window: usize,
    pub smoothing_enabled: bool,
    pub smoothing_alpha: f64,
    pub stale_after: Option<Duration>,
    pub stale_sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Flat view of the environment, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawSettings {
    server_host: String,
    server_port: u16,
    ws_input_endpoint: String,
    ws_game_endpoint: String,
    allowed_origins: String,
    max_input_clients: usize,
    max_game_clients: usize,
    game_update_rate_hz: u32,
    fusion_weights: String,
    smoothing_window: usize,
    smoothing_enabled: bool,
    smoothing_alpha: f64,
    stale_after_secs: f64,
    stale_sweep_interval_ms: u64,
    phone_client_path: PathBuf,
    log_level: String,
    log_format: String,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            ws_input_endpoint: "ws".to_string(),
            ws_game_endpoint: "ws/game".to_string(),
            allowed_origins: "*".to_string(),
            max_input_clients: 10,
            max_game_clients: 10,
            game_update_rate_hz: 60,
            fusion_weights: String::new(),
            smoothing_window: 5,
            smoothing_enabled: true,
            smoothing_alpha: 0.3,
            stale_after_secs: 0.0,
            stale_sweep_interval_ms: 500,
            phone_client_path: PathBuf::from("frontend/js/phone_client.html"),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl RawSettings {
    fn validate(self) -> Result<Config, ConfigError> {
        if self.smoothing_window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(ConfigError::InvalidAlpha(self.smoothing_alpha));
        }
        if self.game_update_rate_hz == 0 {
            return Err(ConfigError::ZeroUpdateRate);
        }

        let stale_after = (self.stale_after_secs.is_finite() && self.stale_after_secs > 0.0)
            .then(|| Duration::from_secs_f64(self.stale_after_secs));

        Ok(Config {
            server: ServerConfig {
                host: self.server_host,
                port: self.server_port,
                ws_input_endpoint: self.ws_input_endpoint,
                ws_game_endpoint: self.ws_game_endpoint,
                allowed_origins: self.allowed_origins,
                game_update_rate_hz: self.game_update_rate_hz,
                phone_client_path: self.phone_client_path,
            },
            connections: ConnectionLimits {
                max_input_clients: self.max_input_clients,
                max_game_clients: self.max_game_clients,
            },
            fusion: FusionSettings {
                weights: parse_weights(&self.fusion_weights)?,
                smoothing_window: self.smoothing_window,
                smoothing_enabled: self.smoothing_enabled,
                smoothing_alpha: self.smoothing_alpha,
                stale_after,
                stale_sweep_interval: Duration::from_millis(self.stale_sweep_interval_ms.max(1)),
            },
            logging: LoggingConfig {
                level: self.log_level,
                format: self.log_format.parse()?,
            },
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        );
        Self::from_builder(builder)
    }

    /// Build from an arbitrary source stack; unset keys take their defaults.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let raw: RawSettings = builder.build()?.try_deserialize()?;
        raw.validate()
    }

    pub fn game_update_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.server.game_update_rate_hz as f64)
    }

    pub fn allowed_origins_list(&self) -> Vec<String> {
        let origins = self.server.allowed_origins.trim();
        if origins == "*" {
            return vec!["*".to_string()];
        }
        origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn input_ws_uri(&self) -> String {
        format!(
            "ws://localhost:{}/{}",
            self.server.port,
            self.server.ws_input_endpoint.trim_start_matches('/')
        )
    }

    pub fn fusion_config(&self) -> FusionConfig {
        FusionConfig {
            weights: self.fusion.weights.clone(),
            smoothing_window: self.fusion.smoothing_window,
            smoothing_enabled: self.fusion.smoothing_enabled,
            smoothing_alpha: self.fusion.smoothing_alpha,
            stale_after: self.fusion.stale_after,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // Built-in defaults always validate.
        match RawSettings::default().validate() {
            Ok(config) => config,
            Err(e) => unreachable!("default settings invalid: {}", e),
        }
    }
}

/// Parse `name=weight,name=weight`. Blank input yields an empty map.
pub fn parse_weights(raw: &str) -> Result<HashMap<String, f64>, ConfigError> {
    let mut weights = HashMap::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedWeight(entry.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::MalformedWeight(entry.to_string()));
        }

        let weight: f64 = value
            .trim()
            .parse()
            .ok()
            .filter(|w: &f64| w.is_finite() && *w >= 0.0)
            .ok_or_else(|| ConfigError::InvalidWeight {
                source_name: name.to_string(),
                raw: value.trim().to_string(),
            })?;

        weights.insert(name.to_string(), weight);
    }

    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::FusionEngine;

    #[test]
    fn test_defaults() {
        let config = Config::from_builder(config::Config::builder()).unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.connections.max_input_clients, 10);
        assert_eq!(config.fusion.smoothing_window, 5);
        assert!(config.fusion.smoothing_enabled);
        assert_eq!(config.fusion.smoothing_alpha, 0.3);
        assert_eq!(config.fusion.stale_after, None);
        assert!(config.fusion.weights.is_empty());
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.input_ws_uri(), "ws://localhost:8000/ws");
    }

    #[test]
    fn test_default_weights_are_equal() {
        let mut engine = FusionEngine::new(Config::default().fusion_config());
        engine.update("webcam", 1.0, None);
        engine.update("joystick", -1.0, None);
        engine.recompute();

        assert!(engine.instant_value().abs() < 1e-9);
    }

    #[test]
    fn test_overrides() {
        let builder = config::Config::builder()
            .set_override("server_port", 9100)
            .unwrap()
            .set_override("fusion_weights", "webcam=0.8, phone=0.2")
            .unwrap()
            .set_override("stale_after_secs", 2.5)
            .unwrap()
            .set_override("log_format", "text")
            .unwrap();
        let config = Config::from_builder(builder).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.fusion.weights.get("phone"), Some(&0.2));
        assert_eq!(config.fusion.stale_after, Some(Duration::from_millis(2500)));
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let builder = config::Config::builder()
            .set_override("smoothing_alpha", 1.5)
            .unwrap();
        assert!(matches!(
            Config::from_builder(builder),
            Err(ConfigError::InvalidAlpha(_))
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let builder = config::Config::builder()
            .set_override("smoothing_window", 0)
            .unwrap();
        assert!(matches!(
            Config::from_builder(builder),
            Err(ConfigError::ZeroWindow)
        ));
    }

    #[test]
    fn test_parse_weights() {
        let weights = parse_weights("webcam=0.7,phone=0.3,").unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights["webcam"], 0.7);

        assert!(parse_weights("").unwrap().is_empty());
        assert!(matches!(
            parse_weights("webcam"),
            Err(ConfigError::MalformedWeight(_))
        ));
        assert!(matches!(
            parse_weights("webcam=-1"),
            Err(ConfigError::InvalidWeight { .. })
        ));
        assert!(matches!(
            parse_weights("webcam=heavy"),
            Err(ConfigError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_allowed_origins_list() {
        let mut config = Config::default();
        assert_eq!(config.allowed_origins_list(), vec!["*"]);

        config.server.allowed_origins = "http://a.test, http://b.test".to_string();
        assert_eq!(
            config.allowed_origins_list(),
            vec!["http://a.test", "http://b.test"]
        );
    }

    #[test]
    fn test_game_update_interval() {
        let mut config = Config::default();
        config.server.game_update_rate_hz = 50;
        assert_eq!(config.game_update_interval(), Duration::from_millis(20));
    }
}
