use prometheus::{
    Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::connection::{ClientRole, ConnectionStats};

/// Prometheus collectors for the ingestion path, on a private registry.
#[derive(Clone)]
pub struct IngestMetrics {
    registry: Registry,
    messages_received: IntCounter,
    messages_rejected: IntCounterVec,
    connections_rejected: IntCounterVec,
    merged_steering: Gauge,
    active_sources: IntGauge,
    connections: IntGaugeVec,
}

impl IngestMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let messages_received = IntCounter::new(
            "steering_messages_received_total",
            "Steering frames received from input clients",
        )?;
        let messages_rejected = IntCounterVec::new(
            Opts::new(
                "steering_messages_rejected_total",
                "Steering frames dropped at the ingestion boundary",
            ),
            &["reason"],
        )?;
        let connections_rejected = IntCounterVec::new(
            Opts::new(
                "connections_rejected_total",
                "WebSocket clients turned away at capacity",
            ),
            &["role"],
        )?;
        let merged_steering = Gauge::new("steering_merged_value", "Current fused steering value")?;
        let active_sources = IntGauge::new(
            "steering_active_sources",
            "Sources with at least one recorded value",
        )?;
        let connections = IntGaugeVec::new(
            Opts::new("connections_active", "Connected WebSocket clients"),
            &["role"],
        )?;

        registry.register(Box::new(messages_received.clone()))?;
        registry.register(Box::new(messages_rejected.clone()))?;
        registry.register(Box::new(connections_rejected.clone()))?;
        registry.register(Box::new(merged_steering.clone()))?;
        registry.register(Box::new(active_sources.clone()))?;
        registry.register(Box::new(connections.clone()))?;

        Ok(Self {
            registry,
            messages_received,
            messages_rejected,
            connections_rejected,
            merged_steering,
            active_sources,
            connections,
        })
    }

    pub fn increment_messages_received(&self) {
        self.messages_received.inc();
    }

    pub fn increment_messages_rejected(&self, reason: &str) {
        self.messages_rejected.with_label_values(&[reason]).inc();
    }

    pub fn increment_connections_rejected(&self, role: ClientRole) {
        self.connections_rejected
            .with_label_values(&[role.as_str()])
            .inc();
    }

    pub fn record_fusion(&self, merged: f64, active_sources: usize) {
        self.merged_steering.set(merged);
        self.active_sources.set(active_sources as i64);
    }

    pub fn record_connections(&self, stats: &ConnectionStats) {
        self.connections
            .with_label_values(&[ClientRole::Input.as_str()])
            .set(stats.input_clients as i64);
        self.connections
            .with_label_values(&[ClientRole::Game.as_str()])
            .set(stats.game_clients as i64);
    }

    pub fn get_messages_received(&self) -> u64 {
        self.messages_received.get()
    }

    pub fn get_messages_rejected(&self, reason: &str) -> u64 {
        self.messages_rejected.with_label_values(&[reason]).get()
    }

    /// Text exposition format for `/metrics`.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = IngestMetrics::new().unwrap();
        metrics.increment_messages_received();
        metrics.increment_messages_received();
        metrics.increment_messages_rejected("invalid_json");

        assert_eq!(metrics.get_messages_received(), 2);
        assert_eq!(metrics.get_messages_rejected("invalid_json"), 1);
        assert_eq!(metrics.get_messages_rejected("missing_steering"), 0);
    }

    #[test]
    fn test_render_contains_recorded_values() {
        let metrics = IngestMetrics::new().unwrap();
        metrics.record_fusion(0.25, 2);
        metrics.record_connections(&ConnectionStats {
            input_clients: 1,
            max_input_clients: 10,
            game_clients: 0,
            max_game_clients: 10,
        });

        let text = metrics.render().unwrap();
        assert!(text.contains("steering_merged_value 0.25"));
        assert!(text.contains("steering_active_sources 2"));
        assert!(text.contains(r#"connections_active{role="input"} 1"#));
    }
}
