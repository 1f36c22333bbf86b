//! Dashboard configuration.
//!
//! Loaded from a JSON file (`config.json` by default). Every section and
//! field has a default, so a partial file or no file at all still works.
//! The broker address and client id can be overridden from the
//! environment.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

pub const ENV_MQTT_HOST: &str = "IOT_DASHBOARD_MQTT_HOST";
pub const ENV_MQTT_PORT: &str = "IOT_DASHBOARD_MQTT_PORT";
pub const ENV_CLIENT_ID: &str = "IOT_DASHBOARD_CLIENT_ID";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub broker: BrokerConfig,
    pub topics: TopicConfig,
    pub dashboard: DisplayConfig,
    pub logging: LoggingConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            host: "localhost".to_string(),
            port: 1883,
            client_id: format!("iot-dashboard-{}", uuid::Uuid::now_v7()),
            keep_alive_secs: 60,
        }
    }
}

impl BrokerConfig {
    pub fn server_uri(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }

    /// `host:port`, as shown in the status panel.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Topics the dashboard listens to for sensor data.
    pub subscribe: Vec<String>,
    /// Where LED enable/disable commands go.
    pub led_indicator: String,
    pub qos: i32,
}

impl Default for TopicConfig {
    fn default() -> Self {
        TopicConfig {
            subscribe: vec!["sensor/esp32/data".to_string()],
            led_indicator: "sensor/esp32/led".to_string(),
            qos: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub refresh_interval_ms: u64,
    pub graph_interval_ms: u64,
    pub poll_timeout_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            title: "ESP32 Sensor Monitoring Dashboard".to_string(),
            width: 1280,
            height: 800,
            refresh_interval_ms: 500,
            graph_interval_ms: 1000,
            poll_timeout_ms: 500,
        }
    }
}

impl DisplayConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn graph_interval(&self) -> Duration {
        Duration::from_millis(self.graph_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            enabled: true,
            dir: "logs".to_string(),
        }
    }
}

/// Baselines the test data sender drifts around.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub interval_secs: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            temperature: 24.0,
            humidity: 50.0,
            pressure: 1013.25,
            interval_secs: 2.0,
        }
    }
}

impl SimulatorConfig {
    /// Time between readings, at least 100 ms.
    pub fn interval(&self) -> Result<Duration, Error> {
        Duration::try_from_secs_f64(self.interval_secs.max(0.1))
            .map_err(|_| Error::InvalidValue("simulator.interval_secs", self.interval_secs))
    }
}

impl DashboardConfig {
    pub fn from_json(text: &str) -> Result<DashboardConfig, Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DashboardConfig, Error> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => DashboardConfig::from_json(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                Ok(DashboardConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load `path`, then apply environment overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<DashboardConfig, Error> {
        let mut config = DashboardConfig::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_MQTT_HOST) {
            self.broker.host = host;
        }
        if let Some(port) = lookup(ENV_MQTT_PORT) {
            self.broker.port = port
                .parse()
                .map_err(|_| Error::InvalidOverride(ENV_MQTT_PORT, port))?;
        }
        if let Some(client_id) = lookup(ENV_CLIENT_ID) {
            self.broker.client_id = client_id;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {0}: {1:?}")]
    InvalidOverride(&'static str, String),

    #[error("{0} out of range: {1}")]
    InvalidValue(&'static str, f64),
}
