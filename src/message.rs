//! Messages delivered by the transport and the sensor fields they carry.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message received from the broker.
///
/// `data` is the decoded JSON object of the payload. Once a message is
/// queued it is never modified; the UI consumes it exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub data: Map<String, Value>,
}

impl Message {
    pub fn new<T: Into<String>>(topic: T, data: Map<String, Value>) -> Self {
        Message {
            topic: topic.into(),
            data,
        }
    }

    /// Decode a raw MQTT payload.
    ///
    /// JSON objects become `data` as-is. Any other JSON value, or a payload
    /// that is not JSON at all, is wrapped as `{"value": ...}` so that
    /// downstream consumers still see it.
    pub fn from_payload<T: Into<String>>(topic: T, payload: &[u8]) -> Self {
        let data = match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(map)) => map,
            Ok(other) => wrap_value(other),
            Err(_) => wrap_value(Value::String(String::from_utf8_lossy(payload).into_owned())),
        };

        Message::new(topic, data)
    }
}

fn wrap_value(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("value".to_string(), value);
    map
}

/// The metrics the sensor node reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Temperature,
    Humidity,
    Pressure,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::Pressure];

    /// The payload key, which is also the history series name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Pressure => "pressure",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the LED indicator on the sensor node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedStatus {
    On,
    #[default]
    Off,
}

impl LedStatus {
    pub fn toggled(self) -> Self {
        match self {
            LedStatus::On => LedStatus::Off,
            LedStatus::Off => LedStatus::On,
        }
    }

    /// The command that asks the node to reach this state.
    pub fn command(self) -> &'static str {
        match self {
            LedStatus::On => "enable",
            LedStatus::Off => "disable",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("on") {
            Some(LedStatus::On)
        } else if raw.eq_ignore_ascii_case("off") {
            Some(LedStatus::Off)
        } else {
            None
        }
    }
}

impl fmt::Display for LedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedStatus::On => write!(f, "ON"),
            LedStatus::Off => write!(f, "OFF"),
        }
    }
}

/// The sensor fields found in one message.
///
/// Every field is optional: a message may carry any subset of them.
/// Fields that are present but malformed are dropped (and logged); the
/// well-formed ones are still applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorUpdate {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub led_status: Option<LedStatus>,
}

impl SensorUpdate {
    pub fn from_data(data: &Map<String, Value>) -> Self {
        SensorUpdate {
            temperature: metric_field(data, Metric::Temperature),
            humidity: metric_field(data, Metric::Humidity),
            pressure: metric_field(data, Metric::Pressure),
            led_status: led_field(data),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Pressure => self.pressure,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == SensorUpdate::default()
    }
}

fn metric_field(data: &Map<String, Value>, metric: Metric) -> Option<f64> {
    let raw = data.get(metric.as_str())?;
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        // sensor firmwares occasionally send numbers as strings
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match value {
        Some(v) if v.is_finite() => Some(v),
        _ => {
            tracing::warn!(field = metric.as_str(), value = %raw, "skipping malformed sensor field");
            None
        }
    }
}

fn led_field(data: &Map<String, Value>) -> Option<LedStatus> {
    let raw = data.get("led_status")?;
    let parsed = raw.as_str().and_then(LedStatus::parse);
    if parsed.is_none() {
        tracing::warn!(field = "led_status", value = %raw, "skipping malformed led status");
    }
    parsed
}
