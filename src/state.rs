//! State owned by the UI thread.

use crate::band::{HumidityBand, IndicatorColor, PressureBand, TemperatureBand};
use crate::message::{LedStatus, Message, Metric, SensorUpdate};
use crate::store::RollingSampleStore;

/// Latest value of every field the node reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentValues {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub led_status: LedStatus,
    pub last_update: Option<String>,
}

/// Bands of the most recent reading per metric; `None` until a reading arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bands {
    pub temperature: Option<TemperatureBand>,
    pub indicator: Option<IndicatorColor>,
    pub humidity: Option<HumidityBand>,
    pub pressure: Option<PressureBand>,
}

/// Everything the refresh and redraw loops mutate.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub current: CurrentValues,
    pub bands: Bands,
    pub history: RollingSampleStore,
    pub message_count: u64,
    /// Connection state as last shown to the user.
    pub connected: bool,
}

impl DashboardState {
    pub fn new() -> Self {
        DashboardState::default()
    }

    /// Record the connection flag seen this tick.
    ///
    /// Returns `true` only when it differs from what is on screen.
    pub fn sync_connection(&mut self, connected: bool) -> bool {
        if self.connected == connected {
            return false;
        }
        self.connected = connected;
        true
    }

    /// Apply one message. Fields missing from it keep their previous values.
    pub fn apply(&mut self, message: &Message) {
        self.message_count += 1;

        let update = SensorUpdate::from_data(&message.data);
        if update.is_empty() {
            tracing::debug!(topic = %message.topic, "message carries no sensor fields");
        }

        for metric in Metric::ALL {
            if let Some(value) = update.get(metric) {
                self.set_metric(metric, value);
            }
        }

        if let Some(led) = update.led_status {
            self.current.led_status = led;
        }
    }

    fn set_metric(&mut self, metric: Metric, value: f64) {
        self.history.append(metric.as_str(), value);

        match metric {
            Metric::Temperature => {
                self.current.temperature = value;
                self.bands.temperature = Some(TemperatureBand::classify(value));
                self.bands.indicator = Some(IndicatorColor::classify(value));
            }
            Metric::Humidity => {
                self.current.humidity = value;
                self.bands.humidity = Some(HumidityBand::classify(value));
            }
            Metric::Pressure => {
                self.current.pressure = value;
                self.bands.pressure = Some(PressureBand::classify(value));
            }
        }
    }

    /// Close a tick that processed at least one message.
    ///
    /// The time axis advances once per such tick, whichever metrics changed.
    pub fn complete_tick<T: Into<String>>(&mut self, stamp: T) {
        let stamp = stamp.into();
        self.history.push_timestamp(stamp.clone());
        self.current.last_update = Some(stamp);
    }

    /// Optimistically set the LED state after a command was sent.
    pub fn set_led(&mut self, status: LedStatus) {
        self.current.led_status = status;
    }

    pub fn status_view(&self, broker: &str) -> StatusView {
        let temperature = match self.bands.temperature {
            Some(_) => format!("{:.1}°C", self.current.temperature),
            None => "--°C".to_string(),
        };
        let humidity = match self.bands.humidity {
            Some(_) => format!("{:.0}%", self.current.humidity),
            None => "--%".to_string(),
        };
        let pressure = match self.bands.pressure {
            Some(_) => format!("{:.1} hPa", self.current.pressure),
            None => "-- hPa".to_string(),
        };

        let led_button = match self.current.led_status {
            LedStatus::On => "Disable LED Indicator",
            LedStatus::Off => "Enable LED Indicator",
        };

        StatusView {
            connection: if self.connected { "● Connected" } else { "● Disconnected" },
            temperature,
            temperature_status: self.bands.temperature.map(|b| (b.status_text(), b.color())),
            indicator: self
                .bands
                .indicator
                .map_or_else(|| "Indicator: -".to_string(), |c| format!("Indicator: {}", c.label())),
            humidity,
            humidity_status: self.bands.humidity.map(|b| (b.status_text(), b.color())),
            pressure,
            pressure_status: self.bands.pressure.map(|b| (b.status_text(), b.color())),
            led: self.current.led_status.to_string(),
            led_button,
            last_update: format!(
                "Last update: {}",
                self.current.last_update.as_deref().unwrap_or("--")
            ),
            message_count: format!("Messages received: {}", self.message_count),
            broker: format!("Broker: {}", broker),
        }
    }
}

/// Text the rendering surface shows for the status panel.
///
/// Status entries are `(text, colour)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub connection: &'static str,
    pub temperature: String,
    pub temperature_status: Option<(&'static str, &'static str)>,
    pub indicator: String,
    pub humidity: String,
    pub humidity_status: Option<(&'static str, &'static str)>,
    pub pressure: String,
    pub pressure_status: Option<(&'static str, &'static str)>,
    pub led: String,
    pub led_button: &'static str,
    pub last_update: String,
    pub message_count: String,
    pub broker: String,
}
