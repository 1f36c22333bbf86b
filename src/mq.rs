//! Message queue.

use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use opentelemetry::global::get_text_map_propagator;
use paho_mqtt::{MessageBuilder as MqttMessageBuilder, Properties as MqttProps, Property, PropertyCode};
use serde_json::Value;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::{BrokerConfig, TopicConfig};
use crate::message::Message;

/// The publish/subscribe boundary the dashboard talks to.
///
/// Implementations are shared between the ingestion thread (which calls
/// [`check_connection`](Transport::check_connection) and
/// [`get_message`](Transport::get_message)) and the UI thread (which
/// publishes commands and disconnects), so every method takes `&self`.
pub trait Transport: Send + Sync {
    fn connect(&self) -> Result<(), Error>;

    fn publish(&self, topic: &str, payload: &Payload) -> Result<(), Error>;

    /// Whether the broker connection is currently up. Never fails: any
    /// problem reads as "not connected".
    fn check_connection(&self) -> bool;

    /// Wait up to `timeout` for the next message.
    fn get_message(&self, timeout: Duration) -> Result<Option<Message>, Error>;

    fn disconnect(&self) -> Result<(), Error>;
}

/// Body of an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    fn content_type(&self) -> &'static str {
        match self {
            Payload::Json(_) => "application/json",
            Payload::Text(_) => "text/plain",
        }
    }

    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        match self {
            Payload::Json(value) => Ok(serde_json::to_vec(value)?),
            Payload::Text(text) => Ok(text.as_bytes().to_vec()),
        }
    }
}

/// [`Transport`] backed by an MQTT v5 broker.
pub struct MqttTransport {
    client: paho_mqtt::Client,
    messages: Receiver<Option<paho_mqtt::Message>>,
    device_id: String,
    server_uri: String,
    topics: Vec<String>,
    qos: i32,
    keep_alive: Duration,
    /// Set when the consumer reported a lost connection; the subscriptions
    /// are renewed once the client is back.
    resubscribe: AtomicBool,
}

impl MqttTransport {
    pub fn new<T: AsRef<str>>(
        server_uri: &str,
        device_id: T,
        topics: Vec<String>,
        qos: i32,
        keep_alive: Duration,
    ) -> Result<MqttTransport, Error> {
        let mut client = paho_mqtt::Client::new(
            paho_mqtt::CreateOptionsBuilder::new()
                .server_uri(server_uri)
                .client_id(device_id.as_ref())
                .mqtt_version(paho_mqtt::MQTT_VERSION_5)
                .finalize(),
        )?;

        // must start before connecting so nothing published right after
        // the subscription is lost
        let messages = client.start_consuming();

        Ok(MqttTransport {
            client,
            messages,
            device_id: device_id.as_ref().to_string(),
            server_uri: server_uri.to_string(),
            topics,
            qos,
            keep_alive,
            resubscribe: AtomicBool::new(false),
        })
    }

    pub fn from_config(broker: &BrokerConfig, topics: &TopicConfig) -> Result<MqttTransport, Error> {
        MqttTransport::new(
            &broker.server_uri(),
            &broker.client_id,
            topics.subscribe.clone(),
            topics.qos,
            Duration::from_secs(broker.keep_alive_secs),
        )
    }

    fn subscribe(&self) -> Result<(), Error> {
        if self.topics.is_empty() {
            tracing::debug!("no topics to subscribe to");
            return Ok(());
        }

        let qos = vec![self.qos; self.topics.len()];
        self.client.subscribe_many(self.topics.as_slice(), qos.as_slice())?;
        tracing::info!(topics = ?self.topics, "subscribed");
        Ok(())
    }
}

impl Transport for MqttTransport {
    /// Connect to the MQTT broker and subscribe to the sensor topics.
    ///
    /// The client reconnects on its own after a connection loss.
    #[tracing::instrument(err)]
    fn connect(&self) -> Result<(), Error> {
        tracing::info!("connect to the MQTT broker");

        let options = paho_mqtt::ConnectOptionsBuilder::new_v5()
            .keep_alive_interval(self.keep_alive)
            .clean_start(true)
            .automatic_reconnect(Duration::from_secs(1), Duration::from_secs(30))
            .finalize();

        let connection_info = self.client.connect(options);
        if let Err(e) = connection_info {
            tracing::error!(error = ?e, "failed to connect to the MQTT broker");
            return Err(e.into());
        }

        tracing::info!(info = ?connection_info, "connected to the MQTT broker");
        self.subscribe()
    }

    /// Publish `payload` to `topic`, carrying the current trace context.
    #[tracing::instrument(err)]
    fn publish(&self, topic: &str, payload: &Payload) -> Result<(), Error> {
        let message_id = uuid::Uuid::now_v7().to_string();
        let emitted_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);

        tracing::debug!(message_id, emitted_at, "putting properties");

        let mut message_properties = MqttProps::new();
        message_properties.push(Property::new_string(PropertyCode::ContentType, payload.content_type())?)?;
        message_properties.push(Property::new_string_pair(PropertyCode::UserProperty, "message_id", &message_id)?)?;
        message_properties.push(Property::new_string_pair(PropertyCode::UserProperty, "device_id", &self.device_id)?)?;
        message_properties.push(Property::new_string_pair(PropertyCode::UserProperty, "emitted_at", &emitted_at)?)?;

        // tracing information
        let ctx = tracing::Span::current().context();
        get_text_map_propagator(|propagator| {
            propagator.inject_context(&ctx, &mut MqttCarrierInjector(&mut message_properties))
        });

        let message = MqttMessageBuilder::new()
            .topic(topic)
            .payload(payload.to_bytes()?)
            .qos(self.qos)
            .properties(message_properties)
            .finalize();

        self.client.publish(message)?;

        tracing::info!("message published");
        Ok(())
    }

    fn check_connection(&self) -> bool {
        let connected = self.client.is_connected();
        if connected && self.resubscribe.swap(false, Ordering::AcqRel) {
            if let Err(e) = self.subscribe() {
                tracing::warn!(error = ?e, "failed to renew subscriptions");
                self.resubscribe.store(true, Ordering::Release);
            }
        }
        connected
    }

    fn get_message(&self, timeout: Duration) -> Result<Option<Message>, Error> {
        match self.messages.recv_timeout(timeout) {
            Ok(Some(msg)) => Ok(Some(Message::from_payload(msg.topic(), msg.payload()))),
            // the consumer yields `None` when the connection drops
            Ok(None) => {
                self.resubscribe.store(true, Ordering::Release);
                Err(Error::ConnectionLost)
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::ConsumerClosed),
        }
    }

    #[tracing::instrument(err)]
    fn disconnect(&self) -> Result<(), Error> {
        self.client.stop_consuming();
        self.client.disconnect(None)?;
        tracing::info!("disconnected from the MQTT broker");
        Ok(())
    }
}

impl Debug for MqttTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttTransport")
            .field("server_uri", &self.server_uri)
            .field("device_id", &self.device_id)
            .field("topics", &self.topics)
            .finish()
    }
}

pub struct MqttCarrierInjector<'a>(pub &'a mut MqttProps);

impl<'a> opentelemetry::propagation::Injector for MqttCarrierInjector<'a> {
    fn set(&mut self, key: &str, value: String) {
        if let Err(e) = self.0.push_string_pair(PropertyCode::UserProperty, key, &value) {
            tracing::warn!(error = ?e, key, "cannot push trace context property");
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("MQTT client: {0}")]
    Mqtt(#[from] paho_mqtt::Error),

    #[error("encode payload: {0}")]
    EncodePayload(#[from] serde_json::Error),

    #[error("connection to the broker was lost")]
    ConnectionLost,

    #[error("message consumer closed")]
    ConsumerClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_bytes_and_content_type() {
        let json = Payload::Json(json!({ "action": "enable" }));
        assert_eq!(json.content_type(), "application/json");
        assert_eq!(json.to_bytes().unwrap(), br#"{"action":"enable"}"#.to_vec());

        let text = Payload::Text("on".to_string());
        assert_eq!(text.content_type(), "text/plain");
        assert_eq!(text.to_bytes().unwrap(), b"on".to_vec());
    }
}
