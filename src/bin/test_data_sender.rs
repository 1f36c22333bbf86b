//! Publish simulated, slowly drifting sensor readings so the dashboard can
//! be exercised without hardware. Runs until interrupted, or until `count`
//! readings were sent.
//!
//! Usage: `test-data-sender [config.json] [count]`

use anyhow::Context;
use iot_dashboard_rs::config::{DashboardConfig, TopicConfig};
use iot_dashboard_rs::mq::{MqttTransport, Payload, Transport};
use iot_dashboard_rs::simulator::SensorNode;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.json".to_string());
    let limit: Option<u64> = args
        .next()
        .map(|raw| raw.parse().with_context(|| format!("invalid count {:?}", raw)))
        .transpose()?;
    let mut config = DashboardConfig::load_with_env(&config_path)
        .with_context(|| format!("load configuration from {}", config_path))?;

    let topic = config
        .topics
        .subscribe
        .first()
        .cloned()
        .context("no sensor topic configured")?;

    // the sender publishes only; keep its client id apart from the dashboard's
    config.broker.client_id = format!("{}-sender", config.broker.client_id);
    let publish_only = TopicConfig {
        subscribe: Vec::new(),
        ..config.topics.clone()
    };
    let transport = MqttTransport::from_config(&config.broker, &publish_only)
        .context("create MQTT client")?;
    transport
        .connect()
        .with_context(|| format!("connect to {}", config.broker.address()))?;

    let interval = config
        .simulator
        .interval()
        .context("invalid simulator interval")?;
    let seed = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let mut node = SensorNode::new(&config.simulator, seed);

    tracing::info!(topic, ?interval, "sending simulated readings");

    for counter in 1u64.. {
        if limit.is_some_and(|limit| counter > limit) {
            break;
        }
        let reading = node.next_reading(chrono::Utc::now().timestamp());
        match transport.publish(&topic, &Payload::Json(reading.clone())) {
            Ok(()) => tracing::info!(counter, %reading, "published"),
            Err(e) => tracing::error!(counter, error = ?e, "publish failed"),
        }
        std::thread::sleep(interval);
    }

    transport.disconnect()?;
    Ok(())
}
