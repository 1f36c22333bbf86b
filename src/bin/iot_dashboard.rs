//! Terminal dashboard: subscribe to the sensor topics, show live status and
//! graphs, and toggle the node's LED with `t`.
//!
//! Usage: `iot-dashboard [config.json]`

use std::sync::Arc;

use anyhow::Context;
use iot_dashboard_rs::config::DashboardConfig;
use iot_dashboard_rs::dashboard::{Dashboard, DashboardSettings};
use iot_dashboard_rs::mq::{MqttTransport, Transport};
use iot_dashboard_rs::recorder::MessageLogger;
use iot_dashboard_rs::surface::TerminalSurface;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = DashboardConfig::load_with_env(&config_path)
        .with_context(|| format!("load configuration from {}", config_path))?;

    let transport = Arc::new(
        MqttTransport::from_config(&config.broker, &config.topics).context("create MQTT client")?,
    );
    transport
        .connect()
        .with_context(|| format!("connect to {}", config.broker.address()))?;

    let surface = TerminalSurface::stdout(&config.dashboard.title)
        .with_stdin_commands()
        .context("start command reader")?;

    let mut dashboard = Dashboard::new(transport, surface, DashboardSettings::from_config(&config));

    if config.logging.enabled {
        let logger = MessageLogger::new(&config.logging.dir).context("create message logger")?;
        dashboard.add_sink(Box::new(logger));
    }

    dashboard.start()?;
    dashboard.run();
    Ok(())
}
