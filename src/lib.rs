//! # IoT Dashboard
//!
//! IoT Dashboard is the desktop side of a small sensor telemetry setup.
//! A sensor node publishes temperature, humidity and pressure readings to
//! an MQTT broker; the dashboard subscribes to them, keeps a rolling
//! history for plotting and lets the operator toggle the node's LED
//! indicator.
//!
//! The moving parts are:
//!
//! - [`mq`]: the transport boundary ([`mq::Transport`]) and its MQTT implementation.
//! - [`ingest`]: the background loop that turns transport events into queued [`message::Message`]s.
//! - [`dashboard`]: the UI-thread loops that drain the queue, update state and redraw graphs.
//! - [`recorder`] and [`export`]: downstream consumers that keep messages on disk.

pub mod band;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod graph;
pub mod ingest;
pub mod message;
pub mod mq;
pub mod recorder;
pub mod scheduler;
pub mod simulator;
pub mod state;
pub mod store;
pub mod surface;
