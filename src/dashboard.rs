//! The dashboard: UI-thread loops on top of the ingestion thread.
//!
//! Two periodic jobs run on the UI thread, each re-arming itself through
//! the [`Surface`] after it runs:
//!
//! - the refresh loop mirrors the connection flag, drains every queued
//!   message into [`DashboardState`] and updates the status panel;
//! - the redraw loop rebuilds the graphs from the sample history.
//!
//! The message queue and the connection flag are the only state shared
//! with the ingestion thread. Shutdown clears the running flag, cancels
//! the armed timers, disconnects the transport and finally closes the
//! surface.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use serde_json::json;

use crate::config::DashboardConfig;
use crate::graph::GraphFrame;
use crate::ingest::{IngestLoop, DEFAULT_POLL_TIMEOUT};
use crate::message::{LedStatus, Message};
use crate::mq::{Payload, Transport};
use crate::recorder::MessageSink;
use crate::scheduler::{Task, TimerHandle};
use crate::state::DashboardState;
use crate::surface::{Surface, SurfaceEvent};

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub refresh_interval: Duration,
    pub graph_interval: Duration,
    pub poll_timeout: Duration,
    /// Topic LED commands are published to.
    pub led_topic: String,
    /// Broker address shown in the status panel.
    pub broker: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        DashboardSettings::from_config(&DashboardConfig::default())
    }
}

impl DashboardSettings {
    pub fn from_config(config: &DashboardConfig) -> Self {
        DashboardSettings {
            refresh_interval: config.dashboard.refresh_interval(),
            graph_interval: config.dashboard.graph_interval(),
            poll_timeout: config.dashboard.poll_timeout(),
            led_topic: config.topics.led_indicator.clone(),
            broker: config.broker.address(),
        }
    }
}

pub struct Dashboard<T: Transport + 'static, S: Surface> {
    transport: Arc<T>,
    surface: S,
    settings: DashboardSettings,
    state: DashboardState,
    queue: Receiver<Message>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    /// The ingestion loop until it is started or taken.
    ingest: Option<IngestLoop<T>>,
    ingest_thread: Option<JoinHandle<()>>,
    refresh_timer: Option<TimerHandle>,
    redraw_timer: Option<TimerHandle>,
    closed: bool,
}

impl<T: Transport + 'static, S: Surface> Dashboard<T, S> {
    pub fn new(transport: Arc<T>, surface: S, settings: DashboardSettings) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let connected = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let poll_timeout = if settings.poll_timeout.is_zero() {
            DEFAULT_POLL_TIMEOUT
        } else {
            settings.poll_timeout
        };
        let ingest = IngestLoop::new(
            Arc::clone(&transport),
            tx,
            Arc::clone(&connected),
            Arc::clone(&running),
            poll_timeout,
        );

        Dashboard {
            transport,
            surface,
            settings,
            state: DashboardState::new(),
            queue: rx,
            connected,
            running,
            ingest: Some(ingest),
            ingest_thread: None,
            refresh_timer: None,
            redraw_timer: None,
            closed: false,
        }
    }

    /// Hand every ingested message to `sink` as well. Only possible before
    /// the ingestion loop is started or taken.
    pub fn add_sink(&mut self, sink: Box<dyn MessageSink>) -> bool {
        match self.ingest.as_mut() {
            Some(ingest) => {
                ingest.add_sink(sink);
                true
            }
            None => {
                tracing::warn!("ingestion already started, sink ignored");
                false
            }
        }
    }

    /// Take the ingestion loop to drive it by hand instead of on its own
    /// thread. [`start`](Dashboard::start) then only arms the timers.
    pub fn take_ingest_loop(&mut self) -> Option<IngestLoop<T>> {
        self.ingest.take()
    }

    /// Spawn the ingestion thread and arm both periodic loops.
    pub fn start(&mut self) -> Result<(), Error> {
        if let Some(ingest) = self.ingest.take() {
            self.ingest_thread = Some(ingest.spawn().map_err(Error::SpawnIngest)?);
        }
        self.arm();
        Ok(())
    }

    /// Arm the first refresh and redraw ticks.
    pub fn arm(&mut self) {
        self.refresh_timer = self.rearm(self.settings.refresh_interval, Task::Refresh);
        self.redraw_timer = self.rearm(self.settings.graph_interval, Task::Redraw);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// One run of the refresh loop.
    pub fn refresh_tick(&mut self) {
        self.refresh_timer = None;
        if !self.is_running() {
            return;
        }

        let connected = self.connected.load(Ordering::Acquire);
        if self.state.sync_connection(connected) {
            tracing::info!(connected, "connection state changed");
            self.surface.connection_changed(connected);
        }

        let drained = self.drain_queue();
        if drained > 0 {
            let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
            self.state.complete_tick(stamp);
        }

        let view = self.state.status_view(&self.settings.broker);
        self.surface.show_status(&view);

        self.refresh_timer = self.rearm(self.settings.refresh_interval, Task::Refresh);
    }

    /// Apply every queued message in arrival order.
    fn drain_queue(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(message) = self.queue.try_recv() {
            self.state.apply(&message);
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!(drained, total = self.state.message_count, "drained message queue");
        }
        drained
    }

    /// One run of the redraw loop.
    pub fn redraw_tick(&mut self) {
        self.redraw_timer = None;
        if !self.is_running() {
            return;
        }

        let frame = GraphFrame::build(&self.state.history.snapshot());
        self.surface.draw_graphs(&frame);

        self.redraw_timer = self.rearm(self.settings.graph_interval, Task::Redraw);
    }

    fn rearm(&mut self, delay: Duration, task: Task) -> Option<TimerHandle> {
        if !self.is_running() {
            return None;
        }

        match self.surface.schedule(delay, task) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::debug!(error = %e, ?task, "periodic task stopped");
                None
            }
        }
    }

    /// Ask the node to flip its LED and show the new state right away.
    ///
    /// Fire-and-forget: nothing confirms the command. The next `led_status`
    /// reported by the node overwrites the optimistic value.
    pub fn toggle_led(&mut self) -> LedStatus {
        let next = self.state.current.led_status.toggled();
        let payload = Payload::Json(json!({ "action": next.command() }));

        if let Err(e) = self.transport.publish(&self.settings.led_topic, &payload) {
            tracing::warn!(error = ?e, "failed to publish LED command");
        }

        self.state.set_led(next);
        let view = self.state.status_view(&self.settings.broker);
        self.surface.show_status(&view);
        next
    }

    /// Handle one surface event. Returns `false` when the dashboard should stop.
    pub fn handle(&mut self, event: SurfaceEvent) -> bool {
        match event {
            SurfaceEvent::Timer(Task::Refresh) => self.refresh_tick(),
            SurfaceEvent::Timer(Task::Redraw) => self.redraw_tick(),
            SurfaceEvent::ToggleLed => {
                self.toggle_led();
            }
            SurfaceEvent::CloseRequested => return false,
        }
        true
    }

    /// Run the UI event loop until the surface closes or asks to, then shut down.
    pub fn run(&mut self) {
        while self.is_running() {
            let Some(event) = self.surface.next_event() else {
                break;
            };
            if !self.handle(event) {
                break;
            }
        }
        self.shutdown();
    }

    /// Stop everything. Safe to call more than once; only the first call
    /// does anything.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.running.store(false, Ordering::Release);

        for handle in [self.refresh_timer.take(), self.redraw_timer.take()]
            .into_iter()
            .flatten()
        {
            self.surface.cancel(handle);
        }

        if let Err(e) = self.transport.disconnect() {
            tracing::debug!(error = ?e, "disconnect failed during shutdown");
        }

        self.surface.close();

        if let Some(handle) = self.ingest_thread.take() {
            if handle.join().is_err() {
                tracing::error!("ingestion thread panicked");
            }
        }

        tracing::info!(messages = self.state.message_count, "dashboard stopped");
    }
}

impl<T: Transport + 'static, S: Surface> Drop for Dashboard<T, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("spawn ingestion thread: {0}")]
    SpawnIngest(#[source] io::Error),
}
