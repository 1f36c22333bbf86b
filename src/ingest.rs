//! Background ingestion of transport messages.
//!
//! The ingestion loop is the only writer of the shared connection flag
//! and the only producer on the message queue. It never touches UI state.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::message::Message;
use crate::mq::Transport;
use crate::recorder::MessageSink;

/// How long one poll waits for a message. Also bounds how quickly the loop
/// notices shutdown.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);

pub struct IngestLoop<T: Transport + 'static> {
    transport: Arc<T>,
    queue: Sender<Message>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    poll_timeout: Duration,
    sinks: Vec<Box<dyn MessageSink>>,
}

impl<T: Transport + 'static> IngestLoop<T> {
    pub fn new(
        transport: Arc<T>,
        queue: Sender<Message>,
        connected: Arc<AtomicBool>,
        running: Arc<AtomicBool>,
        poll_timeout: Duration,
    ) -> Self {
        IngestLoop {
            transport,
            queue,
            connected,
            running,
            poll_timeout,
            sinks: Vec::new(),
        }
    }

    /// Also hand every message to `sink` after queueing it.
    pub fn add_sink(&mut self, sink: Box<dyn MessageSink>) {
        self.sinks.push(sink);
    }

    /// One iteration: refresh the connection flag, then wait for at most
    /// one message. Returns whether a message was queued.
    pub fn poll_once(&mut self) -> bool {
        let connected = self.transport.check_connection();
        self.connected.store(connected, Ordering::Release);

        match self.transport.get_message(self.poll_timeout) {
            Ok(Some(message)) => {
                self.deliver(message);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = ?e, "failed to read message");
                // keep a broken transport from spinning the loop
                thread::sleep(self.poll_timeout);
                false
            }
        }
    }

    fn deliver(&mut self, message: Message) {
        tracing::trace!(topic = %message.topic, "message received");

        let for_sinks = (!self.sinks.is_empty()).then(|| message.clone());
        if self.queue.send(message).is_err() {
            tracing::debug!("message queue closed, dropping message");
        }

        if let Some(message) = for_sinks {
            for sink in &mut self.sinks {
                if let Err(e) = sink.record(&message) {
                    tracing::error!(error = ?e, topic = %message.topic, "message sink failed");
                }
            }
        }
    }

    /// Poll until the running flag is cleared.
    pub fn run(mut self) {
        tracing::info!("ingestion started");
        while self.running.load(Ordering::Acquire) {
            self.poll_once();
        }
        tracing::info!("ingestion stopped");
    }

    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("mqtt-ingest".to_string())
            .spawn(move || self.run())
    }
}
