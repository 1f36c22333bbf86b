mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{message, ScriptedTransport, Step};
use crossbeam_channel::Receiver;
use iot_dashboard_rs::ingest::IngestLoop;
use iot_dashboard_rs::message::Message;
use iot_dashboard_rs::recorder::{self, MessageLogger, MessageSink};
use serde_json::json;

struct Harness {
    ingest: IngestLoop<ScriptedTransport>,
    queue: Receiver<Message>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

fn harness(transport: &Arc<ScriptedTransport>) -> Harness {
    let (tx, rx) = crossbeam_channel::unbounded();
    let connected = Arc::new(AtomicBool::new(false));
    let running = Arc::new(AtomicBool::new(true));
    let ingest = IngestLoop::new(
        Arc::clone(transport),
        tx,
        Arc::clone(&connected),
        Arc::clone(&running),
        Duration::from_millis(1),
    );
    Harness {
        ingest,
        queue: rx,
        connected,
        running,
    }
}

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<Message>>>);

impl MessageSink for Collect {
    fn record(&mut self, message: &Message) -> Result<(), recorder::Error> {
        self.0.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct Broken;

impl MessageSink for Broken {
    fn record(&mut self, _message: &Message) -> Result<(), recorder::Error> {
        Err(std::io::Error::other("disk full").into())
    }
}

#[test]
fn read_errors_do_not_stop_ingestion() {
    let transport = Arc::new(ScriptedTransport::new().with_steps([
        Step::Fail,
        Step::Deliver(message("sensor/data", json!({ "temperature": 24.0 }))),
        Step::Fail,
        Step::Deliver(message("sensor/data", json!({ "temperature": 25.0 }))),
    ]));
    let mut h = harness(&transport);

    let queued: Vec<bool> = (0..4).map(|_| h.ingest.poll_once()).collect();

    assert_eq!(queued, vec![false, true, false, true]);
    let received: Vec<Message> = h.queue.try_iter().collect();
    assert_eq!(received.len(), 2);
    assert_eq!(received[1].data["temperature"], json!(25.0));
}

#[test]
fn connection_flag_follows_transport() {
    let transport = Arc::new(ScriptedTransport::new().with_connection([true, false]));
    let mut h = harness(&transport);

    h.ingest.poll_once();
    assert!(h.connected.load(Ordering::Acquire));
    h.ingest.poll_once();
    assert!(!h.connected.load(Ordering::Acquire));
}

#[test]
fn sinks_see_every_message_and_failures_do_not_block_the_queue() {
    let transport = Arc::new(ScriptedTransport::new().with_messages([
        message("sensor/data", json!({ "humidity": 40.0 })),
        message("sensor/led", json!({ "led_status": "ON" })),
    ]));
    let mut h = harness(&transport);
    let collected = Collect::default();
    h.ingest.add_sink(Box::new(Broken));
    h.ingest.add_sink(Box::new(collected.clone()));

    h.ingest.poll_once();
    h.ingest.poll_once();

    assert_eq!(h.queue.try_iter().count(), 2);
    let seen = collected.0.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].topic, "sensor/led");
}

#[test]
fn logger_sink_persists_ingested_messages() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new().with_messages([message("sensor/esp32/data", json!({ "pressure": 1008.5 }))]),
    );
    let mut h = harness(&transport);
    h.ingest.add_sink(Box::new(MessageLogger::new(dir.path()).unwrap()));

    h.ingest.poll_once();

    let logger = MessageLogger::new(dir.path()).unwrap();
    let records = logger.read_logs("sensor/esp32/data", None).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data, json!({ "pressure": 1008.5 }));
}

#[test]
fn run_returns_once_running_is_cleared() {
    let transport = Arc::new(
        ScriptedTransport::new().with_messages([message("sensor/data", json!({ "temperature": 20.0 }))]),
    );
    let h = harness(&transport);
    let running = Arc::clone(&h.running);
    let handle = h.ingest.spawn().unwrap();

    let first = h.queue.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first.data["temperature"], json!(20.0));

    running.store(false, Ordering::Release);
    handle.join().unwrap();
    assert_eq!(transport.remaining_steps(), 0);
}
