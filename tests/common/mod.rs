//! Scripted transport and recording surface shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use iot_dashboard_rs::graph::GraphFrame;
use iot_dashboard_rs::message::Message;
use iot_dashboard_rs::mq::{self, Payload, Transport};
use iot_dashboard_rs::scheduler::{self, Task, TimerHandle, TimerQueue};
use iot_dashboard_rs::state::StatusView;
use iot_dashboard_rs::surface::{Surface, SurfaceEvent};
use serde_json::Value;

pub fn message(topic: &str, data: Value) -> Message {
    match data {
        Value::Object(map) => Message::new(topic, map),
        other => panic!("not an object: {other}"),
    }
}

/// What the next `get_message` call returns.
#[derive(Debug, Clone)]
pub enum Step {
    Deliver(Message),
    Fail,
}

/// A transport that plays back a script and records what was sent to it.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    connection: Mutex<VecDeque<bool>>,
    last_connection: Mutex<bool>,
    published: Mutex<Vec<(String, Payload)>>,
    fail_publish: bool,
    fail_disconnect: bool,
    disconnects: AtomicUsize,
    reads: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        ScriptedTransport::default()
    }

    pub fn with_steps<I: IntoIterator<Item = Step>>(self, steps: I) -> Self {
        self.steps.lock().unwrap().extend(steps);
        self
    }

    pub fn with_messages<I: IntoIterator<Item = Message>>(self, messages: I) -> Self {
        self.with_steps(messages.into_iter().map(Step::Deliver))
    }

    /// Successive `check_connection` results; the last one sticks.
    pub fn with_connection<I: IntoIterator<Item = bool>>(self, states: I) -> Self {
        self.connection.lock().unwrap().extend(states);
        self
    }

    pub fn failing_publish(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn published(&self) -> Vec<(String, Payload)> {
        self.published.lock().unwrap().clone()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn remaining_steps(&self) -> usize {
        self.steps.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn connect(&self) -> Result<(), mq::Error> {
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &Payload) -> Result<(), mq::Error> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.clone()));
        if self.fail_publish {
            return Err(mq::Error::ConnectionLost);
        }
        Ok(())
    }

    fn check_connection(&self) -> bool {
        let mut last = self.last_connection.lock().unwrap();
        if let Some(next) = self.connection.lock().unwrap().pop_front() {
            *last = next;
        }
        *last
    }

    fn get_message(&self, timeout: Duration) -> Result<Option<Message>, mq::Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Deliver(message)) => Ok(Some(message)),
            Some(Step::Fail) => Err(mq::Error::ConnectionLost),
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
                Ok(None)
            }
        }
    }

    fn disconnect(&self) -> Result<(), mq::Error> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(mq::Error::ConsumerClosed);
        }
        Ok(())
    }
}

/// A surface that records everything it is asked to do.
///
/// Timers are only recorded, never fired on their own; tests call the
/// tick methods directly or script events.
#[derive(Default)]
pub struct RecordingSurface {
    pub timers: TimerQueue,
    pub events: VecDeque<SurfaceEvent>,
    pub scheduled: Vec<Task>,
    pub cancelled: Vec<TimerHandle>,
    pub connection_changes: Vec<bool>,
    pub statuses: Vec<StatusView>,
    pub frames: Vec<GraphFrame>,
    pub closes: usize,
    /// Refuse new timers as if the window had been destroyed.
    pub gone: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        RecordingSurface::default()
    }

    pub fn with_events<I: IntoIterator<Item = SurfaceEvent>>(events: I) -> Self {
        RecordingSurface {
            events: events.into_iter().collect(),
            ..RecordingSurface::default()
        }
    }

    pub fn last_status(&self) -> &StatusView {
        self.statuses.last().expect("no status shown yet")
    }
}

impl Surface for RecordingSurface {
    fn schedule(&mut self, delay: Duration, task: Task) -> Result<TimerHandle, scheduler::Error> {
        if self.gone {
            return Err(scheduler::Error::SurfaceGone);
        }
        self.scheduled.push(task);
        self.timers.schedule(delay, task)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.cancelled.push(handle);
        self.timers.cancel(handle);
    }

    fn next_event(&mut self) -> Option<SurfaceEvent> {
        self.events.pop_front()
    }

    fn connection_changed(&mut self, connected: bool) {
        self.connection_changes.push(connected);
    }

    fn show_status(&mut self, view: &StatusView) {
        self.statuses.push(view.clone());
    }

    fn draw_graphs(&mut self, frame: &GraphFrame) {
        self.frames.push(frame.clone());
    }

    fn close(&mut self) {
        self.closes += 1;
        self.timers.close();
    }
}
