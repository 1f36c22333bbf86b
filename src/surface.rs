//! The rendering surface the dashboard draws on.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::graph::{GraphFrame, PlotPoint};
use crate::scheduler::{self, Task, TimerHandle, TimerQueue};
use crate::state::StatusView;

/// Something the surface wants the dashboard to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Timer(Task),
    /// The user pressed the LED toggle.
    ToggleLed,
    /// The user closed the window.
    CloseRequested,
}

/// A host for the dashboard: draws what it is given, runs timers on the UI
/// thread and reports user input.
///
/// `schedule` fails with [`scheduler::Error::SurfaceGone`] once the surface
/// has been torn down; the dashboard then stops re-arming that loop.
pub trait Surface {
    fn schedule(&mut self, delay: Duration, task: Task) -> Result<TimerHandle, scheduler::Error>;

    fn cancel(&mut self, handle: TimerHandle);

    /// Wait for the next timer or user event. `None` means the event loop is over.
    fn next_event(&mut self) -> Option<SurfaceEvent>;

    fn connection_changed(&mut self, connected: bool);

    fn show_status(&mut self, view: &StatusView);

    fn draw_graphs(&mut self, frame: &GraphFrame);

    /// Release the surface. Called once, at the end of shutdown.
    fn close(&mut self);
}

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A line-oriented surface for terminals.
///
/// Commands are read from stdin, one per line: `t` toggles the LED, `q`
/// quits.
pub struct TerminalSurface<W: Write> {
    out: W,
    timers: TimerQueue,
    input: Option<Receiver<SurfaceEvent>>,
    last_status: Option<StatusView>,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout(title: &str) -> Self {
        let mut surface = TerminalSurface::new(io::stdout());
        surface.emit(format_args!("== {} ==  (t: toggle LED, q: quit)", title));
        surface
    }

    /// Start a thread that turns stdin lines into events.
    pub fn with_stdin_commands(mut self) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::Builder::new()
            .name("stdin-commands".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    let event = match line.trim() {
                        "t" | "toggle" => SurfaceEvent::ToggleLed,
                        "q" | "quit" => SurfaceEvent::CloseRequested,
                        "" => continue,
                        other => {
                            tracing::warn!(command = other, "unknown command");
                            continue;
                        }
                    };
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            })?;

        self.input = Some(rx);
        Ok(self)
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        TerminalSurface {
            out,
            timers: TimerQueue::new(),
            input: None,
            last_status: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            tracing::warn!(error = ?e, "failed to write to terminal");
        }
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn schedule(&mut self, delay: Duration, task: Task) -> Result<TimerHandle, scheduler::Error> {
        self.timers.schedule(delay, task)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.cancel(handle);
    }

    fn next_event(&mut self) -> Option<SurfaceEvent> {
        loop {
            if self.timers.is_closed() {
                return None;
            }

            let Some(input) = &self.input else {
                return self.timers.wait_next().map(SurfaceEvent::Timer);
            };

            let received = match self.timers.next_deadline() {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    input.recv_timeout(timeout)
                }
                None => input.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(event) => return Some(event),
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(task) = self.timers.pop_due(Instant::now()) {
                        return Some(SurfaceEvent::Timer(task));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // stdin is gone; keep running on timers alone
                    self.input = None;
                }
            }
        }
    }

    fn connection_changed(&mut self, connected: bool) {
        let text = if connected { "● Connected" } else { "● Disconnected" };
        self.emit(format_args!("[status] {}", text));
    }

    fn show_status(&mut self, view: &StatusView) {
        if self.last_status.as_ref() == Some(view) {
            return;
        }

        self.emit(format_args!(
            "{} | {} {} | {} | {} | LED {} [{}] | {} | {} | {}",
            view.connection,
            view.temperature,
            view.temperature_status.map_or("", |(text, _)| text),
            view.humidity,
            view.pressure,
            view.led,
            view.led_button,
            view.indicator,
            view.last_update,
            view.message_count,
        ));
        self.last_status = Some(view.clone());
    }

    fn draw_graphs(&mut self, frame: &GraphFrame) {
        if frame.is_empty() {
            return;
        }

        let temperature: Vec<PlotPoint> = frame.temperature.points.iter().map(|(p, _)| *p).collect();
        let (t_lo, t_hi) = frame.temperature.y_range;
        let (h_lo, h_hi) = frame.humidity.y_range;
        let first = frame.humidity.ticks.first().map_or("", |t| t.label.as_str());
        let last = frame.humidity.ticks.last().map_or("", |t| t.label.as_str());

        self.emit(format_args!(
            "[temp {:.1}..{:.1}] {}",
            t_lo,
            t_hi,
            sparkline(&temperature, frame.temperature.y_range)
        ));
        self.emit(format_args!(
            "[hum  {:.0}..{:.0}] {}  ({} .. {})",
            h_lo,
            h_hi,
            sparkline(&frame.humidity.points, frame.humidity.y_range),
            first,
            last
        ));
    }

    fn close(&mut self) {
        self.timers.close();
        self.input = None;
        self.emit(format_args!("[status] dashboard closed"));
        if let Err(e) = self.out.flush() {
            tracing::warn!(error = ?e, "failed to flush terminal");
        }
    }
}

fn sparkline(points: &[PlotPoint], (lo, hi): (f64, f64)) -> String {
    let span = (hi - lo).max(f64::EPSILON);
    points
        .iter()
        .map(|p| {
            let level = ((p.y - lo) / span * (SPARK.len() - 1) as f64).round();
            SPARK[level.clamp(0.0, (SPARK.len() - 1) as f64) as usize]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DashboardState;

    #[test]
    fn repeated_status_is_printed_once() {
        let mut surface = TerminalSurface::new(Vec::new());
        let view = DashboardState::new().status_view("broker:1883");
        surface.show_status(&view);
        surface.show_status(&view);

        let out = String::from_utf8(surface.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("Messages received: 0"));
    }

    #[test]
    fn closed_surface_ends_event_loop() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.schedule(Duration::from_secs(60), Task::Refresh).unwrap();
        surface.close();

        assert_eq!(surface.next_event(), None);
        assert!(surface.schedule(Duration::ZERO, Task::Redraw).is_err());
    }

    #[test]
    fn sparkline_spans_the_range() {
        let points = [0.0, 5.0, 10.0].map(|y| PlotPoint { x: 0, y });
        assert_eq!(sparkline(&points, (0.0, 10.0)), "▁▅█");
    }
}
