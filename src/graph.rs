//! Plot geometry computed from a history snapshot.
//!
//! The redraw loop turns a [`HistorySnapshot`] into a [`GraphFrame`]; the
//! surface only has to draw what the frame describes.

use crate::band::IndicatorColor;
use crate::message::Metric;
use crate::store::HistorySnapshot;

/// Minimum width of the temperature x axis, in samples.
const MIN_TEMPERATURE_SPAN: usize = 10;
/// Padding around the temperature data on the y axis, in °C.
const TEMPERATURE_Y_PAD: f64 = 2.0;
const TEMPERATURE_Y_FALLBACK: (f64, f64) = (15.0, 45.0);
const HUMIDITY_Y_RANGE: (f64, f64) = (40.0, 100.0);
/// Roughly how many time labels the humidity axis gets.
const HUMIDITY_TICK_TARGET: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    pub x: usize,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemperaturePlot {
    /// Each point with the indicator colour of its value.
    pub points: Vec<(PlotPoint, IndicatorColor)>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisTick {
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HumidityPlot {
    pub points: Vec<PlotPoint>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub ticks: Vec<AxisTick>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphFrame {
    pub temperature: TemperaturePlot,
    pub humidity: HumidityPlot,
}

impl GraphFrame {
    pub fn build(snapshot: &HistorySnapshot) -> Self {
        GraphFrame {
            temperature: temperature_plot(snapshot.get(Metric::Temperature.as_str())),
            humidity: humidity_plot(
                snapshot.get(Metric::Humidity.as_str()),
                &snapshot.timestamps,
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.points.is_empty() && self.humidity.points.is_empty()
    }
}

fn temperature_plot(samples: &[f64]) -> TemperaturePlot {
    let points = samples
        .iter()
        .enumerate()
        .map(|(x, &y)| (PlotPoint { x, y }, IndicatorColor::classify(y)))
        .collect();

    let y_range = min_max(samples)
        .map(|(lo, hi)| (lo - TEMPERATURE_Y_PAD, hi + TEMPERATURE_Y_PAD))
        .unwrap_or(TEMPERATURE_Y_FALLBACK);

    TemperaturePlot {
        points,
        x_range: (0.0, samples.len().max(MIN_TEMPERATURE_SPAN) as f64),
        y_range,
    }
}

fn humidity_plot(samples: &[f64], timestamps: &[String]) -> HumidityPlot {
    let points: Vec<PlotPoint> = samples
        .iter()
        .enumerate()
        .map(|(x, &y)| PlotPoint { x, y })
        .collect();

    let x_range = if samples.is_empty() {
        (0.0, 1.0)
    } else {
        (-0.5, samples.len() as f64 - 0.5)
    };

    HumidityPlot {
        points,
        x_range,
        y_range: HUMIDITY_Y_RANGE,
        ticks: time_ticks(samples.len(), timestamps),
    }
}

/// Pick at most about six evenly spaced labels plus the final sample.
///
/// The time buffer may be shorter than the sample buffer; samples past its
/// end are labelled by their index.
pub fn time_ticks(count: usize, timestamps: &[String]) -> Vec<AxisTick> {
    if count == 0 {
        return Vec::new();
    }

    let step = (count / HUMIDITY_TICK_TARGET).max(1);
    let mut indices: Vec<usize> = (0..count).step_by(step).collect();
    if indices.last() != Some(&(count - 1)) {
        indices.push(count - 1);
    }

    indices
        .into_iter()
        .map(|index| AxisTick {
            index,
            label: timestamps
                .get(index)
                .cloned()
                .unwrap_or_else(|| index.to_string()),
        })
        .collect()
}

fn min_max(samples: &[f64]) -> Option<(f64, f64)> {
    samples.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RollingSampleStore;

    fn stamps(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("10:00:{:02}", i)).collect()
    }

    #[test]
    fn empty_history_renders_nothing() {
        let frame = GraphFrame::build(&RollingSampleStore::default().snapshot());
        assert!(frame.is_empty());
        assert_eq!(frame.temperature.x_range, (0.0, 10.0));
        assert_eq!(frame.temperature.y_range, (15.0, 45.0));
        assert_eq!(frame.humidity.x_range, (0.0, 1.0));
        assert!(frame.humidity.ticks.is_empty());
    }

    #[test]
    fn temperature_axis_tracks_data() {
        let mut store = RollingSampleStore::default();
        for t in [20.0, 31.0, 27.0] {
            store.append("temperature", t);
        }
        let plot = GraphFrame::build(&store.snapshot()).temperature;

        assert_eq!(plot.x_range, (0.0, 10.0));
        assert_eq!(plot.y_range, (18.0, 33.0));
        let colors: Vec<_> = plot.points.iter().map(|(_, c)| *c).collect();
        assert_eq!(
            colors,
            vec![IndicatorColor::Green, IndicatorColor::Red, IndicatorColor::Yellow]
        );
    }

    #[test]
    fn temperature_axis_widens_past_ten_samples() {
        let mut store = RollingSampleStore::default();
        for i in 0..14 {
            store.append("temperature", 20.0 + i as f64);
        }
        assert_eq!(GraphFrame::build(&store.snapshot()).temperature.x_range, (0.0, 14.0));
    }

    #[test]
    fn ticks_are_subsampled_with_final_label() {
        let ticks = time_ticks(20, &stamps(20));
        let indices: Vec<usize> = ticks.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 3, 6, 9, 12, 15, 18, 19]);
        assert_eq!(ticks.last().map(|t| t.label.as_str()), Some("10:00:19"));
    }

    #[test]
    fn ticks_fall_back_to_index_labels() {
        let ticks = time_ticks(4, &stamps(2));
        let labels: Vec<&str> = ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["10:00:00", "10:00:01", "2", "3"]);
    }
}
