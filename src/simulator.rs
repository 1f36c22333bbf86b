//! Simulated indoor sensor readings for exercising the dashboard without
//! hardware.

use serde_json::{json, Value};

use crate::config::SimulatorConfig;

/// Minimal xorshift64* generator. Not cryptographically secure; only used
/// for sensor noise.
#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // a zero state would stay zero forever
        let seed = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Prng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in `(0, 1]`.
    fn next_unit(&mut self) -> f64 {
        ((self.next_u64() >> 11) as f64 + 1.0) / (1u64 << 53) as f64
    }

    /// Normal sample with mean 0 (Box-Muller).
    pub fn gauss(&mut self, sigma: f64) -> f64 {
        let u1 = self.next_unit();
        let u2 = self.next_unit();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos() * sigma
    }
}

/// A value that drifts with small Gaussian noise while being pulled back
/// towards its baseline.
#[derive(Debug, Clone)]
pub struct StableSensorSimulator {
    baseline: f64,
    value: f64,
    sigma: f64,
    /// 0..1, how strongly each step pulls back to the baseline.
    inertia: f64,
    clamp: Option<(f64, f64)>,
}

impl StableSensorSimulator {
    pub fn new(baseline: f64, sigma: f64, inertia: f64, clamp: Option<(f64, f64)>) -> Self {
        StableSensorSimulator {
            baseline,
            value: baseline,
            sigma,
            inertia,
            clamp,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn step(&mut self, rng: &mut Prng) -> f64 {
        let pull = (self.baseline - self.value) * self.inertia;
        self.value += pull + rng.gauss(self.sigma);
        if let Some((lo, hi)) = self.clamp {
            self.value = self.value.clamp(lo, hi);
        }
        self.value
    }
}

/// The three sensors the node reports, with indoor-looking defaults.
#[derive(Debug, Clone)]
pub struct SensorNode {
    temperature: StableSensorSimulator,
    humidity: StableSensorSimulator,
    pressure: StableSensorSimulator,
    rng: Prng,
}

impl SensorNode {
    pub fn new(baselines: &SimulatorConfig, seed: u64) -> Self {
        SensorNode {
            temperature: StableSensorSimulator::new(baselines.temperature, 0.15, 0.08, Some((10.0, 40.0))),
            humidity: StableSensorSimulator::new(baselines.humidity, 0.6, 0.06, Some((10.0, 100.0))),
            pressure: StableSensorSimulator::new(baselines.pressure, 0.4, 0.02, Some((950.0, 1050.0))),
            rng: Prng::new(seed),
        }
    }

    /// Advance every sensor and build the payload the node would publish.
    pub fn next_reading(&mut self, unix_time: i64) -> Value {
        let temperature = round1(self.temperature.step(&mut self.rng));
        let humidity = round1(self.humidity.step(&mut self.rng));
        let pressure = round1(self.pressure.step(&mut self.rng));

        json!({
            "temperature": temperature,
            "humidity": humidity,
            "pressure": pressure,
            "timestamp": unix_time,
        })
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Prng::new(7);
        let mut b = Prng::new(7);
        for _ in 0..10 {
            assert_eq!(a.gauss(1.0), b.gauss(1.0));
        }
    }

    #[test]
    fn stays_within_clamp() {
        let mut rng = Prng::new(42);
        let mut sim = StableSensorSimulator::new(24.0, 5.0, 0.0, Some((10.0, 40.0)));
        for _ in 0..1000 {
            let v = sim.step(&mut rng);
            assert!((10.0..=40.0).contains(&v));
        }
    }

    #[test]
    fn drifts_around_baseline() {
        let mut rng = Prng::new(3);
        let mut sim = StableSensorSimulator::new(50.0, 0.6, 0.06, None);
        let mean = (0..2000).map(|_| sim.step(&mut rng)).sum::<f64>() / 2000.0;
        assert!((mean - 50.0).abs() < 3.0, "mean {mean}");
    }

    #[test]
    fn reading_has_all_fields() {
        let mut node = SensorNode::new(&SimulatorConfig::default(), 1);
        let reading = node.next_reading(1_700_000_000);
        for key in ["temperature", "humidity", "pressure", "timestamp"] {
            assert!(reading.get(key).is_some(), "missing {key}");
        }
    }
}
