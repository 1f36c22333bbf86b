//! Display bands derived from instantaneous sensor values.
//!
//! The thresholds are fixed policy; every band is a pure function of a
//! single reading.

/// Comfort band of a temperature reading in °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureBand {
    /// Below 18.
    VeryCold,
    /// From 18 up to (not including) 25.
    Cold,
    /// From 25 to 30, both inclusive.
    Ideal,
    /// Above 30 up to 33 inclusive.
    Warm,
    /// Above 33.
    Hot,
}

impl TemperatureBand {
    pub fn classify(celsius: f64) -> Self {
        if celsius < 18.0 {
            TemperatureBand::VeryCold
        } else if celsius < 25.0 {
            TemperatureBand::Cold
        } else if celsius <= 30.0 {
            TemperatureBand::Ideal
        } else if celsius <= 33.0 {
            TemperatureBand::Warm
        } else {
            TemperatureBand::Hot
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TemperatureBand::VeryCold => "very-cold",
            TemperatureBand::Cold => "cold",
            TemperatureBand::Ideal => "ideal",
            TemperatureBand::Warm => "warm",
            TemperatureBand::Hot => "hot",
        }
    }

    pub fn status_text(&self) -> &'static str {
        match self {
            TemperatureBand::VeryCold => "Very cold: condensation risk, insulate or heat the area",
            TemperatureBand::Cold => "Cold: fine for storage, watch human comfort",
            TemperatureBand::Ideal => "Ideal: optimal for people and devices",
            TemperatureBand::Warm => "Warm: keep ventilation and airflow going",
            TemperatureBand::Hot => "Hot: overheating risk, turn on cooling now",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            TemperatureBand::VeryCold => "#0d47a1",
            TemperatureBand::Cold => "#2196f3",
            TemperatureBand::Ideal => "#43a047",
            TemperatureBand::Warm => "#ffb300",
            TemperatureBand::Hot => "#d32f2f",
        }
    }
}

/// Colour the node's indicator LED shows for a temperature.
///
/// Coarser than [`TemperatureBand`]: 25 and 30 are both yellow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorColor {
    Green,
    Yellow,
    Red,
}

impl IndicatorColor {
    pub fn classify(celsius: f64) -> Self {
        if celsius > 30.0 {
            IndicatorColor::Red
        } else if celsius >= 25.0 {
            IndicatorColor::Yellow
        } else {
            IndicatorColor::Green
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IndicatorColor::Green => "green",
            IndicatorColor::Yellow => "yellow",
            IndicatorColor::Red => "red",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            IndicatorColor::Green => "#43a047",
            IndicatorColor::Yellow => "#ffc107",
            IndicatorColor::Red => "#ff3b3f",
        }
    }
}

/// Relative humidity band in %.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumidityBand {
    Dry,
    Normal,
    Humid,
    VeryHumid,
}

impl HumidityBand {
    pub fn classify(percent: f64) -> Self {
        if percent < 30.0 {
            HumidityBand::Dry
        } else if percent < 60.0 {
            HumidityBand::Normal
        } else if percent < 80.0 {
            HumidityBand::Humid
        } else {
            HumidityBand::VeryHumid
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HumidityBand::Dry => "dry",
            HumidityBand::Normal => "normal",
            HumidityBand::Humid => "humid",
            HumidityBand::VeryHumid => "very-humid",
        }
    }

    pub fn status_text(&self) -> &'static str {
        match self {
            HumidityBand::Dry => "Humidity: dry, keep plants and air moist",
            HumidityBand::Normal => "Humidity: normal, comfortable",
            HumidityBand::Humid => "Humidity: humid, watch for condensation",
            HumidityBand::VeryHumid => "Humidity: very humid, mould and corrosion risk",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            HumidityBand::Dry => "#2196f3",
            HumidityBand::Normal => "#43a047",
            HumidityBand::Humid => "#ff9800",
            HumidityBand::VeryHumid => "#d32f2f",
        }
    }
}

/// Barometric pressure band in hPa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureBand {
    Low,
    SlightlyLow,
    NormalHigh,
    VeryHigh,
}

impl PressureBand {
    pub fn classify(hpa: f64) -> Self {
        if hpa < 1000.0 {
            PressureBand::Low
        } else if hpa < 1020.0 {
            PressureBand::SlightlyLow
        } else if hpa < 1040.0 {
            PressureBand::NormalHigh
        } else {
            PressureBand::VeryHigh
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PressureBand::Low => "low",
            PressureBand::SlightlyLow => "slightly-low",
            PressureBand::NormalHigh => "normal-high",
            PressureBand::VeryHigh => "very-high",
        }
    }

    pub fn status_text(&self) -> &'static str {
        match self {
            PressureBand::Low => "Pressure: low, likely cloudy or bad weather",
            PressureBand::SlightlyLow => "Pressure: slightly low, changeable",
            PressureBand::NormalHigh => "Pressure: normal/high, tending clear",
            PressureBand::VeryHigh => "Pressure: very high, very stable and clear",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PressureBand::Low => "#1976d2",
            PressureBand::SlightlyLow => "#4caf50",
            PressureBand::NormalHigh => "#ffb300",
            PressureBand::VeryHigh => "#d32f2f",
        }
    }
}
