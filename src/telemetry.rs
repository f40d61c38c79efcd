use crate::protocol::TelemetryFrame;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Per-module readings as the display consumes them.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ModuleSummary {
    /// Degrees Celsius. The frame record carries the raw count; the
    /// scaled value is what reaches consumers.
    pub temperature: f32,
    /// Amperes.
    pub current: f32,
    /// Volts.
    pub voltage: f32,
}

/// Compact reduction of a decoded frame, re-created per decode.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TelemetrySummary {
    pub state_of_charge: f32,
    pub state_of_health: Option<u8>,
    pub modules: Vec<ModuleSummary>,
}

/// Reduces a decoded frame to the summary shape. Pure; keeps all seven
/// module records in frame order. Consumers with fewer display slots
/// decide for themselves what to drop.
pub fn project(frame: &TelemetryFrame) -> TelemetrySummary {
    TelemetrySummary {
        state_of_charge: frame.charging_info.battery_soc as f32,
        state_of_health: Some(frame.charging_info.battery_soh),
        modules: frame
            .power_modules
            .iter()
            .map(|module| ModuleSummary {
                temperature: module.ambient_temperature_raw as f32 / 10.0,
                current: module.current,
                voltage: module.voltage,
            })
            .collect(),
    }
}
