//! Sensor readings carried in RequestSensorData replies
//!
//! Raw values come from the unit's 10-bit ADC (3.3 V reference) and from
//! the soil-moisture timer. Sampling itself happens on the device; this
//! module converts the raw numbers and packs them into a reply payload:
//!
//! ```text
//! [battery %][temperature °C, signed][light %][moisture count: u16 BE]
//! ```

use serde::{Deserialize, Serialize};

/// ADC reference voltage (volts)
pub const ADC_REFERENCE_V: f64 = 3.3;

/// Full-scale count of the 10-bit ADC
pub const ADC_FULL_SCALE: f64 = 1024.0;

/// Battery sense divider: low-side / (high-side + low-side) resistance
const BATTERY_DIVIDER_RATIO: f64 = 120_217.0 / (389_735.0 + 120_217.0);

/// LDR voltage below which the cell is considered fully dark
const LDR_DARK_V: f64 = 0.074;

/// LDR voltage above which the cell is considered fully lit
const LDR_BRIGHT_V: f64 = 1.931;

/// Bytes in an encoded [`SensorReadings`] payload
pub const READINGS_PAYLOAD_LEN: usize = 5;

pub fn adc_to_volts(raw: u16) -> f64 {
    raw as f64 * ADC_REFERENCE_V / ADC_FULL_SCALE
}

/// Remaining battery charge, clamped to 0..=100
pub fn battery_percent(raw: u16) -> f64 {
    let cell_volts = adc_to_volts(raw) / BATTERY_DIVIDER_RATIO;
    (18.182 * cell_volts - 118.18).clamp(0.0, 100.0)
}

/// Sensor temperature in °C (10 mV/K sensor)
pub fn temperature_c(raw: u16) -> f64 {
    adc_to_volts(raw) * 100.0 - 273.0
}

/// Ambient light from the LDR divider, 0..=100
pub fn light_percent(raw: u16) -> u8 {
    let v = adc_to_volts(raw);
    if v <= LDR_DARK_V {
        0
    } else if v >= LDR_BRIGHT_V {
        100
    } else {
        let percent = 24.516 * v.powi(3) - 36.362 * v.powi(2) + 32.111 * v + 4.2014;
        percent.clamp(0.0, 100.0) as u8
    }
}

/// One round of raw samples from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawSample {
    pub battery_adc: u16,
    pub temperature_adc: u16,
    pub light_adc: u16,
    /// Pulses counted from the moisture probe over the sampling window
    pub moisture_count: u16,
}

/// Converted readings as they travel in a reply frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReadings {
    pub battery_percent: u8,
    pub temperature_c: i8,
    pub light_percent: u8,
    pub moisture_count: u16,
}

impl SensorReadings {
    pub fn from_raw(sample: &RawSample) -> Self {
        let temperature = temperature_c(sample.temperature_adc)
            .clamp(i8::MIN as f64, i8::MAX as f64);

        Self {
            battery_percent: battery_percent(sample.battery_adc) as u8,
            temperature_c: temperature as i8,
            light_percent: light_percent(sample.light_adc),
            moisture_count: sample.moisture_count,
        }
    }

    pub fn to_payload(&self) -> [u8; READINGS_PAYLOAD_LEN] {
        let moisture = self.moisture_count.to_be_bytes();
        [
            self.battery_percent,
            self.temperature_c as u8,
            self.light_percent,
            moisture[0],
            moisture[1],
        ]
    }

    /// Parse a reply payload; `None` if it is too short
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() < READINGS_PAYLOAD_LEN {
            return None;
        }

        Some(Self {
            battery_percent: payload[0],
            temperature_c: payload[1] as i8,
            light_percent: payload[2],
            moisture_count: u16::from_be_bytes([payload[3], payload[4]]),
        })
    }
}
