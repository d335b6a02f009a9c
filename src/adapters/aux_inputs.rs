//! Auxiliary analog inputs on the on-chip 12-bit ADC.
//!
//! Lead-acid battery voltage, battery current (hall sensor), and the two
//! bilge pump sense lines, all behind a 4k7-1k divider on ADC1 pins.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: one-shot ADC1 reads at 12-bit width and 11dB attenuation.
//! On host/test: per-channel static atomics with `sim_set_*` hooks.

use crate::ports::{AdcError, AuxChannel, AuxInputs};

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
fn adc1_channel(channel: AuxChannel) -> adc1_channel_t {
    // GPIO → ADC1 channel mapping on the classic ESP32.
    match channel {
        AuxChannel::PortPump => adc1_channel_t_ADC1_CHANNEL_0, // GPIO 36
        AuxChannel::StarboardPump => adc1_channel_t_ADC1_CHANNEL_3, // GPIO 39
        AuxChannel::BatteryVoltage => adc1_channel_t_ADC1_CHANNEL_6, // GPIO 34
        AuxChannel::BatteryCurrent => adc1_channel_t_ADC1_CHANNEL_7, // GPIO 35
    }
}

#[cfg(target_os = "espidf")]
pub struct Esp32AuxInputs {
    _private: (),
}

#[cfg(target_os = "espidf")]
impl Esp32AuxInputs {
    pub fn new() -> Result<Self, AdcError> {
        // SAFETY: one-time ADC1 configuration before any task reads it.
        unsafe {
            if adc1_config_width(adc_bits_width_t_ADC_WIDTH_BIT_12) != ESP_OK {
                return Err(AdcError::Bus);
            }
            for channel in [
                AuxChannel::PortPump,
                AuxChannel::StarboardPump,
                AuxChannel::BatteryVoltage,
                AuxChannel::BatteryCurrent,
            ] {
                if adc1_config_channel_atten(adc1_channel(channel), adc_atten_t_ADC_ATTEN_DB_11)
                    != ESP_OK
                {
                    return Err(AdcError::Bus);
                }
            }
        }
        Ok(Self { _private: () })
    }
}

#[cfg(target_os = "espidf")]
impl AuxInputs for Esp32AuxInputs {
    fn read_raw(&mut self, channel: AuxChannel) -> Result<u16, AdcError> {
        // SAFETY: channel is a configured ADC1 channel.
        let raw = unsafe { adc1_get_raw(adc1_channel(channel)) };
        if raw < 0 {
            return Err(AdcError::Bus);
        }
        Ok(raw as u16)
    }
}

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_RAW: [AtomicU16; 4] = [
    AtomicU16::new(0),
    AtomicU16::new(0),
    AtomicU16::new(0),
    AtomicU16::new(0),
];

#[cfg(not(target_os = "espidf"))]
fn sim_index(channel: AuxChannel) -> usize {
    match channel {
        AuxChannel::BatteryVoltage => 0,
        AuxChannel::BatteryCurrent => 1,
        AuxChannel::PortPump => 2,
        AuxChannel::StarboardPump => 3,
    }
}

/// Inject a raw 12-bit code for one auxiliary channel.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_aux_raw(channel: AuxChannel, raw: u16) {
    SIM_RAW[sim_index(channel)].store(raw, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct SimAuxInputs;

#[cfg(not(target_os = "espidf"))]
impl SimAuxInputs {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(target_os = "espidf"))]
impl AuxInputs for SimAuxInputs {
    fn read_raw(&mut self, channel: AuxChannel) -> Result<u16, AdcError> {
        Ok(SIM_RAW[sim_index(channel)].load(Ordering::Relaxed))
    }
}

/// The auxiliary input backend for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultAuxInputs = Esp32AuxInputs;
#[cfg(not(target_os = "espidf"))]
pub type DefaultAuxInputs = SimAuxInputs;

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn channels_are_independent() {
        sim_set_aux_raw(AuxChannel::BatteryVoltage, 2048);
        sim_set_aux_raw(AuxChannel::PortPump, 4095);
        let mut inputs = SimAuxInputs::new();
        assert_eq!(inputs.read_raw(AuxChannel::BatteryVoltage), Ok(2048));
        assert_eq!(inputs.read_raw(AuxChannel::PortPump), Ok(4095));
        assert_eq!(inputs.read_raw(AuxChannel::StarboardPump), Ok(0));
    }
}
