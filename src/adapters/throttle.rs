//! Throttle DAC output adapter.
//!
//! The motor controller takes a 0-5V command signal from an external
//! amplifier fed by DAC channel 1. On host/test the last written code is
//! readable through `sim_throttle_code`.

use crate::ports::{DacError, ThrottleDac};

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU8, Ordering};

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_svc::sys::*;

    pub struct Esp32ThrottleDac {
        _private: (),
    }

    impl Esp32ThrottleDac {
        pub fn new() -> Result<Self, DacError> {
            // SAFETY: one-time DAC channel enable for the throttle pin.
            unsafe {
                if dac_output_enable(dac_channel_t_DAC_CHANNEL_1) != ESP_OK {
                    return Err(DacError::Hardware);
                }
                if dac_output_voltage(dac_channel_t_DAC_CHANNEL_1, 0) != ESP_OK {
                    return Err(DacError::Hardware);
                }
            }
            Ok(Self { _private: () })
        }
    }

    impl ThrottleDac for Esp32ThrottleDac {
        fn write_code(&mut self, code: u8) -> Result<(), DacError> {
            // SAFETY: channel was enabled in new().
            let ret = unsafe { dac_output_voltage(dac_channel_t_DAC_CHANNEL_1, code) };
            if ret != ESP_OK {
                return Err(DacError::Hardware);
            }
            Ok(())
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::Esp32ThrottleDac;

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_CODE: AtomicU8 = AtomicU8::new(0);

/// Last DAC code written by the encoder task.
#[cfg(not(target_os = "espidf"))]
pub fn sim_throttle_code() -> u8 {
    SIM_CODE.load(Ordering::Relaxed)
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct SimThrottleDac;

#[cfg(not(target_os = "espidf"))]
impl SimThrottleDac {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(target_os = "espidf"))]
impl ThrottleDac for SimThrottleDac {
    fn write_code(&mut self, code: u8) -> Result<(), DacError> {
        SIM_CODE.store(code, Ordering::Relaxed);
        Ok(())
    }
}

/// The throttle DAC for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultThrottleDac = Esp32ThrottleDac;
#[cfg(not(target_os = "espidf"))]
pub type DefaultThrottleDac = SimThrottleDac;
