//! Status beacon hardware adapter (LED + piezo buzzer).
//!
//! The buzzer hangs off DAC channel 2; "on" is a fixed mid-scale level
//! rather than full swing, which keeps the piezo audible without the
//! harshness of a square rail-to-rail drive.
//!
//! On host/test the levels land in atomics readable through `sim_*`
//! accessors.

use crate::ports::Indicator;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

/// DAC code written while the buzzer sounds.
#[cfg(target_os = "espidf")]
const BUZZER_ON_LEVEL: u8 = 150;

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
    use esp_idf_svc::sys::*;

    pub struct Esp32Indicator {
        led: PinDriver<'static, AnyOutputPin, Output>,
    }

    impl Esp32Indicator {
        pub fn new(led_pin: AnyOutputPin) -> anyhow::Result<Self> {
            // SAFETY: one-time DAC channel enable for the buzzer pin.
            unsafe {
                dac_output_enable(dac_channel_t_DAC_CHANNEL_2);
                dac_output_voltage(dac_channel_t_DAC_CHANNEL_2, 0);
            }
            Ok(Self {
                led: PinDriver::output(led_pin)?,
            })
        }
    }

    impl Indicator for Esp32Indicator {
        fn set_led(&mut self, on: bool) {
            let _ = if on {
                self.led.set_high()
            } else {
                self.led.set_low()
            };
        }

        fn set_buzzer(&mut self, on: bool) {
            let level = if on { BUZZER_ON_LEVEL } else { 0 };
            // SAFETY: channel was enabled in new().
            unsafe {
                dac_output_voltage(dac_channel_t_DAC_CHANNEL_2, level);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::Esp32Indicator;

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_LED: AtomicBool = AtomicBool::new(false);
#[cfg(not(target_os = "espidf"))]
static SIM_BUZZER: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_led_state() -> bool {
    SIM_LED.load(Ordering::Relaxed)
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_buzzer_state() -> bool {
    SIM_BUZZER.load(Ordering::Relaxed)
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct SimIndicator;

#[cfg(not(target_os = "espidf"))]
impl SimIndicator {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(target_os = "espidf"))]
impl Indicator for SimIndicator {
    fn set_led(&mut self, on: bool) {
        SIM_LED.store(on, Ordering::Relaxed);
    }

    fn set_buzzer(&mut self, on: bool) {
        SIM_BUZZER.store(on, Ordering::Relaxed);
    }
}

/// The beacon hardware for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultIndicator = Esp32Indicator;
#[cfg(not(target_os = "espidf"))]
pub type DefaultIndicator = SimIndicator;

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn levels_are_observable() {
        let mut indicator = SimIndicator::new();
        indicator.set_led(true);
        indicator.set_buzzer(true);
        assert!(sim_led_state());
        assert!(sim_buzzer_state());
        indicator.set_led(false);
        indicator.set_buzzer(false);
        assert!(!sim_led_state());
        assert!(!sim_buzzer_state());
    }
}
