//! Throttle rotary encoder adapter.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: polls the quadrature clock/data pins and counts detents on
//! the clock's falling edge; the encoder's power pin is driven high at
//! init. The encoder task polls every few milliseconds, far faster than a
//! hand can turn the knob, so polled decoding loses no steps.
//!
//! On host/test: an atomic step accumulator with a `sim_turn_encoder`
//! hook.

use crate::ports::RotaryEncoder;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicI32, Ordering};

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_hal::gpio::{AnyIOPin, Input, Output, PinDriver};

    pub struct Esp32Encoder {
        clock: PinDriver<'static, AnyIOPin, Input>,
        data: PinDriver<'static, AnyIOPin, Input>,
        _power: PinDriver<'static, AnyIOPin, Output>,
        last_clock_high: bool,
    }

    impl Esp32Encoder {
        pub fn new(
            clock_pin: AnyIOPin,
            data_pin: AnyIOPin,
            power_pin: AnyIOPin,
        ) -> anyhow::Result<Self> {
            let mut power = PinDriver::output(power_pin)?;
            power.set_high()?;
            let clock = PinDriver::input(clock_pin)?;
            let data = PinDriver::input(data_pin)?;
            let last_clock_high = clock.is_high();
            Ok(Self {
                clock,
                data,
                _power: power,
                last_clock_high,
            })
        }
    }

    impl RotaryEncoder for Esp32Encoder {
        fn delta(&mut self) -> i32 {
            let clock_high = self.clock.is_high();
            let mut delta = 0;
            if self.last_clock_high && !clock_high {
                // Falling clock edge; data level gives the direction.
                delta = if self.data.is_high() { 1 } else { -1 };
            }
            self.last_clock_high = clock_high;
            delta
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::Esp32Encoder;

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_STEPS: AtomicI32 = AtomicI32::new(0);

/// Turn the simulated knob by `steps` detents (negative = down).
#[cfg(not(target_os = "espidf"))]
pub fn sim_turn_encoder(steps: i32) {
    SIM_STEPS.fetch_add(steps, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct SimEncoder;

#[cfg(not(target_os = "espidf"))]
impl SimEncoder {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(target_os = "espidf"))]
impl RotaryEncoder for SimEncoder {
    fn delta(&mut self) -> i32 {
        SIM_STEPS.swap(0, Ordering::Relaxed)
    }
}

/// The encoder backend for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultEncoder = Esp32Encoder;
#[cfg(not(target_os = "espidf"))]
pub type DefaultEncoder = SimEncoder;
