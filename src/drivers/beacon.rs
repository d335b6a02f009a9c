//! Status beacon engine.
//!
//! Generates the LED and buzzer levels for the status beacon. The beacon
//! task calls [`tick`](BeaconEngine::tick) each poll cycle with the elapsed
//! time and writes the returned levels to the hardware, so the timing logic
//! is fully deterministic and host-testable.
//!
//! | state | behaviour |
//! |-------|-----------|
//! | Slow / Medium / Fast | symmetric on/off square wave at the rate's half-period |
//! | Pulse | one-shot burst of four 50ms-on/50ms-off flashes, then the previous steady rate resumes |
//!
//! The audible pattern steps one bit per LED toggle and only sounds while
//! the Fast state is active — Fast doubles as the "attention required"
//! state during ADC probing, network association, and calibration.

use crate::commands::BlinkRate;

/// Rhythm pattern cycled by the buzzer, one step per LED toggle.
const BUZZER_PATTERN: [u8; 8] = [1, 0, 1, 0, 1, 1, 0, 0];

/// Pulse burst: four flashes of 50ms on, 50ms off.
const PULSE_HALF_PERIOD_MS: u32 = 50;
const PULSE_TOGGLES: u8 = 8;

/// Output levels for one beacon cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconOutput {
    pub led_on: bool,
    pub buzzer_on: bool,
}

/// Deterministic beacon state machine. Stack-allocated, no heap.
pub struct BeaconEngine {
    steady: BlinkRate,
    led_on: bool,
    buzzer_on: bool,
    phase_ms: u32,
    buzzer_step: u8,
    /// Toggles left in an active pulse burst.
    pulse_remaining: u8,
}

impl Default for BeaconEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BeaconEngine {
    pub fn new() -> Self {
        Self {
            steady: BlinkRate::Slow,
            led_on: false,
            buzzer_on: false,
            phase_ms: 0,
            buzzer_step: 0,
            pulse_remaining: 0,
        }
    }

    pub fn steady_rate(&self) -> BlinkRate {
        self.steady
    }

    /// Apply a mailbox command. `Pulse` starts a burst without disturbing
    /// the steady rate; any other rate becomes the new steady state.
    pub fn command(&mut self, rate: BlinkRate) {
        if rate == BlinkRate::Pulse {
            self.pulse_remaining = PULSE_TOGGLES;
            self.phase_ms = 0;
            self.led_on = true;
        } else {
            self.steady = rate;
        }
    }

    /// Advance by `delta_ms` and return the levels to drive.
    pub fn tick(&mut self, delta_ms: u32) -> BeaconOutput {
        self.phase_ms = self.phase_ms.saturating_add(delta_ms);

        if self.pulse_remaining > 0 {
            while self.pulse_remaining > 0 && self.phase_ms >= PULSE_HALF_PERIOD_MS {
                self.phase_ms -= PULSE_HALF_PERIOD_MS;
                self.led_on = !self.led_on;
                self.pulse_remaining -= 1;
            }
            if self.pulse_remaining == 0 {
                // Burst finished; steady blinking resumes from a clean phase.
                self.led_on = false;
                self.phase_ms = 0;
            }
        } else {
            let half_period = self.steady.period_ms();
            while self.phase_ms >= half_period {
                self.phase_ms -= half_period;
                self.toggle();
            }
        }

        BeaconOutput {
            led_on: self.led_on,
            buzzer_on: self.buzzer_on,
        }
    }

    fn toggle(&mut self) {
        self.led_on = !self.led_on;
        let step = usize::from(self.buzzer_step % BUZZER_PATTERN.len() as u8);
        self.buzzer_on = self.steady == BlinkRate::Fast && BUZZER_PATTERN[step] != 0;
        self.buzzer_step = self.buzzer_step.wrapping_add(1);
    }
}
