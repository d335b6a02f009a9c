//! Instrumentation ADC adapter (ADS1115 behind [`InstrumentationAdc`]).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the real converter over the I²C master at the pins
//! in [`crate::pins`]. On host/test: reads per-channel voltages from
//! static atomics with `sim_set_*` injection hooks, and init succeeds at
//! the first probed address.

use crate::ports::{AdcError, InstrumentationAdc, InstrumentationChannel};

#[cfg(target_os = "espidf")]
use crate::drivers::ads1115::Ads1115;
#[cfg(target_os = "espidf")]
use esp_idf_hal::i2c::I2cDriver;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
pub struct Esp32InstrumentationAdc {
    adc: Option<Ads1115<I2cDriver<'static>>>,
    i2c: Option<I2cDriver<'static>>,
}

#[cfg(target_os = "espidf")]
impl Esp32InstrumentationAdc {
    pub fn new(i2c: I2cDriver<'static>) -> Self {
        Self {
            adc: None,
            i2c: Some(i2c),
        }
    }
}

#[cfg(target_os = "espidf")]
impl InstrumentationAdc for Esp32InstrumentationAdc {
    fn init(&mut self, address: u8) -> Result<(), AdcError> {
        let i2c = match self.i2c.take() {
            Some(i2c) => i2c,
            None => match self.adc.take() {
                Some(adc) => adc.release(),
                None => return Err(AdcError::Bus),
            },
        };
        let mut adc = Ads1115::new(i2c, address);
        match adc.probe() {
            Ok(()) => {
                self.adc = Some(adc);
                Ok(())
            }
            Err(_) => {
                self.i2c = Some(adc.release());
                Err(AdcError::NotDetected)
            }
        }
    }

    fn read_volts(&mut self, channel: InstrumentationChannel) -> Result<f32, AdcError> {
        let adc = self.adc.as_mut().ok_or(AdcError::NotDetected)?;
        let raw = adc
            .read_single_ended(channel as u8)
            .map_err(|_| AdcError::Bus)?;
        Ok(Ads1115::<I2cDriver<'static>>::compute_volts(raw))
    }
}

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_VOLTS: [AtomicU32; 4] = [
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
];
#[cfg(not(target_os = "espidf"))]
static SIM_PRESENT: AtomicBool = AtomicBool::new(true);

/// Inject a pin voltage for one instrumentation channel.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_instrumentation_volts(channel: InstrumentationChannel, volts: f32) {
    SIM_VOLTS[channel as usize].store(volts.to_bits(), Ordering::Relaxed);
}

/// Make the simulated converter answer (or not) at init time.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_instrumentation_present(present: bool) {
    SIM_PRESENT.store(present, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct SimInstrumentationAdc {
    initialized: bool,
}

#[cfg(not(target_os = "espidf"))]
impl SimInstrumentationAdc {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(not(target_os = "espidf"))]
impl InstrumentationAdc for SimInstrumentationAdc {
    fn init(&mut self, _address: u8) -> Result<(), AdcError> {
        if SIM_PRESENT.load(Ordering::Relaxed) {
            self.initialized = true;
            Ok(())
        } else {
            Err(AdcError::NotDetected)
        }
    }

    fn read_volts(&mut self, channel: InstrumentationChannel) -> Result<f32, AdcError> {
        if !self.initialized {
            return Err(AdcError::NotDetected);
        }
        Ok(f32::from_bits(
            SIM_VOLTS[channel as usize].load(Ordering::Relaxed),
        ))
    }
}

/// The instrumentation ADC for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultInstrumentationAdc = Esp32InstrumentationAdc;
#[cfg(not(target_os = "espidf"))]
pub type DefaultInstrumentationAdc = SimInstrumentationAdc;

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn sim_reads_back_injected_volts() {
        sim_set_instrumentation_present(true);
        sim_set_instrumentation_volts(InstrumentationChannel::MotorCurrent, 0.264);
        let mut adc = SimInstrumentationAdc::new();
        adc.init(0x48).unwrap();
        let v = adc.read_volts(InstrumentationChannel::MotorCurrent).unwrap();
        assert!((v - 0.264).abs() < 1e-6);
    }

    #[test]
    fn read_before_init_is_an_error() {
        let mut adc = SimInstrumentationAdc::new();
        assert_eq!(
            adc.read_volts(InstrumentationChannel::BatteryVoltage),
            Err(AdcError::NotDetected)
        );
    }
}
