//! Instrumentation acquisition task (ADS1115 measurement chain).
//!
//! Startup probes the converter at both candidate I²C addresses; until one
//! answers the beacon is forced to `Fast` so a missing instrumentation
//! board is visible from across the boat. Each acquisition cycle reads the
//! four channels, runs them through the signal-conditioning chain, stores
//! the snapshot, and publishes a telemetry record.

use core::time::Duration;

use futures_lite::future::block_on;
use log::{info, warn};

use crate::commands::BlinkRate;
use crate::conditioning::{
    board, la55_current, linear_correction, lv20p_input_voltage, lv20p_primary_drop, t201_current,
};
use crate::config::SystemConfig;
use crate::logging::{LogCategories, LogCategory};
use crate::mailbox::Hub;
use crate::pins;
use crate::ports::{AdcError, InstrumentationAdc, InstrumentationChannel};
use crate::state::{InstrumentationSnapshot, InstrumentationWriter};
use crate::telemetry::{self, TelemetryRecord};

pub const NAME: &str = "instrumentation\0";

/// Delay between converter probe rounds while the board is missing.
const PROBE_RETRY: Duration = Duration::from_secs(2);

/// Read all four channels and condition them into engineering units.
pub(crate) fn read_snapshot<A: InstrumentationAdc>(
    adc: &mut A,
) -> Result<InstrumentationSnapshot, AdcError> {
    let battery_pin = adc.read_volts(InstrumentationChannel::BatteryVoltage)?;
    let primary_drop = lv20p_primary_drop(
        battery_pin,
        board::LV20P_CONVERSION_RATIO,
        board::LV20P_PRIMARY_RESISTANCE,
        board::LV20P_BURDEN_RESISTANCE,
    );
    let divider =
        board::LV20P_PRIMARY_COIL_RESISTANCE as f32 / board::LV20P_PRIMARY_RESISTANCE as f32;
    let voltage_battery = linear_correction(
        lv20p_input_voltage(primary_drop, divider),
        board::BATTERY_VOLTAGE_SLOPE,
        0.0,
    );

    let current_motor = t201_current(
        adc.read_volts(InstrumentationChannel::MotorCurrent)?,
        board::T201_FULL_SCALE,
        board::MOTOR_BURDEN_RESISTANCE,
    );
    let current_battery = t201_current(
        adc.read_volts(InstrumentationChannel::BatteryCurrent)?,
        board::T201_FULL_SCALE,
        board::BATTERY_BURDEN_RESISTANCE,
    );
    let current_mppt = la55_current(
        adc.read_volts(InstrumentationChannel::MpptCurrent)?,
        board::LA55_CONVERSION_RATIO,
        board::MPPT_BURDEN_RESISTANCE,
    );

    Ok(InstrumentationSnapshot {
        current_motor,
        current_battery,
        current_mppt,
        voltage_battery,
    })
}

pub fn run<A: InstrumentationAdc>(
    hub: &'static Hub,
    mut writer: InstrumentationWriter,
    mut adc: A,
    categories: &'static LogCategories,
    config: &SystemConfig,
) {
    let period = Duration::from_secs(u64::from(config.instrumentation_period_secs));

    block_on(async {
        'probe: loop {
            for &address in &pins::ADS1115_ADDRESSES {
                if adc.init(address).is_ok() {
                    info!("[ADS] converter found at 0x{address:02X}");
                    break 'probe;
                }
            }
            hub.beacon.send(BlinkRate::Fast);
            warn!("[ADS] no converter answering, check the instrumentation board");
            async_io_mini::Timer::after(PROBE_RETRY).await;
        }
        hub.beacon.send(BlinkRate::Slow);

        loop {
            match read_snapshot(&mut adc) {
                Ok(snapshot) => {
                    writer.store(snapshot);
                    if categories.enabled(LogCategory::Instrumentation) {
                        info!(
                            "[ADS] vbat {:.2}V imotor {:.2}A ibat {:.2}A imppt {:.2}A",
                            snapshot.voltage_battery,
                            snapshot.current_motor,
                            snapshot.current_battery,
                            snapshot.current_mppt
                        );
                    }
                    if let Some(frame) =
                        telemetry::encode(&TelemetryRecord::Instrumentation(snapshot))
                    {
                        hub.publish_telemetry(frame);
                    }
                    hub.beacon.send(BlinkRate::Pulse);
                }
                Err(e) => warn!("[ADS] acquisition failed: {e}"),
            }
            async_io_mini::Timer::after(period).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAdc {
        volts: [f32; 4],
    }

    impl InstrumentationAdc for FixedAdc {
        fn init(&mut self, _address: u8) -> Result<(), AdcError> {
            Ok(())
        }
        fn read_volts(&mut self, channel: InstrumentationChannel) -> Result<f32, AdcError> {
            Ok(self.volts[channel as usize])
        }
    }

    #[test]
    fn zero_loop_current_conditions_to_zero_amps() {
        // 4mA through the 22R burden is the T201 zero point.
        let mut adc = FixedAdc {
            volts: [0.0, 0.088, 0.088, 0.0],
        };
        let s = read_snapshot(&mut adc).unwrap();
        assert!(s.current_motor.abs() < 1e-2, "got {}", s.current_motor);
        assert!(s.current_battery.abs() < 1e-2, "got {}", s.current_battery);
        assert_eq!(s.current_mppt, 0.0);
    }

    #[test]
    fn battery_voltage_chain_recovers_known_input() {
        // Pin voltage for a 48V battery, worked forward through the layout.
        let divider =
            board::LV20P_PRIMARY_COIL_RESISTANCE as f32 / board::LV20P_PRIMARY_RESISTANCE as f32;
        let drop = 48.0 / (1.0 + divider);
        let pin = drop * board::LV20P_BURDEN_RESISTANCE as f32 * board::LV20P_CONVERSION_RATIO
            / board::LV20P_PRIMARY_RESISTANCE as f32;

        let mut adc = FixedAdc {
            volts: [pin, 0.0, 0.0, 0.0],
        };
        let s = read_snapshot(&mut adc).unwrap();
        let expected = 48.0 * board::BATTERY_VOLTAGE_SLOPE;
        assert!(
            (s.voltage_battery - expected).abs() < 1e-2,
            "got {}",
            s.voltage_battery
        );
    }

    #[test]
    fn bus_error_propagates() {
        struct BrokenAdc;
        impl InstrumentationAdc for BrokenAdc {
            fn init(&mut self, _address: u8) -> Result<(), AdcError> {
                Err(AdcError::NotDetected)
            }
            fn read_volts(&mut self, _c: InstrumentationChannel) -> Result<f32, AdcError> {
                Err(AdcError::Bus)
            }
        }
        assert_eq!(read_snapshot(&mut BrokenAdc), Err(AdcError::Bus));
    }
}
