//! Auxiliary analog task: lead-acid service battery and bilge pumps.
//!
//! Polls the on-chip ADC channels every few tens of milliseconds, runs
//! each through the moving-average filter, and maintains the pump-running
//! mask from the sensed pump supply voltages. The battery current channel
//! goes through the persisted hall-sensor calibration; when no record is
//! stored (first boot, wiped flash) the interactive calibration runs
//! before the acquisition loop starts, and the serial `Q` verb re-runs it
//! at any time.

use core::time::Duration;
use std::time::Instant;

use futures_lite::future::block_on;
use log::{debug, error, info, warn};

use crate::calibration::{calibrate, CalibrationRecord, CalibrationTiming};
use crate::commands::AuxCommand;
use crate::conditioning::{aux_divided_voltage, board, ExpMovingAverage};
use crate::config::SystemConfig;
use crate::logging::{LogCategories, LogCategory};
use crate::mailbox::Hub;
use crate::ports::{AuxChannel, AuxInputs, FloatStore};
use crate::state::PumpMaskWriter;

pub const NAME: &str = "auxiliary\0";

/// Cadence of the human-readable reading report.
const REPORT_PERIOD: Duration = Duration::from_secs(3);

/// Delay before retrying a calibration whose persist step failed.
const STORE_RETRY: Duration = Duration::from_secs(1);

/// Pump mask from the sensed supply voltages: bit 1 port, bit 0 starboard.
pub(crate) fn pump_mask(port_volts: f32, starboard_volts: f32) -> u8 {
    (u8::from(port_volts > board::PUMP_THRESHOLD_VOLTS) << 1)
        | u8::from(starboard_volts > board::PUMP_THRESHOLD_VOLTS)
}

/// Run the interactive calibration until it persists a record, retrying
/// on storage failures.
async fn run_calibration<I, St>(
    hub: &'static Hub,
    categories: &LogCategories,
    store: &mut St,
    inputs: &mut I,
    timing: CalibrationTiming,
) -> CalibrationRecord
where
    I: AuxInputs,
    St: FloatStore,
{
    loop {
        let result = calibrate(&hub.auxiliary, &hub.beacon, categories, store, timing, || {
            match inputs.read_raw(AuxChannel::BatteryCurrent) {
                Ok(raw) => f32::from(raw),
                Err(e) => {
                    warn!("[AUX] calibration sample read failed: {e}");
                    0.0
                }
            }
        })
        .await;

        match result {
            Ok(record) => break record,
            Err(e) => {
                error!("[AUX] persisting calibration failed: {e}");
                async_io_mini::Timer::after(STORE_RETRY).await;
            }
        }
    }
}

pub fn run<I, St>(
    hub: &'static Hub,
    mut pump_writer: PumpMaskWriter,
    mut inputs: I,
    mut store: St,
    categories: &'static LogCategories,
    config: &SystemConfig,
) where
    I: AuxInputs,
    St: FloatStore,
{
    let poll = Duration::from_millis(u64::from(config.aux_poll_ms));
    let timing = CalibrationTiming::from(config);

    block_on(async {
        let mut record = match CalibrationRecord::load(&store) {
            Ok(Some(record)) => {
                info!(
                    "[AUX] stored calibration: offset {:.2}, sensitivity {:.4}",
                    record.offset, record.sensitivity
                );
                record
            }
            Ok(None) => {
                info!("[AUX] no stored calibration, starting the procedure");
                run_calibration(hub, categories, &mut store, &mut inputs, timing).await
            }
            Err(e) => {
                warn!("[AUX] calibration load failed ({e}), recalibrating");
                run_calibration(hub, categories, &mut store, &mut inputs, timing).await
            }
        };

        let window = config.filter_window;
        let mut battery_voltage = ExpMovingAverage::new(window);
        let mut battery_current = ExpMovingAverage::new(window);
        let mut port_pump = ExpMovingAverage::new(window);
        let mut starboard_pump = ExpMovingAverage::new(window);
        let mut last_report = Instant::now();

        loop {
            let reads = (
                inputs.read_raw(AuxChannel::BatteryVoltage),
                inputs.read_raw(AuxChannel::BatteryCurrent),
                inputs.read_raw(AuxChannel::PortPump),
                inputs.read_raw(AuxChannel::StarboardPump),
            );

            match reads {
                (Ok(raw_v), Ok(raw_i), Ok(raw_port), Ok(raw_stbd)) => {
                    let volts = battery_voltage.update(aux_divided_voltage(raw_v));
                    let amps = battery_current.update(record.current_amps(f32::from(raw_i)));
                    let port_volts = port_pump.update(aux_divided_voltage(raw_port));
                    let starboard_volts = starboard_pump.update(aux_divided_voltage(raw_stbd));

                    pump_writer.set(pump_mask(port_volts, starboard_volts));

                    if last_report.elapsed() >= REPORT_PERIOD {
                        if categories.enabled(LogCategory::Auxiliary) {
                            info!(
                                "[AUX] battery {volts:.2}V {amps:.2}A, pumps port {port_volts:.1}V stbd {starboard_volts:.1}V"
                            );
                        }
                        last_report = Instant::now();
                    }
                }
                _ => warn!("[AUX] on-chip ADC read failed"),
            }

            match hub.auxiliary.recv_timeout(poll).await {
                Some(AuxCommand::Calibrate) => {
                    record =
                        run_calibration(hub, categories, &mut store, &mut inputs, timing).await;
                    // Old filter history mixes two calibrations; drop it.
                    battery_current.reset();
                }
                Some(AuxCommand::Current(amps)) => {
                    debug!("[AUX] current input {amps} outside calibration, ignored");
                }
                None => {}
            }
        }
    })
}
