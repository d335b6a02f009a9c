//! Current-sensor calibration: persisted record and interactive procedure.
//!
//! The hall sensor on the auxiliary battery line needs a two-point
//! calibration: the ADC offset with no current flowing, and the
//! sensitivity derived from one known applied current. Both factors are
//! persisted so the procedure normally runs once per board; it re-runs
//! when the stored record is missing or when the operator requests it
//! with the `Q` verb.
//!
//! While the procedure runs, the status beacon is forced to `Fast` and
//! log output is restricted to the auxiliary category so the operator
//! prompts are not buried. Both are restored on every exit path.

use core::time::Duration;

use log::{info, warn};

use crate::commands::{AuxCommand, BlinkRate};
use crate::config::SystemConfig;
use crate::logging::{LogCategories, LogCategory};
use crate::mailbox::Mailbox;
use crate::ports::{FloatStore, StorageError};

/// Sentinel stored for a factor that has never been calibrated.
pub const UNSET: f32 = -1.0;

/// Minimum distance between the loaded average and the offset before the
/// sensitivity division is considered degenerate.
const MIN_DENOMINATOR: f32 = 1e-6;

const NAMESPACE: &str = "aux";
const OFFSET_KEY: &str = "offset";
const SENSITIVITY_KEY: &str = "sensitivity";

/// The persisted calibration factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationRecord {
    /// Mean raw ADC code with no current flowing.
    pub offset: f32,
    /// Amperes per ADC count above the offset.
    pub sensitivity: f32,
}

impl CalibrationRecord {
    /// Load the stored record; `None` when either factor is still the
    /// sentinel (never calibrated, or wiped).
    pub fn load(store: &impl FloatStore) -> Result<Option<Self>, StorageError> {
        let offset = store.get_float(NAMESPACE, OFFSET_KEY, UNSET)?;
        let sensitivity = store.get_float(NAMESPACE, SENSITIVITY_KEY, UNSET)?;
        if offset < 0.0 || sensitivity < 0.0 {
            return Ok(None);
        }
        Ok(Some(Self {
            offset,
            sensitivity,
        }))
    }

    pub fn save(&self, store: &mut impl FloatStore) -> Result<(), StorageError> {
        store.put_float(NAMESPACE, OFFSET_KEY, self.offset)?;
        store.put_float(NAMESPACE, SENSITIVITY_KEY, self.sensitivity)
    }

    /// Convert a raw ADC code to amperes.
    pub fn current_amps(&self, raw_code: f32) -> f32 {
        (raw_code - self.offset) * self.sensitivity
    }
}

/// Sensitivity from one known applied current, or `None` when the loaded
/// average is indistinguishable from the offset (the division would blow
/// up and the resulting record would be garbage).
pub fn derive_sensitivity(applied_amps: f32, loaded_avg: f32, offset: f32) -> Option<f32> {
    let denominator = loaded_avg - offset;
    if denominator.abs() < MIN_DENOMINATOR {
        return None;
    }
    Some(applied_amps / denominator)
}

/// Where the procedure currently is; logged with every prompt so a bench
/// transcript reads unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Uninitialized,
    AwaitingZeroConfirmation,
    SamplingZero,
    AwaitingCurrentInput,
    SamplingCurrent,
    Persisted,
}

/// Timing knobs, split out of [`SystemConfig`] so tests can run the
/// procedure in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationTiming {
    pub samples: u32,
    pub sample_interval: Duration,
    pub prompt_timeout: Duration,
}

impl From<&SystemConfig> for CalibrationTiming {
    fn from(config: &SystemConfig) -> Self {
        Self {
            samples: config.calibration_samples,
            sample_interval: Duration::from_millis(u64::from(
                config.calibration_sample_interval_ms,
            )),
            prompt_timeout: Duration::from_millis(u64::from(config.calibration_prompt_timeout_ms)),
        }
    }
}

/// Run the interactive calibration to completion.
///
/// `sample` reads one raw ADC code from the current-sense input. Operator
/// input arrives through `commands`; any command confirms the zero step,
/// and only `C<float>` advances the applied-current step. The procedure
/// cannot fail except on storage errors — a missed prompt re-prompts and a
/// degenerate measurement rejects and re-prompts, forever if need be.
pub async fn calibrate<St, F>(
    commands: &Mailbox<AuxCommand>,
    beacon: &Mailbox<BlinkRate>,
    categories: &LogCategories,
    store: &mut St,
    timing: CalibrationTiming,
    mut sample: F,
) -> Result<CalibrationRecord, StorageError>
where
    St: FloatStore,
    F: FnMut() -> f32,
{
    let _focus = categories.set_only(LogCategory::Auxiliary);
    beacon.send(BlinkRate::Fast);

    let mut phase = CalibrationPhase::Uninitialized;

    phase = advance(phase, CalibrationPhase::AwaitingZeroConfirmation);
    info!("[AUX] calibrating current sensor");
    info!("[AUX] make sure no current is flowing through the sensor, then press 'C'");
    let _ = commands.recv().await;

    phase = advance(phase, CalibrationPhase::SamplingZero);
    let offset = average(&mut sample, timing).await;
    info!("[AUX] offset adc: {offset:.2}");

    phase = advance(phase, CalibrationPhase::AwaitingCurrentInput);
    info!("[AUX] turn on the current source and input it starting with 'C'");

    let record = loop {
        let applied = match commands.recv_timeout(timing.prompt_timeout).await {
            Some(AuxCommand::Current(amps)) => amps,
            Some(AuxCommand::Calibrate) => {
                // Already calibrating; the restart request is a no-op here.
                continue;
            }
            None => {
                info!("[AUX] please input the current flowing through the sensor starting with 'C'");
                continue;
            }
        };
        info!("[AUX] applied current: {applied:.3}");

        phase = advance(phase, CalibrationPhase::SamplingCurrent);
        let loaded_avg = average(&mut sample, timing).await;
        info!("[AUX] loaded adc: {loaded_avg:.2}");

        match derive_sensitivity(applied, loaded_avg, offset) {
            Some(sensitivity) => {
                break CalibrationRecord {
                    offset,
                    sensitivity,
                }
            }
            None => {
                warn!("[AUX] loaded reading equals the offset; check wiring and re-input the current");
                phase = advance(phase, CalibrationPhase::AwaitingCurrentInput);
            }
        }
    };

    // The beacon goes back to steady even when persistence fails; the
    // caller's retry re-enters with Fast again.
    let saved = record.save(store);
    beacon.send(BlinkRate::Slow);
    saved?;

    phase = advance(phase, CalibrationPhase::Persisted);
    info!(
        "[AUX] calibration persisted ({phase:?}): offset {:.2}, sensitivity {:.4}",
        record.offset, record.sensitivity
    );
    Ok(record)
}

async fn average<F: FnMut() -> f32>(sample: &mut F, timing: CalibrationTiming) -> f32 {
    let mut sum = 0.0;
    for _ in 0..timing.samples {
        sum += sample();
        async_io_mini::Timer::after(timing.sample_interval).await;
    }
    sum / timing.samples as f32
}

fn advance(from: CalibrationPhase, to: CalibrationPhase) -> CalibrationPhase {
    log::debug!("[AUX] calibration {from:?} -> {to:?}");
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::nvs::SimFloatStore;
    use futures_lite::future::block_on;

    fn fast_timing() -> CalibrationTiming {
        CalibrationTiming {
            samples: 10,
            sample_interval: Duration::from_millis(1),
            prompt_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn record_load_returns_none_on_sentinels() {
        let store = SimFloatStore::default();
        assert_eq!(CalibrationRecord::load(&store).unwrap(), None);
    }

    #[test]
    fn record_roundtrips_through_store() {
        let mut store = SimFloatStore::default();
        let record = CalibrationRecord {
            offset: 1875.5,
            sensitivity: 0.125,
        };
        record.save(&mut store).unwrap();
        assert_eq!(CalibrationRecord::load(&store).unwrap(), Some(record));
    }

    #[test]
    fn degenerate_denominator_is_rejected() {
        assert_eq!(derive_sensitivity(5.0, 100.0, 100.0), None);
        assert_eq!(derive_sensitivity(5.0, 150.0, 100.0), Some(0.1));
    }

    #[test]
    fn current_conversion_uses_offset_and_sensitivity() {
        let record = CalibrationRecord {
            offset: 100.0,
            sensitivity: 0.1,
        };
        assert_eq!(record.current_amps(150.0), 5.0);
        assert_eq!(record.current_amps(100.0), 0.0);
        assert!(record.current_amps(50.0) < 0.0);
    }

    #[test]
    fn full_sequence_terminates_persisted() {
        let commands: Mailbox<AuxCommand> = Mailbox::new();
        let beacon: Mailbox<BlinkRate> = Mailbox::new();
        let categories = LogCategories::all();
        let mut store = SimFloatStore::default();

        // First 10 samples read 100 counts (no current), the rest 150.
        let mut calls = 0u32;
        let sample = move || {
            calls += 1;
            if calls <= 10 { 100.0 } else { 150.0 }
        };

        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(20));
                commands.send(AuxCommand::Calibrate); // confirm zero
                std::thread::sleep(Duration::from_millis(60));
                commands.send(AuxCommand::Current(5.0));
            });

            let record = block_on(calibrate(
                &commands,
                &beacon,
                &categories,
                &mut store,
                fast_timing(),
                sample,
            ))
            .unwrap();

            assert_eq!(record.offset, 100.0);
            assert_eq!(record.sensitivity, 5.0 / 50.0);
        });

        // Persisted and beacon restored to Slow.
        assert_eq!(
            CalibrationRecord::load(&store).unwrap().map(|r| r.offset),
            Some(100.0)
        );
        assert_eq!(beacon.try_recv(), Some(BlinkRate::Slow));
        // Category restriction lifted on completion.
        assert!(categories.enabled(LogCategory::Temperature));
    }

    #[test]
    fn missed_prompt_reprompts_until_current_arrives() {
        let commands: Mailbox<AuxCommand> = Mailbox::new();
        let beacon: Mailbox<BlinkRate> = Mailbox::new();
        let categories = LogCategories::all();
        let mut store = SimFloatStore::default();

        let mut calls = 0u32;
        let sample = move || {
            calls += 1;
            if calls <= 10 { 80.0 } else { 120.0 }
        };

        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(20));
                commands.send(AuxCommand::Current(0.0)); // any command confirms zero
                // Let the applied-current prompt time out twice before answering.
                std::thread::sleep(Duration::from_millis(500));
                commands.send(AuxCommand::Current(4.0));
            });

            let record = block_on(calibrate(
                &commands,
                &beacon,
                &categories,
                &mut store,
                fast_timing(),
                sample,
            ))
            .unwrap();

            assert_eq!(record.offset, 80.0);
            assert_eq!(record.sensitivity, 4.0 / 40.0);
        });
    }

    #[test]
    fn storage_failure_still_restores_the_beacon() {
        struct RejectingStore;
        impl FloatStore for RejectingStore {
            fn get_float(&self, _: &str, _: &str, default: f32) -> Result<f32, StorageError> {
                Ok(default)
            }
            fn put_float(&mut self, _: &str, _: &str, _: f32) -> Result<(), StorageError> {
                Err(StorageError::Full)
            }
        }

        let commands: Mailbox<AuxCommand> = Mailbox::new();
        let beacon: Mailbox<BlinkRate> = Mailbox::new();
        let categories = LogCategories::all();
        let mut store = RejectingStore;

        let mut calls = 0u32;
        let sample = move || {
            calls += 1;
            if calls <= 10 { 100.0 } else { 150.0 }
        };

        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(20));
                commands.send(AuxCommand::Calibrate);
                std::thread::sleep(Duration::from_millis(60));
                commands.send(AuxCommand::Current(5.0));
            });

            let result = block_on(calibrate(
                &commands,
                &beacon,
                &categories,
                &mut store,
                fast_timing(),
                sample,
            ));
            assert_eq!(result, Err(StorageError::Full));
        });

        // Overwrite mailbox: the latest value must be the restore.
        assert_eq!(beacon.try_recv(), Some(BlinkRate::Slow));
        assert!(categories.enabled(LogCategory::Temperature));
    }

    #[test]
    fn degenerate_measurement_rejects_and_retries() {
        let commands: Mailbox<AuxCommand> = Mailbox::new();
        let beacon: Mailbox<BlinkRate> = Mailbox::new();
        let categories = LogCategories::all();
        let mut store = SimFloatStore::default();

        // Zero phase and the first loaded phase both read 100 counts; only
        // the second loaded phase sees real current.
        let mut calls = 0u32;
        let sample = move || {
            calls += 1;
            if calls <= 20 { 100.0 } else { 180.0 }
        };

        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(20));
                commands.send(AuxCommand::Current(0.0));
                std::thread::sleep(Duration::from_millis(60));
                commands.send(AuxCommand::Current(8.0)); // rejected: no change
                std::thread::sleep(Duration::from_millis(100));
                commands.send(AuxCommand::Current(8.0)); // accepted
            });

            let record = block_on(calibrate(
                &commands,
                &beacon,
                &categories,
                &mut store,
                fast_timing(),
                sample,
            ))
            .unwrap();

            assert_eq!(record.offset, 100.0);
            assert_eq!(record.sensitivity, 8.0 / 80.0);
        });
    }
}
