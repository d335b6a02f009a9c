//! Shared system state store.
//!
//! One process-wide record holding the latest value of every sensor and
//! control quantity. Every field is an independent relaxed atomic, so
//! single-field reads and writes are lock-free from any task; a snapshot
//! across several fields may be torn during a concurrent write, which is
//! accepted because each field is independently meaningful.
//!
//! Writes are gated by capability handles: [`SystemState::leak`] hands out
//! exactly one non-`Clone` writer per sub-record (and per field for the
//! control block, which has two producing tasks). A task that only holds
//! `&SystemState` can read but never write.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use serde::{Deserialize, Serialize};

/// Sentinel for GPS fields before the first valid fix.
pub const GPS_INVALID: f32 = -1.0;

/// Sentinel reported by the probe driver for a disconnected DS18B20.
pub const TEMPERATURE_DISCONNECTED: f32 = -127.0;

// ---------------------------------------------------------------------------
// Atomic f32 cell
// ---------------------------------------------------------------------------

/// An `f32` stored as its bit pattern in an `AtomicU32`.
/// Relaxed ordering — values are telemetry, not synchronisation.
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Sub-records
// ---------------------------------------------------------------------------

pub struct InstrumentationState {
    current_motor: AtomicF32,
    current_battery: AtomicF32,
    current_mppt: AtomicF32,
    voltage_battery: AtomicF32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentationSnapshot {
    pub current_motor: f32,
    pub current_battery: f32,
    pub current_mppt: f32,
    pub voltage_battery: f32,
}

impl InstrumentationState {
    fn new() -> Self {
        Self {
            current_motor: AtomicF32::new(0.0),
            current_battery: AtomicF32::new(0.0),
            current_mppt: AtomicF32::new(0.0),
            voltage_battery: AtomicF32::new(0.0),
        }
    }

    pub fn snapshot(&self) -> InstrumentationSnapshot {
        InstrumentationSnapshot {
            current_motor: self.current_motor.get(),
            current_battery: self.current_battery.get(),
            current_mppt: self.current_mppt.get(),
            voltage_battery: self.voltage_battery.get(),
        }
    }
}

pub struct GpsState {
    latitude: AtomicF32,
    longitude: AtomicF32,
    speed: AtomicF32,
    course: AtomicF32,
    satellite_count: AtomicU8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSnapshot {
    pub latitude: f32,
    pub longitude: f32,
    pub speed: f32,
    pub course: f32,
    pub satellite_count: u8,
}

impl GpsState {
    fn new() -> Self {
        Self {
            latitude: AtomicF32::new(GPS_INVALID),
            longitude: AtomicF32::new(GPS_INVALID),
            speed: AtomicF32::new(GPS_INVALID),
            course: AtomicF32::new(GPS_INVALID),
            satellite_count: AtomicU8::new(0),
        }
    }

    pub fn snapshot(&self) -> GpsSnapshot {
        GpsSnapshot {
            latitude: self.latitude.get(),
            longitude: self.longitude.get(),
            speed: self.speed.get(),
            course: self.course.get(),
            satellite_count: self.satellite_count.load(Ordering::Relaxed),
        }
    }
}

pub struct TemperaturesState {
    motor: AtomicF32,
    mppt: AtomicF32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperaturesSnapshot {
    pub motor: f32,
    pub mppt: f32,
}

impl TemperaturesState {
    fn new() -> Self {
        Self {
            motor: AtomicF32::new(TEMPERATURE_DISCONNECTED),
            mppt: AtomicF32::new(TEMPERATURE_DISCONNECTED),
        }
    }

    pub fn snapshot(&self) -> TemperaturesSnapshot {
        TemperaturesSnapshot {
            motor: self.motor.get(),
            mppt: self.mppt.get(),
        }
    }
}

pub struct ControlState {
    pump_mask: AtomicU8,
    dac_output: AtomicF32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    /// Bit 1 = port pump on, bit 0 = starboard pump on.
    pub pump_mask: u8,
    /// Amplified throttle output in millivolts.
    pub dac_output: f32,
}

impl ControlState {
    fn new() -> Self {
        Self {
            pump_mask: AtomicU8::new(0),
            dac_output: AtomicF32::new(0.0),
        }
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            pump_mask: self.pump_mask.load(Ordering::Relaxed),
            dac_output: self.dac_output.get(),
        }
    }
}

// ---------------------------------------------------------------------------
// The store and its writer capabilities
// ---------------------------------------------------------------------------

pub struct SystemState {
    pub instrumentation: InstrumentationState,
    pub gps: GpsState,
    pub temperatures: TemperaturesState,
    pub control: ControlState,
}

impl SystemState {
    fn new() -> Self {
        Self {
            instrumentation: InstrumentationState::new(),
            gps: GpsState::new(),
            temperatures: TemperaturesState::new(),
            control: ControlState::new(),
        }
    }

    /// Construct the process-lifetime store and its writer set.
    ///
    /// Called once at bootstrap; the writers are moved into their owning
    /// tasks and cannot be duplicated afterwards.
    pub fn leak() -> (&'static SystemState, StateWriters) {
        let state: &'static SystemState = Box::leak(Box::new(SystemState::new()));
        let writers = StateWriters {
            instrumentation: InstrumentationWriter { state },
            gps: GpsWriter { state },
            temperatures: TemperaturesWriter { state },
            pump_mask: PumpMaskWriter { state },
            dac_output: DacOutputWriter { state },
        };
        (state, writers)
    }
}

/// The complete writer set, produced exactly once per store.
pub struct StateWriters {
    pub instrumentation: InstrumentationWriter,
    pub gps: GpsWriter,
    pub temperatures: TemperaturesWriter,
    pub pump_mask: PumpMaskWriter,
    pub dac_output: DacOutputWriter,
}

pub struct InstrumentationWriter {
    state: &'static SystemState,
}

impl InstrumentationWriter {
    pub fn store(&mut self, s: InstrumentationSnapshot) {
        let inner = &self.state.instrumentation;
        inner.current_motor.set(s.current_motor);
        inner.current_battery.set(s.current_battery);
        inner.current_mppt.set(s.current_mppt);
        inner.voltage_battery.set(s.voltage_battery);
    }
}

pub struct GpsWriter {
    state: &'static SystemState,
}

impl GpsWriter {
    pub fn store(&mut self, s: GpsSnapshot) {
        let inner = &self.state.gps;
        inner.latitude.set(s.latitude);
        inner.longitude.set(s.longitude);
        inner.speed.set(s.speed);
        inner.course.set(s.course);
        inner
            .satellite_count
            .store(s.satellite_count, Ordering::Relaxed);
    }
}

pub struct TemperaturesWriter {
    state: &'static SystemState,
}

impl TemperaturesWriter {
    pub fn set_motor(&mut self, celsius: f32) {
        self.state.temperatures.motor.set(celsius);
    }

    pub fn set_mppt(&mut self, celsius: f32) {
        self.state.temperatures.mppt.set(celsius);
    }
}

/// Field-level writer: only the auxiliary task flips pump bits.
pub struct PumpMaskWriter {
    state: &'static SystemState,
}

impl PumpMaskWriter {
    pub fn set(&mut self, mask: u8) {
        self.state.control.pump_mask.store(mask, Ordering::Relaxed);
    }
}

/// Field-level writer: only the encoder task drives the throttle DAC.
pub struct DacOutputWriter {
    state: &'static SystemState,
}

impl DacOutputWriter {
    pub fn set_millivolts(&mut self, mv: f32) {
        self.state.control.dac_output.set(mv);
    }
}
