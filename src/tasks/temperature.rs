//! Temperature acquisition task (DS18B20 probe pair).
//!
//! Each cycle reads the motor and MPPT probes, stores the readings, and
//! publishes a telemetry record. The period sleep is a bounded mailbox
//! wait, so a serial `T` verb interrupts it and triggers an immediate bus
//! rescan.
//!
//! Probe roles are resolved against [`SystemConfig`]: a configured 1-Wire
//! address claims its role when present on the bus, and an all-zero
//! (unassigned) address falls back to discovery order. A role with no
//! probe reads the disconnect sentinel.

use core::time::Duration;

use futures_lite::future::block_on;
use log::{info, warn};

use crate::commands::{BlinkRate, TemperatureCommand};
use crate::config::SystemConfig;
use crate::logging::{LogCategories, LogCategory};
use crate::mailbox::Hub;
use crate::ports::{ProbeAddress, ProbeBus};
use crate::state::{SystemState, TemperaturesWriter, TEMPERATURE_DISCONNECTED};
use crate::telemetry::{self, TelemetryRecord};

pub const NAME: &str = "temperature\0";

const UNASSIGNED: ProbeAddress = [0; 8];

/// Which bus address serves which role, after a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProbeAssignment {
    pub motor: Option<ProbeAddress>,
    pub mppt: Option<ProbeAddress>,
}

/// Match scanned addresses to roles. Configured addresses win; roles left
/// unassigned take the remaining probes in discovery order.
pub(crate) fn assign_probes(found: &[ProbeAddress], config: &SystemConfig) -> ProbeAssignment {
    let mut remaining: heapless::Vec<ProbeAddress, 4> =
        found.iter().copied().collect();

    let mut claim = |configured: ProbeAddress| -> Option<ProbeAddress> {
        if configured == UNASSIGNED {
            return None;
        }
        let index = remaining.iter().position(|a| *a == configured)?;
        Some(remaining.swap_remove(index))
    };

    let mut motor = claim(config.motor_probe_address);
    let mut mppt = claim(config.mppt_probe_address);

    if motor.is_none() && !remaining.is_empty() {
        motor = Some(remaining.swap_remove(0));
    }
    if mppt.is_none() && !remaining.is_empty() {
        mppt = Some(remaining.swap_remove(0));
    }

    ProbeAssignment { motor, mppt }
}

fn scan_and_assign<B: ProbeBus>(
    bus: &mut B,
    config: &SystemConfig,
    categories: &LogCategories,
) -> ProbeAssignment {
    match bus.scan() {
        Ok(found) => {
            if categories.enabled(LogCategory::Temperature) {
                info!("[TEMP] found {} probe(s) on the bus", found.len());
                for address in &found {
                    info!("[TEMP]   {address:02X?}");
                }
            }
            assign_probes(&found, config)
        }
        Err(e) => {
            warn!("[TEMP] bus scan failed: {e}");
            ProbeAssignment {
                motor: None,
                mppt: None,
            }
        }
    }
}

fn read_role<B: ProbeBus>(bus: &mut B, address: Option<ProbeAddress>) -> f32 {
    let Some(address) = address else {
        return TEMPERATURE_DISCONNECTED;
    };
    match bus.read_celsius(&address) {
        Ok(celsius) => celsius,
        Err(e) => {
            warn!("[TEMP] read {address:02X?} failed: {e}");
            TEMPERATURE_DISCONNECTED
        }
    }
}

pub fn run<B: ProbeBus>(
    hub: &'static Hub,
    state: &'static SystemState,
    mut writer: TemperaturesWriter,
    mut bus: B,
    categories: &'static LogCategories,
    config: &SystemConfig,
) {
    let period = Duration::from_secs(u64::from(config.temperature_period_secs));
    let mut assignment = scan_and_assign(&mut bus, config, categories);

    block_on(async {
        loop {
            let motor = read_role(&mut bus, assignment.motor);
            let mppt = read_role(&mut bus, assignment.mppt);
            writer.set_motor(motor);
            writer.set_mppt(mppt);

            if categories.enabled(LogCategory::Temperature) {
                info!("[TEMP] motor {motor:.2}C, mppt {mppt:.2}C");
            }
            if let Some(frame) =
                telemetry::encode(&TelemetryRecord::Temperatures(state.temperatures.snapshot()))
            {
                hub.publish_telemetry(frame);
            }
            hub.beacon.send(BlinkRate::Pulse);

            if let Some(TemperatureCommand::RescanProbes) =
                hub.temperature.recv_timeout(period).await
            {
                info!("[TEMP] rescanning the probe bus");
                assignment = scan_and_assign(&mut bus, config, categories);
            }
        }
    })
}
