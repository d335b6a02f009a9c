//! GPS acquisition task.
//!
//! Polls the receiver each period, merges whatever fields the sentence
//! burst carried into the stored position (a field the burst did not carry
//! keeps its previous value), and publishes a telemetry record on every
//! new fix. The `G` verb selects a diagnostic output mode: raw NMEA bytes,
//! the parsed snapshot, or silence.

use core::time::Duration;

use futures_lite::future::block_on;
use log::{info, warn};

use crate::commands::{BlinkRate, GpsOutputMode};
use crate::config::SystemConfig;
use crate::logging::{LogCategories, LogCategory};
use crate::mailbox::Hub;
use crate::ports::{GpsFix, GpsReceiver};
use crate::state::{GpsSnapshot, GpsWriter, SystemState};
use crate::telemetry::{self, TelemetryRecord};

pub const NAME: &str = "gps\0";

/// Merge a fix into the stored snapshot; `None` fields keep the old value.
pub(crate) fn apply_fix(previous: GpsSnapshot, fix: GpsFix) -> GpsSnapshot {
    GpsSnapshot {
        latitude: fix.latitude.unwrap_or(previous.latitude),
        longitude: fix.longitude.unwrap_or(previous.longitude),
        speed: fix.speed.unwrap_or(previous.speed),
        course: fix.course.unwrap_or(previous.course),
        satellite_count: fix.satellite_count.unwrap_or(previous.satellite_count),
    }
}

pub fn run<R: GpsReceiver>(
    hub: &'static Hub,
    state: &'static SystemState,
    mut writer: GpsWriter,
    mut receiver: R,
    categories: &'static LogCategories,
    config: &SystemConfig,
) {
    let period = Duration::from_secs(u64::from(config.gps_period_secs));
    let mut mode = GpsOutputMode::Off;

    block_on(async {
        loop {
            match receiver.poll() {
                Ok(Some(fix)) => {
                    let snapshot = apply_fix(state.gps.snapshot(), fix);
                    writer.store(snapshot);
                    if let Some(frame) = telemetry::encode(&TelemetryRecord::Gps(snapshot)) {
                        hub.publish_telemetry(frame);
                    }
                    hub.beacon.send(BlinkRate::Pulse);
                }
                Ok(None) => {}
                Err(e) => warn!("[GPS] receiver poll failed: {e:?}"),
            }

            if categories.enabled(LogCategory::Gps) {
                match mode {
                    GpsOutputMode::Off => {}
                    GpsOutputMode::Raw => {
                        let raw = receiver.raw_pending();
                        if !raw.is_empty() {
                            info!("[GPS] {}", String::from_utf8_lossy(raw));
                        }
                    }
                    GpsOutputMode::Parsed => {
                        let s = state.gps.snapshot();
                        info!(
                            "[GPS] lat {:.5} lon {:.5} speed {:.1}km/h course {:.1} sats {}",
                            s.latitude, s.longitude, s.speed, s.course, s.satellite_count
                        );
                    }
                }
            }

            if let Some(new_mode) = hub.gps.recv_timeout(period).await {
                info!("[GPS] output mode -> {new_mode:?}");
                mode = new_mode;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GPS_INVALID;

    fn boot_snapshot() -> GpsSnapshot {
        GpsSnapshot {
            latitude: GPS_INVALID,
            longitude: GPS_INVALID,
            speed: GPS_INVALID,
            course: GPS_INVALID,
            satellite_count: 0,
        }
    }

    #[test]
    fn full_fix_replaces_boot_sentinels() {
        let fix = GpsFix {
            latitude: Some(-22.9),
            longitude: Some(-43.1),
            speed: Some(11.0),
            course: Some(270.0),
            satellite_count: Some(7),
        };
        let s = apply_fix(boot_snapshot(), fix);
        assert_eq!(s.latitude, -22.9);
        assert_eq!(s.satellite_count, 7);
    }

    #[test]
    fn partial_fix_keeps_previous_fields() {
        let first = apply_fix(
            boot_snapshot(),
            GpsFix {
                latitude: Some(-22.9),
                longitude: Some(-43.1),
                speed: Some(11.0),
                course: Some(270.0),
                satellite_count: Some(7),
            },
        );
        // A GGA-only burst carries just the satellite count.
        let second = apply_fix(
            first,
            GpsFix {
                satellite_count: Some(9),
                ..GpsFix::default()
            },
        );
        assert_eq!(second.latitude, -22.9);
        assert_eq!(second.speed, 11.0);
        assert_eq!(second.satellite_count, 9);
    }
}
