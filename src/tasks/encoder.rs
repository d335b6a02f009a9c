//! Throttle encoder task.
//!
//! Near-continuous poll of the rotary encoder. The detent position is
//! clamped to `0..=MAX_POSITION` and mapped linearly onto the 8-bit DAC
//! code; the external amplifier turns that into the 0-5V command the motor
//! controller expects, which is what the store records in millivolts.

use core::time::Duration;

use futures_lite::future::block_on;
use log::{debug, warn};

use crate::config::SystemConfig;
use crate::logging::{LogCategories, LogCategory};
use crate::ports::{RotaryEncoder, ThrottleDac};
use crate::state::DacOutputWriter;

pub const NAME: &str = "encoder\0";

/// Detents from idle to full throttle.
pub const MAX_POSITION: i32 = 50;

/// Amplified full-scale output in millivolts.
const FULL_SCALE_MILLIVOLTS: f32 = 5000.0;

pub(crate) fn dac_code(position: i32) -> u8 {
    (position * 255 / MAX_POSITION) as u8
}

pub(crate) fn output_millivolts(code: u8) -> f32 {
    f32::from(code) * FULL_SCALE_MILLIVOLTS / 255.0
}

pub fn run<E, D>(
    mut writer: DacOutputWriter,
    mut encoder: E,
    mut dac: D,
    categories: &'static LogCategories,
    config: &SystemConfig,
) where
    E: RotaryEncoder,
    D: ThrottleDac,
{
    let poll = Duration::from_millis(u64::from(config.encoder_poll_ms));
    let mut position: i32 = 0;

    block_on(async {
        loop {
            let delta = encoder.delta();
            if delta != 0 {
                position = (position + delta).clamp(0, MAX_POSITION);
                let code = dac_code(position);
                match dac.write_code(code) {
                    Ok(()) => {
                        let millivolts = output_millivolts(code);
                        writer.set_millivolts(millivolts);
                        if categories.enabled(LogCategory::Encoder) {
                            debug!("[ENC] position {position} -> {millivolts:.0}mV");
                        }
                    }
                    Err(e) => warn!("[ENC] throttle DAC write failed: {e:?}"),
                }
            }
            async_io_mini::Timer::after(poll).await;
        }
    })
}
