//! Status beacon task.
//!
//! Polls the beacon mailbox at a short period and advances the
//! [`BeaconEngine`] by the measured elapsed time, so the LED cadence stays
//! correct even when a command cuts a sleep short.

use core::time::Duration;
use std::time::Instant;

use futures_lite::future::block_on;

use crate::config::SystemConfig;
use crate::drivers::beacon::BeaconEngine;
use crate::mailbox::Hub;
use crate::ports::Indicator;

pub const NAME: &str = "beacon\0";

pub fn run<I: Indicator>(hub: &'static Hub, mut indicator: I, config: &SystemConfig) {
    let poll = Duration::from_millis(u64::from(config.beacon_poll_ms));
    let mut engine = BeaconEngine::new();
    let mut last_tick = Instant::now();

    block_on(async {
        loop {
            if let Some(rate) = hub.beacon.recv_timeout(poll).await {
                engine.command(rate);
            }

            let now = Instant::now();
            let elapsed_ms = now.duration_since(last_tick).as_millis() as u32;
            last_tick = now;

            let out = engine.tick(elapsed_ms);
            indicator.set_led(out.led_on);
            indicator.set_buzzer(out.buzzer_on);
        }
    })
}
