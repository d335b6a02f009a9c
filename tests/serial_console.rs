//! Serial task end-to-end over the simulated console.

#![cfg(not(target_os = "espidf"))]

use core::time::Duration;
use std::time::Instant;

use boat_companion::adapters::console::{sim_push_console_input, sim_take_console_output, SimConsole};
use boat_companion::commands::BlinkRate;
use boat_companion::mailbox::Hub;
use boat_companion::ports::{HttpError, HttpFetch};
use boat_companion::state::TemperaturesSnapshot;
use boat_companion::tasks;
use boat_companion::telemetry::{encode, FrameDecoder, TelemetryRecord};

struct NoHttp;
impl HttpFetch for NoHttp {
    fn get_text(&mut self, _url: &str) -> Result<String, HttpError> {
        Err(HttpError::Connect)
    }
}

/// Poll until `probe` yields a value or the deadline passes.
fn wait_for<T>(deadline: Duration, mut probe: impl FnMut() -> Option<T>) -> Option<T> {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if let Some(value) = probe() {
            return Some(value);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    None
}

#[test]
fn typed_command_reaches_its_mailbox_and_frames_reach_the_console() {
    let hub = Hub::leak();
    let _ = sim_take_console_output();

    std::thread::spawn(move || {
        tasks::serial::run(hub, SimConsole::new(), NoHttp);
    });

    // Operator types a beacon command.
    sim_push_console_input(b"B2\r");
    let rate = wait_for(Duration::from_secs(2), || hub.beacon.try_recv());
    assert_eq!(rate, Some(BlinkRate::Fast));

    // An acquisition task publishes a record; the frame shows up on the
    // console byte-exact.
    let record = TelemetryRecord::Temperatures(TemperaturesSnapshot {
        motor: 58.0,
        mppt: 31.5,
    });
    hub.publish_telemetry(encode(&record).unwrap());

    let mut decoder = FrameDecoder::new();
    let decoded = wait_for(Duration::from_secs(2), || {
        decoder.feed(&sim_take_console_output())
    });
    assert_eq!(decoded, Some(record));
}
