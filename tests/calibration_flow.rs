//! End-to-end calibration: serial bytes in, persisted record out.
//!
//! Drives the interactive current-sensor calibration exactly as a bench
//! operator would, through the serial protocol dispatcher, while the
//! procedure runs on another thread.

#![cfg(not(target_os = "espidf"))]

use core::time::Duration;

use futures_lite::future::block_on;

use boat_companion::adapters::nvs::SimFloatStore;
use boat_companion::calibration::{calibrate, CalibrationRecord, CalibrationTiming};
use boat_companion::commands::BlinkRate;
use boat_companion::logging::LogCategories;
use boat_companion::mailbox::Hub;
use boat_companion::ports::{HttpError, HttpFetch};
use boat_companion::protocol::{Dispatcher, LineFramer};

struct NoHttp;
impl HttpFetch for NoHttp {
    fn get_text(&mut self, _url: &str) -> Result<String, HttpError> {
        Err(HttpError::Connect)
    }
}

fn type_line(dispatcher: &mut Dispatcher<NoHttp>, framer: &mut LineFramer, line: &str) {
    for &byte in line.as_bytes() {
        dispatcher.feed(framer, byte);
    }
}

#[test]
fn operator_types_their_way_to_a_persisted_record() {
    let hub = Hub::leak();
    let categories: &'static LogCategories = Box::leak(Box::new(LogCategories::all()));
    let mut store = SimFloatStore::new();

    let timing = CalibrationTiming {
        samples: 8,
        sample_interval: Duration::from_millis(1),
        prompt_timeout: Duration::from_millis(250),
    };

    // First sampling phase sees the unloaded sensor, second the loaded one.
    let mut calls = 0u32;
    let sample = move || {
        calls += 1;
        if calls <= 8 {
            1800.0
        } else {
            2200.0
        }
    };

    std::thread::scope(|s| {
        s.spawn(|| {
            let mut dispatcher = Dispatcher::new(hub, NoHttp);
            let mut framer = LineFramer::new();

            // Typos and stray newlines must not disturb the procedure.
            std::thread::sleep(Duration::from_millis(30));
            type_line(&mut dispatcher, &mut framer, "\r\n");
            type_line(&mut dispatcher, &mut framer, "Zx\r");
            type_line(&mut dispatcher, &mut framer, "C0\r"); // confirm zero

            std::thread::sleep(Duration::from_millis(60));
            type_line(&mut dispatcher, &mut framer, "Cabc\r"); // dropped
            type_line(&mut dispatcher, &mut framer, "C10.0\r"); // applied current
        });

        let record = block_on(calibrate(
            &hub.auxiliary,
            &hub.beacon,
            categories,
            &mut store,
            timing,
            sample,
        ))
        .unwrap();

        assert_eq!(record.offset, 1800.0);
        assert_eq!(record.sensitivity, 10.0 / 400.0);
    });

    // The record survives a reload and converts as expected.
    let reloaded = CalibrationRecord::load(&store).unwrap().unwrap();
    assert_eq!(reloaded.current_amps(2200.0), 10.0);
    assert_eq!(reloaded.current_amps(1800.0), 0.0);

    // Beacon handed back to the steady rate on completion.
    assert_eq!(hub.beacon.try_recv(), Some(BlinkRate::Slow));
}
