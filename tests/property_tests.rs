//! Property tests for the pure codec and conditioning layers.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use boat_companion::adapters::gps::parse_sentence;
use boat_companion::conditioning::{t201_current, ExpMovingAverage};
use boat_companion::protocol::{parse, LineFramer, LINE_CAPACITY};
use boat_companion::state::InstrumentationSnapshot;
use boat_companion::telemetry::{encode, FrameDecoder, TelemetryRecord};

proptest! {
    /// The framer never panics and never emits a line longer than its
    /// buffer or containing a terminator byte.
    #[test]
    fn framer_handles_arbitrary_byte_streams(
        bytes in proptest::collection::vec(any::<u8>(), 0..512)
    ) {
        let mut framer = LineFramer::new();
        for byte in bytes {
            if let Some(line) = framer.push(byte) {
                prop_assert!(!line.is_empty());
                prop_assert!(line.len() <= LINE_CAPACITY);
                prop_assert!(!line.contains(&b'\r'));
                prop_assert!(!line.contains(&b'\n'));
            }
        }
    }

    /// A sustained stream always terminates a line within one buffer.
    #[test]
    fn framer_always_cuts_within_capacity(byte in 0u8..=255) {
        prop_assume!(byte != b'\r' && byte != b'\n');
        let mut framer = LineFramer::new();
        let mut pushed = 0;
        loop {
            pushed += 1;
            if framer.push(byte).is_some() {
                break;
            }
            prop_assert!(pushed <= LINE_CAPACITY + 1);
        }
    }

    /// The command parser never panics on arbitrary terminated lines.
    #[test]
    fn parser_tolerates_arbitrary_lines(
        line in proptest::collection::vec(any::<u8>(), 0..LINE_CAPACITY)
    ) {
        let _ = parse(&line);
    }

    /// The frame decoder never panics on arbitrary input chunks.
    #[test]
    fn frame_decoder_tolerates_garbage(
        chunks in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..64),
            0..16
        )
    ) {
        let mut decoder = FrameDecoder::new();
        for chunk in chunks {
            let _ = decoder.feed(&chunk);
        }
    }

    /// Any encodable record survives the wire roundtrip, even split into
    /// single-byte deliveries.
    #[test]
    fn telemetry_roundtrips_bytewise(
        current_motor in -200.0f32..200.0,
        current_battery in -200.0f32..200.0,
        current_mppt in -50.0f32..50.0,
        voltage_battery in 0.0f32..60.0,
    ) {
        let record = TelemetryRecord::Instrumentation(InstrumentationSnapshot {
            current_motor,
            current_battery,
            current_mppt,
            voltage_battery,
        });
        let frame = encode(&record).unwrap();
        let mut decoder = FrameDecoder::new();
        let mut decoded = None;
        for byte in frame.iter() {
            if let Some(r) = decoder.feed(&[*byte]) {
                decoded = Some(r);
            }
        }
        prop_assert_eq!(decoded, Some(record));
    }

    /// The NMEA parser never panics, whatever arrives on the UART.
    #[test]
    fn nmea_parser_tolerates_arbitrary_text(sentence in "[ -~]{0,90}") {
        let _ = parse_sentence(&sentence);
    }

    /// The moving average stays within the bounds of its inputs.
    #[test]
    fn moving_average_is_bounded(
        samples in proptest::collection::vec(-1000.0f32..1000.0, 1..50),
        window in 1u16..16,
    ) {
        let mut filter = ExpMovingAverage::new(window);
        let mut low = f32::INFINITY;
        let mut high = f32::NEG_INFINITY;
        for &sample in &samples {
            low = low.min(sample);
            high = high.max(sample);
            let out = filter.update(sample);
            prop_assert!(out >= low - 1e-3 && out <= high + 1e-3, "out {out} not in [{low}, {high}]");
        }
    }

    /// The 4-20mA conversion is strictly increasing in pin voltage.
    #[test]
    fn t201_is_monotonic(pin in 0.0f32..0.44, step in 0.001f32..0.1) {
        let a = t201_current(pin, 100.0, 22);
        let b = t201_current(pin + step, 100.0, 22);
        prop_assert!(b > a);
    }
}
