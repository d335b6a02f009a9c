//! Telemetry records and their length-prefix wire framing.
//!
//! Wire format:
//! ```text
//! ┌────────────┬─────────────────────────┐
//! │ Length (4B)│ postcard payload (N B)  │
//! │ LE u32     │                         │
//! └────────────┴─────────────────────────┘
//! ```
//!
//! Acquisition tasks publish [`TelemetryRecord`]s; the serial task encodes
//! them into frames and writes them to the console alongside human-readable
//! log lines. The decoder accumulates incoming bytes and yields complete
//! payloads, tolerating partial reads and concatenated frames.

use serde::{Deserialize, Serialize};

use crate::state::{GpsSnapshot, InstrumentationSnapshot, TemperaturesSnapshot};

/// Maximum frame payload size. Records are small; anything larger is a
/// corrupt header.
pub const MAX_PAYLOAD: usize = 60;

/// Frame header size (4-byte little-endian length).
const HEADER_SIZE: usize = 4;

/// A complete encoded frame, header included.
pub type Frame = heapless::Vec<u8, { HEADER_SIZE + MAX_PAYLOAD }>;

/// One published measurement set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TelemetryRecord {
    Instrumentation(InstrumentationSnapshot),
    Temperatures(TemperaturesSnapshot),
    Gps(GpsSnapshot),
}

/// Encode a record into a length-prefixed frame.
///
/// Returns `None` only if the serialized record exceeds [`MAX_PAYLOAD`],
/// which cannot happen for the record variants defined here.
pub fn encode(record: &TelemetryRecord) -> Option<Frame> {
    let mut payload = [0u8; MAX_PAYLOAD];
    let used = postcard::to_slice(record, &mut payload).ok()?.len();

    let mut frame = Frame::new();
    frame
        .extend_from_slice(&u32::try_from(used).ok()?.to_le_bytes())
        .ok()?;
    frame.extend_from_slice(&payload[..used]).ok()?;
    Some(frame)
}

/// Decoder state machine.
enum DecoderState {
    /// Waiting for header bytes.
    ReadingHeader { collected: usize },
    /// Header received, reading payload.
    ReadingPayload { expected: usize, collected: usize },
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    state: DecoderState,
    header_buf: [u8; HEADER_SIZE],
    payload_buf: [u8; MAX_PAYLOAD],
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingHeader { collected: 0 },
            header_buf: [0; HEADER_SIZE],
            payload_buf: [0; MAX_PAYLOAD],
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns `Some(record)` when a complete, well-formed record has been
    /// assembled. A frame whose length header is zero or oversized is
    /// discarded and decoding restarts at the next byte boundary.
    pub fn feed(&mut self, data: &[u8]) -> Option<TelemetryRecord> {
        let mut offset = 0;

        while offset < data.len() {
            match &mut self.state {
                DecoderState::ReadingHeader { collected } => {
                    let needed = HEADER_SIZE - *collected;
                    let to_copy = needed.min(data.len() - offset);

                    self.header_buf[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);

                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == HEADER_SIZE {
                        let expected = u32::from_le_bytes(self.header_buf) as usize;

                        if expected == 0 || expected > MAX_PAYLOAD {
                            self.state = DecoderState::ReadingHeader { collected: 0 };
                            continue;
                        }

                        self.state = DecoderState::ReadingPayload {
                            expected,
                            collected: 0,
                        };
                    }
                }

                DecoderState::ReadingPayload { expected, collected } => {
                    let needed = *expected - *collected;
                    let to_copy = needed.min(data.len() - offset);

                    self.payload_buf[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);

                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == *expected {
                        let len = *expected;
                        self.state = DecoderState::ReadingHeader { collected: 0 };
                        if let Ok(record) = postcard::from_bytes(&self.payload_buf[..len]) {
                            return Some(record);
                        }
                    }
                }
            }
        }

        None
    }

    /// Reset decoder state (e.g. after a console reconnect).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingHeader { collected: 0 };
    }
}
