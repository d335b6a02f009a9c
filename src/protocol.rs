//! Serial command protocol: line framing, parsing, dispatch.
//!
//! A best-effort diagnostic channel, not a transactional protocol — no
//! acknowledgement, no retry. One verb byte, optional payload, terminated
//! by CR, LF, or a full buffer. Anything unrecognized is logged and
//! dropped; a malformed line must never disturb a running task.

use log::{info, warn};

use crate::commands::{AuxCommand, BlinkRate, GpsOutputMode, TemperatureCommand};
use crate::mailbox::Hub;
use crate::ports::HttpFetch;

/// Line buffer capacity. Long enough for a `R<url>` diagnostic fetch;
/// a longer line is force-terminated rather than grown.
pub const LINE_CAPACITY: usize = 64;

/// Accumulates console bytes into terminated lines.
///
/// A line ends on CR, LF, or when the buffer fills, whichever comes first.
/// Empty lines (bare CR/LF, CRLF pairs) are swallowed.
pub struct LineFramer {
    buf: heapless::Vec<u8, LINE_CAPACITY>,
    finished: heapless::Vec<u8, LINE_CAPACITY>,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            finished: heapless::Vec::new(),
        }
    }

    /// Feed one byte. Returns a complete line when this byte terminated one.
    /// The returned slice is valid until the next call.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        match byte {
            b'\r' | b'\n' => {
                if self.buf.is_empty() {
                    return None;
                }
                self.finished = core::mem::take(&mut self.buf);
                Some(&self.finished)
            }
            _ => {
                if self.buf.push(byte).is_err() {
                    // Forced cut; the overflowing byte is dropped.
                    self.finished = core::mem::take(&mut self.buf);
                    return Some(&self.finished);
                }
                None
            }
        }
    }
}

/// A parsed serial command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `B<code>` — select the steady beacon rate.
    Beacon(BlinkRate),
    /// `R<url>` — ad-hoc HTTP GET, response printed to the console.
    HttpGet(heapless::String<{ LINE_CAPACITY - 1 }>),
    /// `T` — re-scan the temperature probe bus.
    RescanProbes,
    /// `G<code>` — GPS diagnostic output mode.
    GpsOutput(GpsOutputMode),
    /// `C<float>` — applied calibration current.
    CalibrationCurrent(f32),
    /// `Q` — restart the current-sensor calibration.
    CalibrationRestart,
}

/// Parse one terminated line. `None` means the line carried nothing
/// actionable: unknown verb, bad payload, or empty.
pub fn parse(line: &[u8]) -> Option<Command> {
    let (&verb, payload) = line.split_first()?;
    match verb {
        b'B' => match payload.first().copied().and_then(BlinkRate::from_code) {
            Some(rate) => Some(Command::Beacon(rate)),
            None => {
                warn!("invalid blink rate payload: {payload:?}");
                None
            }
        },
        b'R' => {
            let url = core::str::from_utf8(payload).ok()?;
            let url = heapless::String::try_from(url.trim()).ok()?;
            Some(Command::HttpGet(url))
        }
        b'T' => Some(Command::RescanProbes),
        b'G' => match payload.first().copied().and_then(GpsOutputMode::from_code) {
            Some(mode) => Some(Command::GpsOutput(mode)),
            None => {
                warn!("invalid GPS output mode payload: {payload:?}");
                None
            }
        },
        b'C' => match core::str::from_utf8(payload).ok()?.trim().parse::<f32>() {
            Ok(amps) => Some(Command::CalibrationCurrent(amps)),
            Err(_) => {
                // Unparseable floats are dropped so a typo cannot feed the
                // calibration a garbage reference current.
                warn!("unparseable calibration current: {payload:?}");
                None
            }
        },
        b'Q' => Some(Command::CalibrationRestart),
        other => {
            info!("unrecognized command verb: {:?}", other as char);
            None
        }
    }
}

/// Routes parsed commands to their consumer mailboxes.
pub struct Dispatcher<H: HttpFetch> {
    hub: &'static Hub,
    http: H,
}

impl<H: HttpFetch> Dispatcher<H> {
    pub fn new(hub: &'static Hub, http: H) -> Self {
        Self { hub, http }
    }

    /// Frame, parse, and dispatch one input byte.
    pub fn feed(&mut self, framer: &mut LineFramer, byte: u8) {
        if let Some(line) = framer.push(byte) {
            let owned: heapless::Vec<u8, LINE_CAPACITY> =
                heapless::Vec::from_slice(line).unwrap_or_default();
            if let Some(command) = parse(&owned) {
                self.dispatch(command);
            }
        }
    }

    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::Beacon(rate) => self.hub.beacon.send(rate),
            Command::HttpGet(url) => {
                if !self.hub.net_ready.is_ready() {
                    warn!("GET {url} skipped: network not associated yet");
                    return;
                }
                match self.http.get_text(&url) {
                    Ok(body) => info!("GET {url}: {body}"),
                    Err(e) => warn!("GET {url} failed: {e:?}"),
                }
            }
            Command::RescanProbes => self.hub.temperature.send(TemperatureCommand::RescanProbes),
            Command::GpsOutput(mode) => self.hub.gps.send(mode),
            Command::CalibrationCurrent(amps) => {
                self.hub.auxiliary.send(AuxCommand::Current(amps));
            }
            Command::CalibrationRestart => self.hub.auxiliary.send(AuxCommand::Calibrate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::HttpError;

    struct NoHttp;
    impl HttpFetch for NoHttp {
        fn get_text(&mut self, _url: &str) -> Result<String, HttpError> {
            Err(HttpError::Connect)
        }
    }

    struct CountingHttp(u32);
    impl HttpFetch for CountingHttp {
        fn get_text(&mut self, _url: &str) -> Result<String, HttpError> {
            self.0 += 1;
            Ok("ok".into())
        }
    }

    fn feed_line<H: HttpFetch>(dispatcher: &mut Dispatcher<H>, line: &[u8]) {
        let mut framer = LineFramer::new();
        for &b in line {
            dispatcher.feed(&mut framer, b);
        }
    }

    #[test]
    fn b2_sends_exactly_one_fast_notification() {
        let hub = Hub::leak();
        let mut dispatcher = Dispatcher::new(hub, NoHttp);
        feed_line(&mut dispatcher, b"B2\r");

        assert_eq!(hub.beacon.try_recv(), Some(BlinkRate::Fast));
        assert_eq!(hub.beacon.try_recv(), None);
        assert_eq!(hub.temperature.try_recv(), None);
        assert_eq!(hub.gps.try_recv(), None);
        assert_eq!(hub.auxiliary.try_recv(), None);
    }

    #[test]
    fn unknown_verb_produces_no_state_change() {
        let hub = Hub::leak();
        let mut dispatcher = Dispatcher::new(hub, NoHttp);
        feed_line(&mut dispatcher, b"Zx\r");

        assert_eq!(hub.beacon.try_recv(), None);
        assert_eq!(hub.temperature.try_recv(), None);
        assert_eq!(hub.gps.try_recv(), None);
        assert_eq!(hub.auxiliary.try_recv(), None);
    }

    #[test]
    fn http_get_waits_for_network_association() {
        let hub = Hub::leak();
        let mut dispatcher = Dispatcher::new(hub, CountingHttp(0));
        feed_line(&mut dispatcher, b"Rhttp://example.com/x\r");
        assert_eq!(dispatcher.http.0, 0);

        hub.net_ready.mark_ready();
        feed_line(&mut dispatcher, b"Rhttp://example.com/x\r");
        assert_eq!(dispatcher.http.0, 1);
    }

    #[test]
    fn calibration_current_parses_float_payload() {
        assert_eq!(parse(b"C5.0"), Some(Command::CalibrationCurrent(5.0)));
        assert_eq!(parse(b"C 12.25"), Some(Command::CalibrationCurrent(12.25)));
    }

    #[test]
    fn unparseable_float_is_dropped() {
        assert_eq!(parse(b"C"), None);
        assert_eq!(parse(b"Cabc"), None);
    }

    #[test]
    fn rescan_and_restart_verbs() {
        assert_eq!(parse(b"T"), Some(Command::RescanProbes));
        assert_eq!(parse(b"Q"), Some(Command::CalibrationRestart));
        assert_eq!(
            parse(b"G1"),
            Some(Command::GpsOutput(GpsOutputMode::Raw))
        );
    }

    #[test]
    fn framer_terminates_on_cr_lf_or_full_buffer() {
        let mut framer = LineFramer::new();
        for &b in b"B2" {
            assert_eq!(framer.push(b), None);
        }
        assert_eq!(framer.push(b'\r'), Some(&b"B2"[..]));
        // Trailing LF of a CRLF pair is swallowed.
        assert_eq!(framer.push(b'\n'), None);

        let mut framer = LineFramer::new();
        let mut cut = None;
        for i in 0..=LINE_CAPACITY {
            if let Some(line) = framer.push(b'a') {
                cut = Some(line.len());
                break;
            }
            assert!(i < LINE_CAPACITY, "framer never cut the line");
        }
        assert_eq!(cut, Some(LINE_CAPACITY));
    }

    #[test]
    fn empty_lines_are_swallowed() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b'\r'), None);
        assert_eq!(framer.push(b'\n'), None);
    }
}
