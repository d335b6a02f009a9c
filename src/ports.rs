//! Port traits — the boundary between task logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ task loop (domain)
//! ```
//!
//! Each acquisition or control task consumes its hardware through one of
//! these traits via generics, so the loops run unchanged against the real
//! peripherals on the boat and against in-memory simulations in tests.
//! All port errors are typed; callers handle every variant explicitly.

// ───────────────────────────────────────────────────────────────
// Instrumentation ADC (ADS1115 over I²C)
// ───────────────────────────────────────────────────────────────

/// The four single-ended instrumentation channels, in ADS1115 input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InstrumentationChannel {
    BatteryVoltage = 0,
    MotorCurrent = 1,
    BatteryCurrent = 2,
    MpptCurrent = 3,
}

/// Read-side port for the external instrumentation ADC.
pub trait InstrumentationAdc {
    /// Probe and configure the converter. Returns `Err` when no device
    /// answers at the given address.
    fn init(&mut self, address: u8) -> Result<(), AdcError>;

    /// Single-ended pin voltage of one channel, in volts.
    fn read_volts(&mut self, channel: InstrumentationChannel) -> Result<f32, AdcError>;
}

/// The auxiliary analog inputs on the on-chip 12-bit ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxChannel {
    BatteryVoltage,
    BatteryCurrent,
    PortPump,
    StarboardPump,
}

/// Read-side port for the auxiliary analog inputs.
pub trait AuxInputs {
    /// Raw 12-bit ADC code for one channel.
    fn read_raw(&mut self, channel: AuxChannel) -> Result<u16, AdcError>;
}

// ───────────────────────────────────────────────────────────────
// Temperature probes (DS18B20, 1-Wire)
// ───────────────────────────────────────────────────────────────

/// A 64-bit 1-Wire ROM address.
pub type ProbeAddress = [u8; 8];

/// Read-side port for the DS18B20 probe bus.
pub trait ProbeBus {
    /// Enumerate every device currently answering on the bus.
    fn scan(&mut self) -> Result<heapless::Vec<ProbeAddress, 4>, ProbeError>;

    /// Trigger a conversion and read one probe, in degrees Celsius.
    /// A disconnected probe reports [`crate::state::TEMPERATURE_DISCONNECTED`].
    fn read_celsius(&mut self, address: &ProbeAddress) -> Result<f32, ProbeError>;
}

// ───────────────────────────────────────────────────────────────
// GPS receiver (NEO-6M, UART)
// ───────────────────────────────────────────────────────────────

/// One parsed position report. Fields the sentence burst did not carry are
/// `None` and must not overwrite previous state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsFix {
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    /// Speed over ground, km/h.
    pub speed: Option<f32>,
    /// Course over ground, degrees.
    pub course: Option<f32>,
    pub satellite_count: Option<u8>,
}

/// Read-side port for the GPS module.
pub trait GpsReceiver {
    /// Drain pending NMEA bytes and return a fix if a complete, valid
    /// sentence burst was parsed. `Ok(None)` means no new data.
    fn poll(&mut self) -> Result<Option<GpsFix>, GpsError>;

    /// Raw NMEA bytes drained since the last poll, for the `G1` diagnostic
    /// output mode. Empty slice when nothing arrived.
    fn raw_pending(&mut self) -> &[u8];
}

// ───────────────────────────────────────────────────────────────
// Throttle (rotary encoder in, DAC out)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the throttle rotary encoder.
pub trait RotaryEncoder {
    /// Detent steps turned since the last poll; negative is counter-clockwise.
    fn delta(&mut self) -> i32;
}

/// Write-side port for the throttle DAC.
pub trait ThrottleDac {
    /// Set the raw 8-bit output code.
    fn write_code(&mut self, code: u8) -> Result<(), DacError>;
}

// ───────────────────────────────────────────────────────────────
// Status beacon (LED + buzzer)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the status beacon hardware.
pub trait Indicator {
    fn set_led(&mut self, on: bool);
    fn set_buzzer(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Serial console
// ───────────────────────────────────────────────────────────────

/// Byte-stream port for the operator console.
pub trait Console {
    /// Non-blocking read of pending input bytes. Returns the number of
    /// bytes placed in `buf`; zero when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ConsoleError>;

    /// Write bytes to the console.
    fn write(&mut self, data: &[u8]) -> Result<(), ConsoleError>;
}

// ───────────────────────────────────────────────────────────────
// HTTP client (serial `R` verb)
// ───────────────────────────────────────────────────────────────

/// Minimal driven port for the on-demand HTTP fetch diagnostic.
pub trait HttpFetch {
    /// GET `url` and return the response body as text.
    fn get_text(&mut self, url: &str) -> Result<String, HttpError>;
}

// ───────────────────────────────────────────────────────────────
// Persistent float storage (calibration factors)
// ───────────────────────────────────────────────────────────────

/// Namespaced float key-value storage backed by NVS on the target.
///
/// Writes are atomic; power loss mid-write leaves the previous value.
pub trait FloatStore {
    /// Read a float, returning `default` when the key does not exist.
    fn get_float(&self, namespace: &str, key: &str, default: f32) -> Result<f32, StorageError>;

    /// Write a float atomically.
    fn put_float(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcError {
    /// No device answered at the probed address.
    NotDetected,
    /// I²C or on-chip ADC transaction failed.
    Bus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeError {
    /// No presence pulse on the bus.
    NoDevices,
    /// CRC mismatch on a scratchpad read.
    Crc,
    /// Bus-level failure.
    Bus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsError {
    /// UART-level failure.
    Uart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DacError {
    /// DAC peripheral rejected the write.
    Hardware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// Underlying stream I/O failure.
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// Connection or request failure.
    Connect,
    /// Non-success status or unreadable body.
    BadResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for AdcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotDetected => write!(f, "ADC not detected"),
            Self::Bus => write!(f, "ADC bus error"),
        }
    }
}

impl core::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoDevices => write!(f, "no probes on bus"),
            Self::Crc => write!(f, "probe CRC mismatch"),
            Self::Bus => write!(f, "probe bus error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
