//! GPIO / peripheral pin assignments for the boat companion board
//! (ESP32 DevKit).
//!
//! Single source of truth — every adapter references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Status beacon
// ---------------------------------------------------------------------------

/// Built-in LED on the ESP32 DevKit board.
pub const BEACON_LED_GPIO: i32 = 2;
/// Piezo buzzer driven by DAC channel 2 (GPIO 26).
pub const BUZZER_DAC_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// Temperature probes (DS18B20, 1-Wire bus)
// ---------------------------------------------------------------------------

/// Digital output powering the probe pair.
pub const PROBE_POWER_GPIO: i32 = 4;
/// 1-Wire data line shared by all probes.
pub const PROBE_BUS_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// GPS module (NEO-6M on UART2)
// ---------------------------------------------------------------------------

pub const GPS_RX_GPIO: i32 = 16;
pub const GPS_TX_GPIO: i32 = 17;
/// Fixed baud rate of the NEO-6M module.
pub const GPS_BAUD_RATE: u32 = 9600;

// ---------------------------------------------------------------------------
// Instrumentation ADC (ADS1115 over I²C)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// ADS1115 address is selected by a solder bridge on the instrumentation
/// board — either of these may be present.
pub const ADS1115_ADDRESSES: [u8; 2] = [0x48, 0x49];

// ---------------------------------------------------------------------------
// Auxiliary analog inputs (on-chip 12-bit ADC)
// ---------------------------------------------------------------------------

pub const PORT_PUMP_GPIO: i32 = 36;
pub const STARBOARD_PUMP_GPIO: i32 = 39;
pub const AUX_BATTERY_VOLTAGE_GPIO: i32 = 34;
pub const AUX_BATTERY_CURRENT_GPIO: i32 = 35;

// ---------------------------------------------------------------------------
// Throttle control (rotary encoder + DAC output)
// ---------------------------------------------------------------------------

pub const ENCODER_CLOCK_GPIO: i32 = 12;
pub const ENCODER_DATA_GPIO: i32 = 14;
/// Digital output powering the encoder.
pub const ENCODER_POWER_GPIO: i32 = 27;
/// Throttle output on DAC channel 1 (GPIO 25).
pub const THROTTLE_DAC_GPIO: i32 = 25;
