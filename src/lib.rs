//! Onboard companion firmware for an electric solar boat (ESP32).
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Ads1115/I²C   DS18B20 bus   NEO-6M UART   on-chip ADC/DAC     │
//! │  NVS floats    UART0 console  HTTP client   LED+buzzer         │
//! │                                                                │
//! │  ──────────────── Port trait boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Task loops (acquisition, control, serial, monitor)    │    │
//! │  │  conditioning · calibration · protocol · beacon engine │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  SystemState store · mailbox Hub · telemetry framing           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds and tests run the simulation adapters.

#![deny(unused_must_use)]

pub mod calibration;
pub mod commands;
pub mod conditioning;
pub mod config;
pub mod diagnostics;
pub mod logging;
pub mod mailbox;
pub mod ports;
pub mod protocol;
pub mod state;
pub mod telemetry;

pub mod adapters;
pub mod drivers;
pub mod tasks;

pub mod pins;

mod esp_link_shims;
