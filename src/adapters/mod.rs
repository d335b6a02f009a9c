//! Hardware adapters behind the traits in [`crate::ports`].
//!
//! Every adapter is dual-target: an ESP-IDF backend compiled for the
//! boat and a simulation backend for host builds and tests. Each module
//! exports a `Default*` alias naming the backend for the current target.

pub mod aux_inputs;
pub mod console;
pub mod encoder;
pub mod gps;
pub mod http;
pub mod indicator;
pub mod instrumentation;
pub mod nvs;
pub mod probes;
pub mod throttle;
