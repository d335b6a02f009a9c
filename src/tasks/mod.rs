//! Long-running task loops, one per subsystem.
//!
//! Each task is a blocking thread body that drives a small async loop with
//! `futures_lite::future::block_on` — the async part exists only so a
//! mailbox receive can double as the periodic sleep. Tasks touch hardware
//! exclusively through the [`crate::ports`] traits, so every loop here
//! also runs against the simulation adapters on the host.

pub mod auxiliary;
pub mod beacon;
pub mod encoder;
pub mod gps;
pub mod instrumentation;
pub mod monitor;
pub mod serial;
pub mod spawn;
pub mod temperature;
