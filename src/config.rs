//! System configuration parameters
//!
//! All tunable parameters for the boat companion firmware. Values ship with
//! the defaults used on the boat and can be overridden before task spawn
//! (e.g. from a JSON blob on the debug console during bench bring-up).

use serde::{Deserialize, Serialize};

/// A WiFi network the bootstrap glue may associate with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub ssid: String,
    pub password: String,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Sampling periods ---
    /// Temperature acquisition period (seconds). Implemented as a bounded
    /// mailbox wait so a rescan command interrupts the sleep.
    pub temperature_period_secs: u16,
    /// GPS acquisition period (seconds)
    pub gps_period_secs: u16,
    /// Instrumentation (ADS1115) acquisition period (seconds)
    pub instrumentation_period_secs: u16,
    /// Auxiliary analog poll / calibration mailbox poll (milliseconds)
    pub aux_poll_ms: u32,
    /// Encoder poll period (milliseconds) — near-continuous for responsiveness
    pub encoder_poll_ms: u32,
    /// Status beacon mailbox poll (milliseconds)
    pub beacon_poll_ms: u32,
    /// Task headroom report period (seconds)
    pub diagnostics_period_secs: u32,

    // --- Filtering ---
    /// Moving-average window N: filtered' = (sample + filtered*N) / (N+1)
    pub filter_window: u16,

    // --- Current-sensor calibration ---
    /// Samples averaged per calibration step
    pub calibration_samples: u32,
    /// Interval between calibration samples (milliseconds)
    pub calibration_sample_interval_ms: u32,
    /// Timeout before the applied-current prompt repeats (milliseconds)
    pub calibration_prompt_timeout_ms: u32,

    // --- Temperature probes ---
    /// 1-Wire address of the motor probe. All-zero means "unassigned,
    /// resolve by bus discovery".
    pub motor_probe_address: [u8; 8],
    /// 1-Wire address of the MPPT probe.
    pub mppt_probe_address: [u8; 8],

    // --- Network (bootstrap glue only) ---
    /// Candidate networks tried in order until one associates.
    pub wifi_networks: Vec<WifiNetwork>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Sampling
            temperature_period_secs: 10,
            gps_period_secs: 6,
            instrumentation_period_secs: 8,
            aux_poll_ms: 100,
            encoder_poll_ms: 5,
            beacon_poll_ms: 100,
            diagnostics_period_secs: 25,

            // Filtering
            filter_window: 4,

            // Calibration
            calibration_samples: 50,
            calibration_sample_interval_ms: 100,
            calibration_prompt_timeout_ms: 8000,

            // Probes — the motor probe address is printed on its cable tag;
            // the MPPT probe is resolved by discovery.
            motor_probe_address: [0x28, 0x86, 0x1C, 0x07, 0xD6, 0x01, 0x3C, 0x8C],
            mppt_probe_address: [0; 8],

            // Network
            wifi_networks: vec![
                WifiNetwork {
                    ssid: "Ursula".into(),
                    password: "biaviad36".into(),
                },
                WifiNetwork {
                    ssid: "EMobil 1".into(),
                    password: "faraboia".into(),
                },
            ],
        }
    }
}
