//! Operator console adapter (UART0 on the target).
//!
//! Carries both directions of the serial link: inbound command bytes for
//! the protocol task, outbound log text and binary telemetry frames.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: a driver on UART0 with zero-timeout reads so the serial
//! task's poll loop never blocks in the driver. On host/test: shared
//! in-memory queues with `sim_*` hooks.

use crate::ports::{Console, ConsoleError};

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_svc::sys::*;

    const UART: uart_port_t = 0;
    const RX_BUFFER: i32 = 512;

    pub struct Esp32Console {
        _private: (),
    }

    impl Esp32Console {
        pub fn new(baud_rate: u32) -> Result<Self, ConsoleError> {
            let config = uart_config_t {
                baud_rate: baud_rate as i32,
                data_bits: uart_word_length_t_UART_DATA_8_BITS,
                parity: uart_parity_t_UART_PARITY_DISABLE,
                stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
                flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
                ..Default::default()
            };
            // SAFETY: one-time UART0 driver install at bootstrap.
            unsafe {
                if uart_param_config(UART, &config) != ESP_OK {
                    return Err(ConsoleError::Io);
                }
                if uart_driver_install(UART, RX_BUFFER, 0, 0, core::ptr::null_mut(), 0) != ESP_OK {
                    return Err(ConsoleError::Io);
                }
            }
            Ok(Self { _private: () })
        }
    }

    impl Console for Esp32Console {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ConsoleError> {
            // SAFETY: driver installed in new(); zero timeout returns
            // whatever is already buffered.
            let n = unsafe {
                uart_read_bytes(UART, buf.as_mut_ptr().cast(), buf.len() as u32, 0)
            };
            if n < 0 {
                return Err(ConsoleError::Io);
            }
            Ok(n as usize)
        }

        fn write(&mut self, data: &[u8]) -> Result<(), ConsoleError> {
            // SAFETY: driver installed in new().
            let n = unsafe { uart_write_bytes(UART, data.as_ptr().cast(), data.len()) };
            if n < 0 {
                return Err(ConsoleError::Io);
            }
            Ok(())
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::Esp32Console;

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    static SIM_INPUT: Mutex<VecDeque<u8>> = Mutex::new(VecDeque::new());
    static SIM_OUTPUT: Mutex<Vec<u8>> = Mutex::new(Vec::new());

    /// Queue operator keystrokes for the protocol task.
    pub fn sim_push_console_input(bytes: &[u8]) {
        if let Ok(mut input) = SIM_INPUT.lock() {
            input.extend(bytes.iter().copied());
        }
    }

    /// Drain everything the firmware has written to the console.
    pub fn sim_take_console_output() -> Vec<u8> {
        match SIM_OUTPUT.lock() {
            Ok(mut output) => core::mem::take(&mut *output),
            Err(_) => Vec::new(),
        }
    }

    #[derive(Default)]
    pub struct SimConsole;

    impl SimConsole {
        pub fn new() -> Self {
            Self
        }
    }

    impl Console for SimConsole {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ConsoleError> {
            let mut input = SIM_INPUT.lock().map_err(|_| ConsoleError::Io)?;
            let mut n = 0;
            while n < buf.len() {
                match input.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }

        fn write(&mut self, data: &[u8]) -> Result<(), ConsoleError> {
            SIM_OUTPUT
                .lock()
                .map_err(|_| ConsoleError::Io)?
                .extend_from_slice(data);
            Ok(())
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{sim_push_console_input, sim_take_console_output, SimConsole};

/// The console backend for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultConsole = Esp32Console;
#[cfg(not(target_os = "espidf"))]
pub type DefaultConsole = SimConsole;

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn reads_drain_pushed_input() {
        let _ = sim_take_console_output();
        let mut console = SimConsole::new();
        sim_push_console_input(b"B2\r");
        let mut buf = [0u8; 8];
        let n = console.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"B2\r");
        assert_eq!(console.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn writes_are_captured() {
        let _ = sim_take_console_output();
        let mut console = SimConsole::new();
        console.write(b"hello").unwrap();
        console.write(b" boat").unwrap();
        assert_eq!(sim_take_console_output(), b"hello boat");
    }
}
