//! DS18B20 temperature probe adapter (1-Wire behind [`ProbeBus`]).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-banged 1-Wire on an open-drain GPIO with busy-wait
//! timing, plus a dedicated power GPIO held high for the probe pair.
//! Timing-critical slots run under a critical section so a preemption
//! cannot stretch a write slot past its window.
//!
//! On host/test: an address→temperature map with `sim_*` injection hooks.

use crate::ports::{ProbeAddress, ProbeBus, ProbeError};

/// Maxim 1-Wire CRC-8 (polynomial 0x31 reflected).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &byte in data {
        let mut byte = byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

/// Scratchpad temperature registers to degrees Celsius (1/16 steps).
pub fn scratchpad_celsius(lsb: u8, msb: u8) -> f32 {
    f32::from(i16::from_le_bytes([lsb, msb])) / 16.0
}

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use crate::state::TEMPERATURE_DISCONNECTED;
    use esp_idf_hal::delay::Ets;
    use esp_idf_hal::gpio::{AnyIOPin, Output, PinDriver};

    const CMD_SKIP_ROM: u8 = 0xCC;
    const CMD_MATCH_ROM: u8 = 0x55;
    const CMD_SEARCH_ROM: u8 = 0xF0;
    const CMD_CONVERT_T: u8 = 0x44;
    const CMD_READ_SCRATCHPAD: u8 = 0xBE;

    /// DS18B20 family code; anything else on the bus is skipped.
    const FAMILY_DS18B20: u8 = 0x28;

    pub struct Esp32ProbeBus {
        bus: PinDriver<'static, AnyIOPin, esp_idf_hal::gpio::InputOutput>,
        _power: PinDriver<'static, AnyIOPin, Output>,
    }

    impl Esp32ProbeBus {
        pub fn new(bus_pin: AnyIOPin, power_pin: AnyIOPin) -> Result<Self, ProbeError> {
            let mut power = PinDriver::output(power_pin).map_err(|_| ProbeError::Bus)?;
            power.set_high().map_err(|_| ProbeError::Bus)?;
            let mut bus = PinDriver::input_output_od(bus_pin).map_err(|_| ProbeError::Bus)?;
            bus.set_high().map_err(|_| ProbeError::Bus)?;
            Ok(Self { bus, _power: power })
        }

        /// Reset pulse; `Ok(true)` when at least one device answers presence.
        fn reset(&mut self) -> Result<bool, ProbeError> {
            self.bus.set_low().map_err(|_| ProbeError::Bus)?;
            Ets::delay_us(480);
            self.bus.set_high().map_err(|_| ProbeError::Bus)?;
            Ets::delay_us(70);
            let present = self.bus.is_low();
            Ets::delay_us(410);
            Ok(present)
        }

        fn write_bit(&mut self, bit: bool) -> Result<(), ProbeError> {
            esp_idf_hal::interrupt::free(|| {
                self.bus.set_low().map_err(|_| ProbeError::Bus)?;
                Ets::delay_us(if bit { 6 } else { 60 });
                self.bus.set_high().map_err(|_| ProbeError::Bus)?;
                Ets::delay_us(if bit { 64 } else { 10 });
                Ok(())
            })
        }

        fn read_bit(&mut self) -> Result<bool, ProbeError> {
            esp_idf_hal::interrupt::free(|| {
                self.bus.set_low().map_err(|_| ProbeError::Bus)?;
                Ets::delay_us(6);
                self.bus.set_high().map_err(|_| ProbeError::Bus)?;
                Ets::delay_us(9);
                let bit = self.bus.is_high();
                Ets::delay_us(55);
                Ok(bit)
            })
        }

        fn write_byte(&mut self, byte: u8) -> Result<(), ProbeError> {
            for i in 0..8 {
                self.write_bit(byte & (1 << i) != 0)?;
            }
            Ok(())
        }

        fn read_byte(&mut self) -> Result<u8, ProbeError> {
            let mut byte = 0u8;
            for i in 0..8 {
                if self.read_bit()? {
                    byte |= 1 << i;
                }
            }
            Ok(byte)
        }

        fn select(&mut self, address: &ProbeAddress) -> Result<(), ProbeError> {
            self.write_byte(CMD_MATCH_ROM)?;
            for &byte in address {
                self.write_byte(byte)?;
            }
            Ok(())
        }

        /// One step of the standard Maxim ROM search. Returns the found
        /// address and the last bit position that had a discrepancy.
        fn search_step(&mut self, last_discrepancy: i8) -> Result<Option<(ProbeAddress, i8)>, ProbeError> {
            if !self.reset()? {
                return Ok(None);
            }
            self.write_byte(CMD_SEARCH_ROM)?;

            let mut address = [0u8; 8];
            let mut discrepancy: i8 = -1;
            for bit_index in 0..64i8 {
                let bit = self.read_bit()?;
                let complement = self.read_bit()?;
                let chosen = match (bit, complement) {
                    (true, true) => return Ok(None), // no device participating
                    (true, false) => true,
                    (false, true) => false,
                    (false, false) => {
                        // Both branches populated; walk 0 first, then 1.
                        if bit_index == last_discrepancy {
                            true
                        } else if bit_index > last_discrepancy {
                            discrepancy = bit_index;
                            false
                        } else {
                            let prev =
                                address[(bit_index / 8) as usize] & (1 << (bit_index % 8)) != 0;
                            if !prev {
                                discrepancy = bit_index;
                            }
                            prev
                        }
                    }
                };
                if chosen {
                    address[(bit_index / 8) as usize] |= 1 << (bit_index % 8);
                }
                self.write_bit(chosen)?;
            }
            Ok(Some((address, discrepancy)))
        }
    }

    impl ProbeBus for Esp32ProbeBus {
        fn scan(&mut self) -> Result<heapless::Vec<ProbeAddress, 4>, ProbeError> {
            let mut found = heapless::Vec::new();
            let mut last_discrepancy: i8 = -1;
            loop {
                match self.search_step(last_discrepancy)? {
                    Some((address, discrepancy)) => {
                        if crc8(&address[..7]) == address[7] && address[0] == FAMILY_DS18B20 {
                            let _ = found.push(address);
                        }
                        if discrepancy < 0 {
                            break;
                        }
                        last_discrepancy = discrepancy;
                    }
                    None => break,
                }
            }
            if found.is_empty() {
                return Err(ProbeError::NoDevices);
            }
            Ok(found)
        }

        fn read_celsius(&mut self, address: &ProbeAddress) -> Result<f32, ProbeError> {
            if !self.reset()? {
                return Ok(TEMPERATURE_DISCONNECTED);
            }
            self.write_byte(CMD_SKIP_ROM)?;
            self.write_byte(CMD_CONVERT_T)?;
            // Max conversion time at 12-bit resolution.
            Ets::delay_ms(750);

            if !self.reset()? {
                return Ok(TEMPERATURE_DISCONNECTED);
            }
            self.select(address)?;
            self.write_byte(CMD_READ_SCRATCHPAD)?;
            let mut scratchpad = [0u8; 9];
            for byte in &mut scratchpad {
                *byte = self.read_byte()?;
            }
            if crc8(&scratchpad[..8]) != scratchpad[8] {
                return Err(ProbeError::Crc);
            }
            Ok(scratchpad_celsius(scratchpad[0], scratchpad[1]))
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::Esp32ProbeBus;

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;
    use crate::state::TEMPERATURE_DISCONNECTED;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    static SIM_PROBES: Mutex<BTreeMap<ProbeAddress, f32>> = Mutex::new(BTreeMap::new());

    fn probes() -> std::sync::MutexGuard<'static, BTreeMap<ProbeAddress, f32>> {
        match SIM_PROBES.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Attach a simulated probe (or update its reading).
    pub fn sim_attach_probe(address: ProbeAddress, celsius: f32) {
        probes().insert(address, celsius);
    }

    /// Detach a simulated probe; reads then report the disconnect sentinel.
    pub fn sim_detach_probe(address: &ProbeAddress) {
        probes().remove(address);
    }

    pub fn sim_clear_probes() {
        probes().clear();
    }

    #[derive(Default)]
    pub struct SimProbeBus;

    impl SimProbeBus {
        pub fn new() -> Self {
            Self
        }
    }

    impl ProbeBus for SimProbeBus {
        fn scan(&mut self) -> Result<heapless::Vec<ProbeAddress, 4>, ProbeError> {
            let map = probes();
            if map.is_empty() {
                return Err(ProbeError::NoDevices);
            }
            let mut found = heapless::Vec::new();
            for address in map.keys().take(4) {
                let _ = found.push(*address);
            }
            Ok(found)
        }

        fn read_celsius(&mut self, address: &ProbeAddress) -> Result<f32, ProbeError> {
            Ok(*probes()
                .get(address)
                .unwrap_or(&TEMPERATURE_DISCONNECTED))
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{sim_attach_probe, sim_clear_probes, sim_detach_probe, SimProbeBus};

/// The probe bus for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultProbeBus = Esp32ProbeBus;
#[cfg(not(target_os = "espidf"))]
pub type DefaultProbeBus = SimProbeBus;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc8_matches_ds18b20_rom_example() {
        // A ROM with a valid CRC byte must verify to that byte.
        let rom = [0x28, 0x86, 0x1C, 0x07, 0xD6, 0x01, 0x3C];
        let crc = crc8(&rom);
        let mut full = [0u8; 8];
        full[..7].copy_from_slice(&rom);
        full[7] = crc;
        assert_eq!(crc8(&full[..7]), full[7]);
        // And a corrupted ROM must not.
        full[2] ^= 0x01;
        assert_ne!(crc8(&full[..7]), full[7]);
    }

    #[test]
    fn scratchpad_conversion_handles_sign() {
        // +25.0625C and -10.125C per the datasheet examples.
        assert_eq!(scratchpad_celsius(0x91, 0x01), 25.0625);
        assert_eq!(scratchpad_celsius(0x5E, 0xFF), -10.125);
    }

    #[cfg(not(target_os = "espidf"))]
    #[test]
    fn sim_bus_scan_and_detach() {
        use crate::state::TEMPERATURE_DISCONNECTED;

        sim_clear_probes();
        let motor = [0x28, 0x86, 0x1C, 0x07, 0xD6, 0x01, 0x3C, 0x8C];
        sim_attach_probe(motor, 61.5);

        let mut bus = SimProbeBus::new();
        let found = bus.scan().unwrap();
        assert!(found.contains(&motor));
        assert_eq!(bus.read_celsius(&motor).unwrap(), 61.5);

        sim_detach_probe(&motor);
        assert_eq!(
            bus.read_celsius(&motor).unwrap(),
            TEMPERATURE_DISCONNECTED
        );
        sim_clear_probes();
    }
}
