//! AT24C-style serial EEPROM model behind a two-wire bus

use eeprog_core::bus::TwoWireBus;
use eeprog_core::error::{Error, Result};

/// Simulated two-wire serial EEPROM
///
/// Models the device's sequential-read address counter and its silent
/// page wraparound on writes: a page write that runs past the page end
/// folds back to the page start, exactly the corruption the driver's
/// boundary check exists to prevent.
pub struct SimEepromBus {
    device_addr: u8,
    page_size: usize,
    mem: Vec<u8>,
    current_addr: usize,
    /// Write transactions observed
    pub writes: u32,
    /// Read transactions observed
    pub reads: u32,
}

impl SimEepromBus {
    /// Create a 32 KiB part at the given bus address, erased to 0xFF
    pub fn new(device_addr: u8, capacity: usize, page_size: usize) -> Self {
        Self {
            device_addr,
            page_size,
            mem: vec![0xFF; capacity],
            current_addr: 0,
            writes: 0,
            reads: 0,
        }
    }

    /// Default AT24C256 shape: address 0x50, 32 KiB, 64-byte pages
    pub fn at24c256() -> Self {
        Self::new(0x50, 32 * 1024, 64)
    }

    /// Direct view of the memory contents
    pub fn mem(&self) -> &[u8] {
        &self.mem
    }
}

impl TwoWireBus for SimEepromBus {
    fn write_to(&mut self, device_addr: u8, payload: &[u8], _stop: bool) -> Result<()> {
        if device_addr != self.device_addr {
            return Err(Error::Bus);
        }
        if payload.len() < 2 {
            return Err(Error::Bus);
        }
        self.writes += 1;

        let addr = (((payload[0] as usize) << 8) | payload[1] as usize) % self.mem.len();
        self.current_addr = addr;

        // Anything after the address frame is a page write; the
        // internal column counter wraps within the page
        let page_start = addr - addr % self.page_size;
        for (i, &byte) in payload[2..].iter().enumerate() {
            let target = page_start + (addr % self.page_size + i) % self.page_size;
            self.mem[target] = byte;
        }
        Ok(())
    }

    fn read_from(&mut self, device_addr: u8, buf: &mut [u8]) -> Result<()> {
        if device_addr != self.device_addr {
            return Err(Error::Bus);
        }
        self.reads += 1;
        for slot in buf.iter_mut() {
            *slot = self.mem[self.current_addr];
            self.current_addr = (self.current_addr + 1) % self.mem.len();
        }
        Ok(())
    }

    fn scan(&mut self, found: &mut [u8]) -> usize {
        if found.is_empty() {
            return 0;
        }
        found[0] = self.device_addr;
        1
    }

    fn delay_us(&mut self, _us: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeprog_core::eeprom::{EepromConfig, SerialEeprom};
    use eeprog_core::progress::NoProgress;

    fn driver() -> SerialEeprom<SimEepromBus> {
        SerialEeprom::new(SimEepromBus::at24c256(), EepromConfig::default())
    }

    #[test]
    fn byte_round_trip() {
        let mut eeprom = driver();
        eeprom.write_byte(0x1234, 0xA5).unwrap();
        assert_eq!(eeprom.read_byte(0x1234).unwrap(), 0xA5);
    }

    #[test]
    fn bulk_write_chunks_across_page_boundaries() {
        let mut eeprom = driver();
        let data: Vec<u8> = (0..200).map(|i| i as u8).collect();
        // Start mid-page so the first chunk is short
        eeprom.bulk_write(10, &data, &mut NoProgress).unwrap();
        let back = eeprom.read_bytes(10, data.len(), &mut NoProgress).unwrap();
        assert_eq!(back, data);
        // Nothing outside the span was disturbed
        let bus = eeprom.release();
        assert_eq!(bus.mem()[9], 0xFF);
        assert_eq!(bus.mem()[210], 0xFF);
    }

    #[test]
    fn bulk_erase_fills_the_whole_part() {
        let mut eeprom = driver();
        eeprom.write_byte(0, 0x00).unwrap();
        eeprom.write_byte(0x7FFF, 0x00).unwrap();
        eeprom.bulk_erase(0xFF, &mut NoProgress).unwrap();
        let bus = eeprom.release();
        assert!(bus.mem().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn device_wraps_when_driven_past_the_page_end() {
        // Bus-level demonstration of the hardware hazard
        let mut bus = SimEepromBus::at24c256();
        // 4 data bytes starting 2 before the end of page 0
        bus.write_to(0x50, &[0x00, 62, 0x11, 0x22, 0x33, 0x44], true)
            .unwrap();
        assert_eq!(bus.mem()[62], 0x11);
        assert_eq!(bus.mem()[63], 0x22);
        assert_eq!(bus.mem()[0], 0x33);
        assert_eq!(bus.mem()[1], 0x44);
        assert_eq!(bus.mem()[64], 0xFF);
    }
}
