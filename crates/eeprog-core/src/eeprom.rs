//! Serial EEPROM driver (AT24C-class, two-wire bus)
//!
//! Every transaction frames a two-byte big-endian memory address. The
//! device has no status register, so write completion is handled by a
//! fixed settle delay after every write; the delay must stay
//! conservative against the datasheet write-cycle maximum.
//!
//! The load-bearing safety check lives in [`SerialEeprom::write_page`]:
//! the chip wraps page writes silently and corrupts unrelated bytes,
//! so any request crossing a page boundary is rejected before a single
//! bus transaction is issued.

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::bus::TwoWireBus;
use crate::error::{Error, Result};
use crate::progress::Progress;

/// Largest page size supported without heap allocation
const MAX_PAGE: usize = 256;

/// Chip-dependent parameters for a two-wire serial EEPROM
///
/// The default describes a 32 KiB AT24C256: 64-byte pages, 5 ms write
/// cycle.
#[derive(Debug, Clone)]
pub struct EepromConfig {
    /// 7-bit device address on the bus
    pub device_addr: u8,
    /// Total capacity in bytes
    pub capacity: u32,
    /// Write page size in bytes
    pub page_size: u32,
    /// Post-write settle time; the chip gives no busy signal
    pub write_cycle_us: u32,
    /// Largest single read transaction
    pub read_chunk: u32,
    /// Report progress every this many bytes
    pub progress_interval: u32,
}

impl Default for EepromConfig {
    fn default() -> Self {
        Self {
            device_addr: 0x50,
            capacity: 32 * 1024,
            page_size: 64,
            write_cycle_us: 5_000,
            read_chunk: 128,
            progress_interval: 500,
        }
    }
}

/// Driver for a serial EEPROM on a two-wire bus
pub struct SerialEeprom<B: TwoWireBus> {
    bus: B,
    config: EepromConfig,
}

impl<B: TwoWireBus> SerialEeprom<B> {
    /// Create a driver over `bus` with the given chip parameters
    pub fn new(bus: B, config: EepromConfig) -> Self {
        assert!(config.page_size as usize <= MAX_PAGE);
        Self { bus, config }
    }

    /// Chip parameters this driver was constructed with
    pub fn config(&self) -> &EepromConfig {
        &self.config
    }

    /// Consume the driver and return the bus handle
    pub fn release(self) -> B {
        self.bus
    }

    /// Scan the bus and warn when the expected device is missing
    ///
    /// Advisory only: the device may still respond to addressed
    /// transactions even when the scan misses it.
    pub fn probe(&mut self) {
        let mut found = [0u8; 128];
        let n = self.bus.scan(&mut found);
        if !found[..n].contains(&self.config.device_addr) {
            log::warn!(
                "EEPROM not found at 0x{:02X} ({} other devices on the bus)",
                self.config.device_addr,
                n
            );
        }
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        if addr >= self.config.capacity
            || addr as u64 + len as u64 > self.config.capacity as u64
        {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(())
    }

    fn settle(&mut self) {
        self.bus.delay_us(self.config.write_cycle_us);
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Read a single byte
    pub fn read_byte(&mut self, addr: u32) -> Result<u8> {
        self.check_range(addr, 1)?;
        let frame = [(addr >> 8) as u8, addr as u8];
        // Address write without stop, then an addressed read
        self.bus.write_to(self.config.device_addr, &frame, false)?;
        let mut buf = [0u8; 1];
        self.bus.read_from(self.config.device_addr, &mut buf)?;
        Ok(buf[0])
    }

    /// Read `buf.len()` bytes starting at `addr`, chunked at the
    /// configured transaction size
    pub fn read_into<P: Progress>(
        &mut self,
        addr: u32,
        buf: &mut [u8],
        progress: &mut P,
    ) -> Result<()> {
        self.check_range(addr, buf.len())?;

        let chunk_size = (self.config.read_chunk as usize).max(1);
        let interval = self.config.progress_interval;
        let mut offset = 0usize;
        let mut next_report = 0u32;
        while offset < buf.len() {
            let cur = addr + offset as u32;
            if cur >= next_report {
                progress.report("read", cur);
                next_report = cur.saturating_add(interval);
            }
            let len = chunk_size.min(buf.len() - offset);
            let frame = [(cur >> 8) as u8, cur as u8];
            self.bus.write_to(self.config.device_addr, &frame, false)?;
            self.bus
                .read_from(self.config.device_addr, &mut buf[offset..offset + len])?;
            offset += len;
        }
        Ok(())
    }

    /// Read `len` bytes starting at `addr` into a new buffer
    #[cfg(feature = "alloc")]
    pub fn read_bytes<P: Progress>(
        &mut self,
        addr: u32,
        len: usize,
        progress: &mut P,
    ) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(addr, &mut buf, progress)?;
        Ok(buf)
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Write a single byte, then settle for the write cycle
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        self.check_range(addr, 1)?;
        let frame = [(addr >> 8) as u8, addr as u8, value];
        self.bus.write_to(self.config.device_addr, &frame, true)?;
        self.settle();
        Ok(())
    }

    /// Write up to one page at `addr`, then settle
    ///
    /// Rejects any request whose span crosses a page boundary, before
    /// any bus transaction. The device would wrap to the start of the
    /// same page instead of advancing, corrupting bytes the caller
    /// never addressed.
    pub fn write_page(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let page = self.config.page_size;
        if (addr % page) as u64 + data.len() as u64 > page as u64 {
            return Err(Error::PageBoundary {
                addr,
                len: data.len() as u32,
                page_size: page,
            });
        }
        self.check_range(addr, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        let mut frame = [0u8; 2 + MAX_PAGE];
        frame[0] = (addr >> 8) as u8;
        frame[1] = addr as u8;
        frame[2..2 + data.len()].copy_from_slice(data);
        self.bus
            .write_to(self.config.device_addr, &frame[..2 + data.len()], true)?;
        self.settle();
        Ok(())
    }

    /// Write an arbitrary span, chunked at page boundaries
    pub fn bulk_write<P: Progress>(
        &mut self,
        addr: u32,
        data: &[u8],
        progress: &mut P,
    ) -> Result<()> {
        self.check_range(addr, data.len())?;

        let page = self.config.page_size;
        let interval = self.config.progress_interval;
        let mut offset = 0usize;
        let mut next_report = 0u32;

        while offset < data.len() {
            let cur = addr + offset as u32;
            let room = (page - (cur % page)) as usize;
            let len = room.min(data.len() - offset);
            if cur >= next_report {
                progress.report("write", cur);
                next_report = cur.saturating_add(interval);
            }
            self.write_page(cur, &data[offset..offset + len])?;
            offset += len;
        }
        Ok(())
    }

    /// Overwrite the entire part with `fill`
    ///
    /// The chip has no erase command; a bulk fill is the equivalent.
    pub fn bulk_erase<P: Progress>(&mut self, fill: u8, progress: &mut P) -> Result<()> {
        let page = self.config.page_size as usize;
        let interval = self.config.progress_interval;
        let pattern = [fill; MAX_PAGE];
        let mut addr = 0u32;
        let mut next_report = 0u32;

        while addr < self.config.capacity {
            if addr >= next_report {
                progress.report("erase", addr);
                next_report = addr.saturating_add(interval);
            }
            self.write_page(addr, &pattern[..page])?;
            addr += page as u32;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::TwoWireBus;

    /// Stub transport that counts transactions.
    struct CountingBus {
        writes: u32,
        reads: u32,
    }

    impl CountingBus {
        fn new() -> Self {
            Self { writes: 0, reads: 0 }
        }
    }

    impl TwoWireBus for CountingBus {
        fn write_to(&mut self, _dev: u8, _payload: &[u8], _stop: bool) -> Result<()> {
            self.writes += 1;
            Ok(())
        }
        fn read_from(&mut self, _dev: u8, buf: &mut [u8]) -> Result<()> {
            self.reads += 1;
            buf.fill(0xFF);
            Ok(())
        }
        fn scan(&mut self, _found: &mut [u8]) -> usize {
            0
        }
        fn delay_us(&mut self, _us: u32) {}
    }

    #[test]
    fn page_boundary_crossing_is_rejected_without_bus_traffic() {
        let mut eeprom = SerialEeprom::new(CountingBus::new(), EepromConfig::default());
        // 60 + 8 crosses the 64-byte boundary
        let err = eeprom.write_page(60, &[0u8; 8]).unwrap_err();
        assert_eq!(
            err,
            Error::PageBoundary {
                addr: 60,
                len: 8,
                page_size: 64
            }
        );
        assert_eq!(eeprom.bus.writes, 0);
        assert_eq!(eeprom.bus.reads, 0);
    }

    #[test]
    fn full_page_at_boundary_is_accepted() {
        let mut eeprom = SerialEeprom::new(CountingBus::new(), EepromConfig::default());
        eeprom.write_page(64, &[0u8; 64]).unwrap();
        assert_eq!(eeprom.bus.writes, 1);
    }

    #[test]
    fn read_chunking_is_decoupled_from_progress_cadence() {
        let config = EepromConfig {
            read_chunk: 64,
            progress_interval: 16,
            ..EepromConfig::default()
        };
        let mut eeprom = SerialEeprom::new(CountingBus::new(), config);
        let mut buf = [0u8; 128];
        eeprom
            .read_into(0, &mut buf, &mut crate::progress::NoProgress)
            .unwrap();
        // Two address+read transactions, however often progress fires
        assert_eq!(eeprom.bus.writes, 2);
        assert_eq!(eeprom.bus.reads, 2);
    }

    #[test]
    fn reads_past_capacity_are_rejected() {
        let mut eeprom = SerialEeprom::new(CountingBus::new(), EepromConfig::default());
        assert_eq!(
            eeprom.read_byte(32 * 1024).unwrap_err(),
            Error::AddressOutOfBounds
        );
        assert_eq!(eeprom.bus.writes, 0);
    }
}
