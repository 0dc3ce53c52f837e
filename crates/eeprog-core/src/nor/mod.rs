//! Serial NOR flash driver (W25Q-class, four-wire bus)
//!
//! Every mutating operation follows the same skeleton: wait for the
//! previous operation to finish, assert the write-enable latch and
//! verify it took, issue the command, then poll the busy bit until the
//! device goes ready again. The driver blocks through the whole
//! sequence; no command is ever issued while the chip is busy.

mod status;

pub use status::{Sr1, Sr2};

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::bus::FourWireBus;
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::spi::{opcodes, SpiCommand};

/// The value every byte holds after an erase
pub const ERASED_VALUE: u8 = 0xFF;

/// Chip-dependent parameters for a serial NOR flash
///
/// Nothing in the driver algorithms is hardwired to a part; the
/// default describes the W25Q128 (16 MiB, 256 B pages, 4 KiB sectors,
/// 64 KiB blocks).
#[derive(Debug, Clone)]
pub struct NorChipConfig {
    /// Total capacity in bytes
    pub capacity: u32,
    /// Program page size in bytes
    pub page_size: u32,
    /// Smallest erase granularity in bytes
    pub sector_size: u32,
    /// Large erase granularity in bytes
    pub block_size: u32,
    /// Expected 24-bit JEDEC identity; mismatch is advisory only
    pub expected_jedec_id: u32,
    /// Delay between busy polls while a page program completes
    pub program_poll_us: u32,
    /// Budget for a page program before giving up
    pub program_timeout_us: u32,
    /// Delay between busy polls while an erase completes
    pub erase_poll_us: u32,
    /// Budget for a sector erase
    pub sector_erase_timeout_us: u32,
    /// Budget for a block erase
    pub block_erase_timeout_us: u32,
    /// Budget for a chip erase; generous, large parts take the better
    /// part of a minute
    pub chip_erase_timeout_us: u32,
    /// Budget for a status register write
    pub status_timeout_us: u32,
    /// Largest single read transaction
    pub read_chunk: u32,
    /// Report progress every this many bytes during bulk operations
    pub progress_interval: u32,
}

impl Default for NorChipConfig {
    fn default() -> Self {
        Self {
            capacity: 16 * 1024 * 1024,
            page_size: 256,
            sector_size: 4 * 1024,
            block_size: 64 * 1024,
            expected_jedec_id: 0xEF4018,
            program_poll_us: 10,
            program_timeout_us: 10_000,
            erase_poll_us: 10_000,
            sector_erase_timeout_us: 1_000_000,
            block_erase_timeout_us: 4_000_000,
            chip_erase_timeout_us: 200_000_000,
            status_timeout_us: 500_000,
            read_chunk: 4096,
            progress_interval: 4096,
        }
    }
}

/// Driver for a serial NOR flash on a four-wire bus
///
/// Owns the bus handle exclusively for the programming session.
pub struct SpiNorFlash<B: FourWireBus> {
    bus: B,
    config: NorChipConfig,
}

impl<B: FourWireBus> SpiNorFlash<B> {
    /// Create a driver over `bus` with the given chip parameters
    ///
    /// The device is not touched until [`init`](Self::init) or the
    /// first operation.
    pub fn new(bus: B, config: NorChipConfig) -> Self {
        Self { bus, config }
    }

    /// Chip parameters this driver was constructed with
    pub fn config(&self) -> &NorChipConfig {
        &self.config
    }

    /// Consume the driver and return the bus handle
    pub fn release(self) -> B {
        self.bus
    }

    /// Execute one framed transaction: select, header, data phases,
    /// release. Select is released even when a phase fails.
    fn exec(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let mut header = [0u8; 4];
        let header_len = cmd.header_len();
        cmd.encode_header(&mut header);

        self.bus.assert_select();
        let result = Self::exec_phases(&mut self.bus, &header[..header_len], cmd);
        self.bus.release_select();
        result
    }

    fn exec_phases(bus: &mut B, header: &[u8], cmd: &mut SpiCommand<'_>) -> Result<()> {
        bus.write_bytes(header)?;
        if !cmd.write_data.is_empty() {
            bus.write_bytes(cmd.write_data)?;
        }
        if cmd.has_read() {
            bus.read_bytes(cmd.read_buf)?;
        }
        Ok(())
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        if addr >= self.config.capacity
            || addr as u64 + len as u64 > self.config.capacity as u64
        {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Status and write control
    // ------------------------------------------------------------------

    /// Read status register 1
    pub fn read_status(&mut self) -> Result<Sr1> {
        let mut buf = [0u8; 1];
        self.exec(&mut SpiCommand::read_reg(opcodes::RDSR, &mut buf))?;
        Ok(Sr1::from_bits_retain(buf[0]))
    }

    /// Read status register 2
    pub fn read_status2(&mut self) -> Result<Sr2> {
        let mut buf = [0u8; 1];
        self.exec(&mut SpiCommand::read_reg(opcodes::RDSR2, &mut buf))?;
        Ok(Sr2::from_bits_retain(buf[0]))
    }

    /// Read status register 3
    pub fn read_status3(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.exec(&mut SpiCommand::read_reg(opcodes::RDSR3, &mut buf))?;
        Ok(buf[0])
    }

    /// Send the Write Enable command
    pub fn write_enable(&mut self) -> Result<()> {
        self.exec(&mut SpiCommand::simple(opcodes::WREN))
    }

    /// Send the Write Disable command
    pub fn write_disable(&mut self) -> Result<()> {
        self.exec(&mut SpiCommand::simple(opcodes::WRDI))
    }

    /// Poll the busy bit until the device goes ready
    ///
    /// Polls at `poll_delay_us` intervals for at most `timeout_us`.
    fn wait_ready(&mut self, poll_delay_us: u32, timeout_us: u32) -> Result<()> {
        let max_polls = if poll_delay_us > 0 {
            (timeout_us / poll_delay_us).max(1)
        } else {
            timeout_us
        };

        for _ in 0..max_polls {
            if !self.read_status()?.contains(Sr1::BUSY) {
                return Ok(());
            }
            if poll_delay_us > 0 {
                self.bus.delay_us(poll_delay_us);
            }
        }

        Err(Error::Timeout)
    }

    /// Assert write enable and verify the latch took
    ///
    /// The latch can silently fail to set when the hardware /WP pin is
    /// tied low. One retry, then [`Error::WriteProtected`].
    fn ensure_write_enabled(&mut self) -> Result<()> {
        self.write_enable()?;
        if self.read_status()?.contains(Sr1::WEL) {
            return Ok(());
        }
        self.write_enable()?;
        if self.read_status()?.contains(Sr1::WEL) {
            return Ok(());
        }
        Err(Error::WriteProtected)
    }

    /// Write status registers 1 and 2 in a single command
    pub fn write_status(&mut self, sr1: Sr1, sr2: Sr2) -> Result<()> {
        self.wait_ready(self.config.program_poll_us, self.config.status_timeout_us)?;
        self.ensure_write_enabled()?;
        let data = [sr1.bits(), sr2.bits()];
        self.exec(&mut SpiCommand::write_reg(opcodes::WRSR, &data))?;
        self.wait_ready(self.config.erase_poll_us, self.config.status_timeout_us)
    }

    /// Clear the block-protection and status-register-protect bits
    ///
    /// Idempotent: when nothing is set this is a pure read, no status
    /// write is issued. Returns whether a write was needed.
    pub fn disable_protection(&mut self) -> Result<bool> {
        let sr1 = self.read_status()?;
        let sr2 = self.read_status2()?;
        let sr3 = self.read_status3()?;

        if !sr1.intersects(Sr1::PROTECTION) {
            return Ok(false);
        }

        log::info!(
            "clearing protection: SR1={:02X} SR2={:02X} SR3={:02X}",
            sr1.bits(),
            sr2.bits(),
            sr3
        );
        self.write_status(sr1 & !Sr1::PROTECTION, sr2 & !Sr2::CMP)?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Identification and power
    // ------------------------------------------------------------------

    /// Read the 24-bit JEDEC identity (manufacturer, type, capacity)
    pub fn read_jedec_id(&mut self) -> Result<u32> {
        let mut buf = [0u8; 3];
        self.exec(&mut SpiCommand::read_reg(opcodes::RDID, &mut buf))?;
        Ok(((buf[0] as u32) << 16) | ((buf[1] as u32) << 8) | buf[2] as u32)
    }

    /// Release from deep power-down; safe to call when not asleep
    pub fn wake(&mut self) -> Result<()> {
        self.exec(&mut SpiCommand::simple(opcodes::RDP))?;
        self.bus.delay_us(1000);
        Ok(())
    }

    /// Enter deep power-down
    pub fn power_down(&mut self) -> Result<()> {
        self.exec(&mut SpiCommand::simple(opcodes::DP))?;
        self.bus.delay_us(3);
        Ok(())
    }

    /// Software reset (enable + execute)
    pub fn reset(&mut self) -> Result<()> {
        self.exec(&mut SpiCommand::simple(opcodes::RSTEN))?;
        self.bus.delay_us(50);
        self.exec(&mut SpiCommand::simple(opcodes::RST))?;
        self.bus.delay_us(1000);
        Ok(())
    }

    /// Bring the device to a known state and sanity-check its identity
    ///
    /// Wakes the part, resets it, clears protection and reads the
    /// JEDEC id. An all-zero id means the device had not finished
    /// powering up, so the read is retried once after a short delay.
    /// An unexpected id is logged as a warning, never fatal - some
    /// compatible parts report different constants.
    pub fn init(&mut self) -> Result<u32> {
        self.wake()?;
        self.reset()?;
        self.disable_protection()?;

        let mut id = self.read_jedec_id()?;
        if id == 0 {
            self.bus.delay_us(5000);
            id = self.read_jedec_id()?;
        }

        if id == self.config.expected_jedec_id {
            log::info!("NOR flash detected, id {:06X}", id);
        } else {
            log::warn!(
                "unexpected device id {:06X} (expected {:06X})",
                id,
                self.config.expected_jedec_id
            );
        }
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Read a single byte
    pub fn read_byte(&mut self, addr: u32) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(addr, &mut buf, &mut crate::progress::NoProgress)?;
        Ok(buf[0])
    }

    /// Read `buf.len()` bytes starting at `addr`
    ///
    /// Reads are chunked by the configured transaction limit and
    /// reported through `progress` at the configured interval.
    pub fn read_into<P: Progress>(
        &mut self,
        addr: u32,
        buf: &mut [u8],
        progress: &mut P,
    ) -> Result<()> {
        self.check_range(addr, buf.len())?;

        let chunk_size = self.config.read_chunk as usize;
        let interval = self.config.progress_interval;
        let mut offset = 0usize;
        let mut next_report = 0u32;

        while offset < buf.len() {
            let len = chunk_size.min(buf.len() - offset);
            let cur = addr + offset as u32;
            if cur >= next_report {
                progress.report("read", cur);
                next_report = cur.saturating_add(interval);
            }
            let chunk = &mut buf[offset..offset + len];
            self.exec(&mut SpiCommand::read(opcodes::READ, cur, chunk))?;
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
    // Program
    // ------------------------------------------------------------------

    /// Program up to one page at `addr`
    ///
    /// Rejects payloads larger than a page before touching the bus.
    /// The device wraps writes within the addressed page, so a payload
    /// that extends past the page end corrupts the start of the same
    /// page - callers chunk by page (or use [`program`](Self::program),
    /// which does).
    pub fn write_page(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.len() as u32 > self.config.page_size {
            return Err(Error::PageOverflow {
                len: data.len() as u32,
                max: self.config.page_size,
            });
        }
        self.check_range(addr, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        self.wait_ready(self.config.program_poll_us, self.config.program_timeout_us)?;
        self.ensure_write_enabled()?;
        self.exec(&mut SpiCommand::write(opcodes::PP, addr, data))?;
        self.wait_ready(self.config.program_poll_us, self.config.program_timeout_us)
    }

    /// Program a single byte
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        self.write_page(addr, &[value])
    }

    /// Program an arbitrary span, chunked by page boundaries
    ///
    /// The target region is assumed to be erased.
    pub fn program<P: Progress>(
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

    // ------------------------------------------------------------------
    // Erase
    // ------------------------------------------------------------------

    fn erase_cmd(&mut self, opcode: u8, addr: u32, timeout_us: u32) -> Result<()> {
        self.wait_ready(self.config.erase_poll_us, timeout_us)?;
        self.ensure_write_enabled()?;
        self.exec(&mut SpiCommand::erase(opcode, addr))?;
        self.wait_ready(self.config.erase_poll_us, timeout_us)
    }

    /// Erase the 4 KiB sector containing `addr`
    ///
    /// The address is aligned down to the sector granularity before it
    /// goes on the wire, so the issued command always carries the
    /// sector start.
    pub fn sector_erase(&mut self, addr: u32) -> Result<()> {
        self.check_range(addr, 1)?;
        let aligned = addr & !(self.config.sector_size - 1);
        self.erase_cmd(opcodes::SE_20, aligned, self.config.sector_erase_timeout_us)
    }

    /// Erase the 64 KiB block containing `addr`; address aligned down
    /// as for [`sector_erase`](Self::sector_erase)
    pub fn block_erase(&mut self, addr: u32) -> Result<()> {
        self.check_range(addr, 1)?;
        let aligned = addr & !(self.config.block_size - 1);
        self.erase_cmd(opcodes::BE_D8, aligned, self.config.block_erase_timeout_us)
    }

    /// Erase the entire chip
    ///
    /// Can poll for a long time on large parts; the budget comes from
    /// the chip config.
    pub fn chip_erase(&mut self) -> Result<()> {
        self.wait_ready(self.config.erase_poll_us, self.config.chip_erase_timeout_us)?;
        self.ensure_write_enabled()?;
        self.exec(&mut SpiCommand::simple(opcodes::CE_C7))?;
        self.wait_ready(self.config.erase_poll_us, self.config.chip_erase_timeout_us)
    }

    /// Erase the aligned span covering `[start, start + len)`
    ///
    /// Uses 64 KiB block erases where a whole block is covered and
    /// 4 KiB sector erases for the rest.
    pub fn erase_range<P: Progress>(
        &mut self,
        start: u32,
        len: u32,
        progress: &mut P,
    ) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        self.check_range(start, len as usize)?;

        let sector = self.config.sector_size;
        let block = self.config.block_size;
        let mut addr = start & !(sector - 1);
        let end = (start + len + sector - 1) & !(sector - 1);

        while addr < end {
            progress.report("erase", addr);
            if addr & (block - 1) == 0 && end - addr >= block {
                self.block_erase(addr)?;
                addr += block;
            } else {
                self.sector_erase(addr)?;
                addr += sector;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FourWireBus;
    use crate::progress::NoProgress;

    /// Scripted bus: serves canned status bytes and counts phases.
    struct ScriptedBus {
        status: [u8; 16],
        status_len: usize,
        status_pos: usize,
        last_opcode: u8,
        selects: u32,
        writes: u32,
        reads: u32,
    }

    impl ScriptedBus {
        fn new(status: &[u8]) -> Self {
            let mut buf = [0u8; 16];
            buf[..status.len()].copy_from_slice(status);
            Self {
                status: buf,
                status_len: status.len(),
                status_pos: 0,
                last_opcode: 0,
                selects: 0,
                writes: 0,
                reads: 0,
            }
        }
    }

    impl FourWireBus for ScriptedBus {
        fn assert_select(&mut self) {
            self.selects += 1;
        }
        fn release_select(&mut self) {}
        fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
            self.writes += 1;
            if !data.is_empty() {
                self.last_opcode = data[0];
            }
            Ok(())
        }
        fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
            self.reads += 1;
            if self.last_opcode == opcodes::RDSR {
                let idx = self.status_pos.min(self.status_len - 1);
                buf[0] = self.status[idx];
                self.status_pos += 1;
            } else {
                buf.fill(0);
            }
            Ok(())
        }
        fn delay_us(&mut self, _us: u32) {}
    }

    #[test]
    fn oversized_page_write_is_rejected_before_any_transaction() {
        let bus = ScriptedBus::new(&[0x00]);
        let mut flash = SpiNorFlash::new(bus, NorChipConfig::default());
        let data = [0u8; 257];
        let err = flash.write_page(0, &data).unwrap_err();
        assert_eq!(err, Error::PageOverflow { len: 257, max: 256 });
        assert_eq!(flash.bus.selects, 0);
        assert_eq!(flash.bus.writes, 0);
    }

    #[test]
    fn wait_ready_polls_until_busy_clears() {
        // Busy for 3 polls, ready on the 4th status read.
        let bus = ScriptedBus::new(&[0x01, 0x01, 0x01, 0x00]);
        let mut flash = SpiNorFlash::new(bus, NorChipConfig::default());
        flash.wait_ready(10, 10_000).unwrap();
        assert_eq!(flash.bus.reads, 4);
    }

    #[test]
    fn wait_ready_times_out_when_busy_never_clears() {
        let bus = ScriptedBus::new(&[0x01]);
        let mut flash = SpiNorFlash::new(bus, NorChipConfig::default());
        assert_eq!(flash.wait_ready(10, 100).unwrap_err(), Error::Timeout);
        // timeout / poll_delay polls, no more
        assert_eq!(flash.bus.reads, 10);
    }

    #[test]
    fn write_protected_when_latch_never_sets() {
        // Ready, but WEL stays clear through the retry.
        let bus = ScriptedBus::new(&[0x00]);
        let mut flash = SpiNorFlash::new(bus, NorChipConfig::default());
        let err = flash.write_page(0, &[0xAA]).unwrap_err();
        assert_eq!(err, Error::WriteProtected);
    }

    #[test]
    fn out_of_bounds_read_is_rejected() {
        let bus = ScriptedBus::new(&[0x00]);
        let mut flash = SpiNorFlash::new(bus, NorChipConfig::default());
        let mut buf = [0u8; 4];
        let err = flash
            .read_into(0xFF_FFFE, &mut buf, &mut NoProgress)
            .unwrap_err();
        assert_eq!(err, Error::AddressOutOfBounds);
        assert_eq!(flash.bus.selects, 0);
    }
}
