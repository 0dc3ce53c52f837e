//! Parallel EEPROM driver (AT28C-class, bit-banged lines)
//!
//! The chip gives no completion signal after a write, so the only
//! verification mechanism is read-back polling: the datasheet write
//! cycle time is a statistical bound, not a guarantee, which is why
//! the verify loop runs on a retry budget instead of a single delay.
//!
//! After every operation the data lines are returned to inputs so the
//! chip can drive the bus on the next read without contention.

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::bus::{Direction, Line, ParallelBus};
use crate::error::{Error, Result, VerifyFailure};
use crate::progress::Progress;

const DATA_BITS: u8 = 8;

/// Chip-dependent parameters for a parallel EEPROM
///
/// The default describes a 2 KiB AT28C16: 11 address lines, 10 us
/// write pulse, a verify budget of 100 000 attempts at 10 us spacing.
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Total capacity in bytes
    pub capacity: u32,
    /// Number of address lines
    pub address_bits: u8,
    /// Width of the CE/WE-low write pulse
    pub pulse_width_us: u32,
    /// Delay after releasing the write pulse before the first verify
    pub recovery_us: u32,
    /// Bus settle time before sampling the data lines
    pub settle_us: u32,
    /// Verify attempts before a write is declared failed
    pub verify_retry_limit: u32,
    /// Delay between verify attempts
    pub retry_delay_us: u32,
    /// Report progress every this many addresses
    pub progress_interval: u32,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            capacity: 2048,
            address_bits: 11,
            pulse_width_us: 10,
            recovery_us: 50,
            settle_us: 1,
            verify_retry_limit: 100_000,
            retry_delay_us: 10,
            progress_interval: 500,
        }
    }
}

/// Policy for bulk writes when a byte fails verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Stop at the first verify failure
    #[default]
    AbortOnMismatch,
    /// Record the failure and keep going
    CollectFailures,
}

/// Outcome of a bulk write
#[cfg(feature = "alloc")]
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Bytes successfully written and verified
    pub bytes_written: usize,
    /// Verify failures seen (non-empty only under
    /// [`WritePolicy::CollectFailures`])
    pub failures: Vec<VerifyFailure>,
}

/// Driver for a parallel EEPROM over raw address/data/control lines
pub struct ParallelEeprom<B: ParallelBus> {
    bus: B,
    config: ParallelConfig,
}

impl<B: ParallelBus> ParallelEeprom<B> {
    /// Create a driver over `bus` with the given chip parameters
    ///
    /// Drives all control lines to their inactive (high) state and
    /// sets the data lines to inputs.
    pub fn new(bus: B, config: ParallelConfig) -> Self {
        assert!(config.capacity <= 1 << config.address_bits);
        let mut drv = Self { bus, config };
        drv.bus.set_line(Line::ChipEnable, true);
        drv.bus.set_line(Line::OutputEnable, true);
        drv.bus.set_line(Line::WriteEnable, true);
        drv.data_lines_input();
        drv
    }

    /// Chip parameters this driver was constructed with
    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Consume the driver and return the bus handle
    pub fn release(self) -> B {
        self.bus
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        if addr >= self.config.capacity
            || addr as u64 + len as u64 > self.config.capacity as u64
        {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(())
    }

    fn set_address(&mut self, addr: u32) {
        for bit in 0..self.config.address_bits {
            self.bus.set_line(Line::Address(bit), (addr >> bit) & 1 != 0);
        }
    }

    fn set_data(&mut self, value: u8) {
        for bit in 0..DATA_BITS {
            self.bus.set_line(Line::Data(bit), (value >> bit) & 1 != 0);
        }
    }

    fn data_lines_input(&mut self) {
        for bit in 0..DATA_BITS {
            self.bus.set_direction(Line::Data(bit), Direction::Input);
        }
    }

    fn data_lines_output(&mut self) {
        for bit in 0..DATA_BITS {
            self.bus.set_direction(Line::Data(bit), Direction::Output);
        }
    }

    fn sample_data(&mut self) -> u8 {
        let mut value = 0u8;
        for bit in 0..DATA_BITS {
            if self.bus.read_line(Line::Data(bit)) {
                value |= 1 << bit;
            }
        }
        value
    }

    /// One read cycle: CE and OE low, settle, sample, release
    fn read_cycle(&mut self) -> u8 {
        self.bus.set_line(Line::WriteEnable, true);
        self.bus.set_line(Line::ChipEnable, false);
        self.bus.set_line(Line::OutputEnable, false);
        self.bus.delay_us(self.config.settle_us);
        let value = self.sample_data();
        self.bus.set_line(Line::ChipEnable, true);
        self.bus.set_line(Line::OutputEnable, true);
        value
    }

    // ------------------------------------------------------------------
    // Byte operations
    // ------------------------------------------------------------------

    /// Read a single byte
    pub fn read_byte(&mut self, addr: u32) -> Result<u8> {
        self.check_range(addr, 1)?;
        self.set_address(addr);
        Ok(self.read_cycle())
    }

    /// Write a single byte and verify it by read-back polling
    ///
    /// Returns the number of verify attempts taken on success. The
    /// data lines are back in the input state when this returns, on
    /// both the success and the failure path.
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<u32> {
        self.check_range(addr, 1)?;

        // Drive the value and pulse CE+WE low for the write
        self.set_address(addr);
        self.data_lines_output();
        self.set_data(value);
        self.bus.set_line(Line::OutputEnable, true);
        self.bus.set_line(Line::ChipEnable, false);
        self.bus.set_line(Line::WriteEnable, false);
        self.bus.delay_us(self.config.pulse_width_us);
        self.bus.set_line(Line::WriteEnable, true);
        self.bus.set_line(Line::ChipEnable, true);

        // Read-safe state before anything can go wrong in the verify
        self.data_lines_input();
        self.bus.delay_us(self.config.recovery_us);

        // Verify loop: the chip has no busy signal, read back until
        // the value sticks or the budget runs out
        self.set_address(addr);
        let mut found = 0u8;
        for attempt in 1..=self.config.verify_retry_limit {
            found = self.read_cycle();
            if found == value {
                return Ok(attempt);
            }
            self.bus.delay_us(self.config.retry_delay_us);
        }

        Err(Error::Verify(VerifyFailure {
            addr,
            expected: value,
            found,
        }))
    }

    // ------------------------------------------------------------------
    // Bulk operations
    // ------------------------------------------------------------------

    /// Read `buf.len()` bytes starting at `addr`
    pub fn read_into<P: Progress>(
        &mut self,
        addr: u32,
        buf: &mut [u8],
        progress: &mut P,
    ) -> Result<()> {
        self.check_range(addr, buf.len())?;
        let interval = self.config.progress_interval.max(1);
        for (i, slot) in buf.iter_mut().enumerate() {
            let cur = addr + i as u32;
            if cur % interval == 0 {
                progress.report("read", cur);
            }
            self.set_address(cur);
            *slot = self.read_cycle();
        }
        Ok(())
    }

    /// Read `len` bytes starting at `addr` into a new buffer
    #[cfg(feature = "alloc")]
    pub fn bulk_read<P: Progress>(
        &mut self,
        addr: u32,
        len: usize,
        progress: &mut P,
    ) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(addr, &mut buf, progress)?;
        Ok(buf)
    }

    /// Write a span byte-by-byte with per-byte verification
    ///
    /// Under [`WritePolicy::AbortOnMismatch`] the first verify failure
    /// aborts the run and is returned as the error. Under
    /// [`WritePolicy::CollectFailures`] failures are recorded in the
    /// report and the run continues.
    #[cfg(feature = "alloc")]
    pub fn bulk_write<P: Progress>(
        &mut self,
        addr: u32,
        data: &[u8],
        policy: WritePolicy,
        progress: &mut P,
    ) -> Result<WriteReport> {
        self.check_range(addr, data.len())?;

        let interval = self.config.progress_interval.max(1);
        let mut report = WriteReport::default();
        for (i, &value) in data.iter().enumerate() {
            let cur = addr + i as u32;
            if cur % interval == 0 {
                progress.report("write", cur);
            }
            match self.write_byte(cur, value) {
                Ok(_) => report.bytes_written += 1,
                Err(Error::Verify(failure)) => match policy {
                    WritePolicy::AbortOnMismatch => return Err(Error::Verify(failure)),
                    WritePolicy::CollectFailures => report.failures.push(failure),
                },
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Program every byte of the part with `value`
    ///
    /// The chip has no erase command; the original workflow fills with
    /// 0x00, but the fill value is the caller's choice.
    #[cfg(feature = "alloc")]
    pub fn fill<P: Progress>(
        &mut self,
        value: u8,
        policy: WritePolicy,
        progress: &mut P,
    ) -> Result<WriteReport> {
        let data = vec![value; self.config.capacity as usize];
        self.bulk_write(0, &data, policy, progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Direction, Line, ParallelBus};

    /// Records line directions and serves a constant data pattern.
    struct RecordingPort {
        data_dirs: [Direction; 8],
        data_value: u8,
        transitions: u32,
    }

    impl RecordingPort {
        fn new(data_value: u8) -> Self {
            Self {
                data_dirs: [Direction::Input; 8],
                data_value,
                transitions: 0,
            }
        }
    }

    impl ParallelBus for RecordingPort {
        fn set_line(&mut self, _line: Line, _high: bool) {
            self.transitions += 1;
        }
        fn read_line(&mut self, line: Line) -> bool {
            match line {
                Line::Data(bit) => (self.data_value >> bit) & 1 != 0,
                _ => true,
            }
        }
        fn set_direction(&mut self, line: Line, dir: Direction) {
            if let Line::Data(bit) = line {
                self.data_dirs[bit as usize] = dir;
            }
        }
        fn delay_us(&mut self, _us: u32) {}
    }

    fn small_config() -> ParallelConfig {
        ParallelConfig {
            verify_retry_limit: 3,
            ..ParallelConfig::default()
        }
    }

    #[test]
    fn write_leaves_data_lines_as_inputs_even_on_failure() {
        // Port always reads back 0x00, so writing 0xA5 must fail
        let mut chip = ParallelEeprom::new(RecordingPort::new(0x00), small_config());
        let err = chip.write_byte(0x10, 0xA5).unwrap_err();
        assert_eq!(
            err,
            Error::Verify(VerifyFailure {
                addr: 0x10,
                expected: 0xA5,
                found: 0x00
            })
        );
        assert!(chip
            .bus
            .data_dirs
            .iter()
            .all(|d| *d == Direction::Input));
    }

    #[test]
    fn matching_readback_succeeds_on_first_attempt() {
        let mut chip = ParallelEeprom::new(RecordingPort::new(0x3C), small_config());
        assert_eq!(chip.write_byte(0x10, 0x3C).unwrap(), 1);
    }

    #[test]
    fn out_of_range_write_is_rejected() {
        let mut chip = ParallelEeprom::new(RecordingPort::new(0), small_config());
        let before = chip.bus.transitions;
        assert_eq!(
            chip.write_byte(2048, 0x00).unwrap_err(),
            Error::AddressOutOfBounds
        );
        assert_eq!(chip.bus.transitions, before);
    }
}
