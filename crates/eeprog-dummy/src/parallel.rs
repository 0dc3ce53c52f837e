//! AT28C-style parallel EEPROM model behind raw lines
//!
//! Write cycles are modelled in units of read-back attempts: a latched
//! byte reads back inverted until the configured number of output
//! strobes has elapsed, which is how the real part signals an
//! in-progress cycle (DATA polling, complemented bit 7 generalised to
//! the whole byte).

use eeprog_core::bus::{Direction, Line, ParallelBus};

/// Timing shape of the simulated part
#[derive(Debug, Clone)]
pub struct SimParallelConfig {
    /// Capacity in bytes
    pub size: usize,
    /// Read-back attempts a write cycle stays pending for
    pub write_cycle_polls: u32,
}

impl Default for SimParallelConfig {
    fn default() -> Self {
        // AT28C16 shape, writes complete before the first verify
        Self {
            size: 2048,
            write_cycle_polls: 0,
        }
    }
}

/// Simulated parallel EEPROM with a latch-on-WE-rising-edge write model
pub struct SimParallelPort {
    config: SimParallelConfig,
    mem: Vec<u8>,
    addr_lines: u32,
    data_out: u8,
    data_dir_out: u8,
    ce: bool,
    oe: bool,
    we: bool,
    pending_polls: u32,
    /// Write cycles latched by the chip
    pub writes_latched: u32,
}

impl SimParallelPort {
    /// Create a part erased to 0xFF
    pub fn new(config: SimParallelConfig) -> Self {
        let size = config.size;
        Self {
            config,
            mem: vec![0xFF; size],
            addr_lines: 0,
            data_out: 0,
            data_dir_out: 0,
            ce: true,
            oe: true,
            we: true,
            pending_polls: 0,
            writes_latched: 0,
        }
    }

    /// Direct view of the memory contents
    pub fn mem(&self) -> &[u8] {
        &self.mem
    }

    fn current_addr(&self) -> usize {
        self.addr_lines as usize % self.mem.len()
    }

    fn latch_write(&mut self) {
        let addr = self.current_addr();
        // Only data lines driven by the host participate
        let value = self.data_out & self.data_dir_out;
        log::trace!("sim parallel: latched {value:#04x} at {addr:#06x}");
        self.mem[addr] = value;
        self.pending_polls = self.config.write_cycle_polls;
        self.writes_latched += 1;
    }
}

impl ParallelBus for SimParallelPort {
    fn set_line(&mut self, line: Line, high: bool) {
        match line {
            Line::Address(bit) => {
                if high {
                    self.addr_lines |= 1 << bit;
                } else {
                    self.addr_lines &= !(1 << bit);
                }
            }
            Line::Data(bit) => {
                if high {
                    self.data_out |= 1 << bit;
                } else {
                    self.data_out &= !(1 << bit);
                }
            }
            Line::ChipEnable => self.ce = high,
            Line::OutputEnable => {
                // A finished output strobe retires one pending poll
                if high && !self.oe && self.pending_polls > 0 {
                    self.pending_polls -= 1;
                }
                self.oe = high;
            }
            Line::WriteEnable => {
                if high && !self.we && !self.ce {
                    self.latch_write();
                }
                self.we = high;
            }
        }
    }

    fn read_line(&mut self, line: Line) -> bool {
        match line {
            Line::Data(bit) => {
                if self.ce || self.oe {
                    return false;
                }
                let stored = self.mem[self.current_addr()];
                let visible = if self.pending_polls > 0 {
                    !stored
                } else {
                    stored
                };
                (visible >> bit) & 1 != 0
            }
            Line::Address(bit) => (self.addr_lines >> bit) & 1 != 0,
            Line::ChipEnable => self.ce,
            Line::OutputEnable => self.oe,
            Line::WriteEnable => self.we,
        }
    }

    fn set_direction(&mut self, line: Line, dir: Direction) {
        if let Line::Data(bit) = line {
            match dir {
                Direction::Output => self.data_dir_out |= 1 << bit,
                Direction::Input => self.data_dir_out &= !(1 << bit),
            }
        }
    }

    fn delay_us(&mut self, _us: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeprog_core::parallel::{ParallelConfig, ParallelEeprom, WritePolicy};
    use eeprog_core::progress::NoProgress;

    fn driver(write_cycle_polls: u32) -> ParallelEeprom<SimParallelPort> {
        let port = SimParallelPort::new(SimParallelConfig {
            write_cycle_polls,
            ..SimParallelConfig::default()
        });
        ParallelEeprom::new(port, ParallelConfig::default())
    }

    #[test]
    fn byte_round_trip() {
        let mut eeprom = driver(0);
        let attempts = eeprom.write_byte(0x0123, 0x5A).unwrap();
        assert_eq!(attempts, 1);
        assert_eq!(eeprom.read_byte(0x0123).unwrap(), 0x5A);
    }

    #[test]
    fn slow_write_cycle_takes_three_verify_attempts() {
        // The chip returns the true value only on the third read-back
        let mut eeprom = driver(2);
        let attempts = eeprom.write_byte(0x0010, 0x3C).unwrap();
        assert_eq!(attempts, 3);
        assert_eq!(eeprom.read_byte(0x0010).unwrap(), 0x3C);
    }

    #[test]
    fn bulk_write_round_trip() {
        let mut eeprom = driver(1);
        let data: Vec<u8> = (0..512).map(|i| (i * 7) as u8).collect();
        let report = eeprom
            .bulk_write(0x100, &data, WritePolicy::AbortOnMismatch, &mut NoProgress)
            .unwrap();
        assert_eq!(report.bytes_written, data.len());
        assert!(report.failures.is_empty());
        let back = eeprom.bulk_read(0x100, data.len(), &mut NoProgress).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn fill_covers_the_whole_part() {
        let mut eeprom = driver(0);
        eeprom.write_byte(0, 0x00).unwrap();
        eeprom
            .fill(0xFF, WritePolicy::AbortOnMismatch, &mut NoProgress)
            .unwrap();
        let port = eeprom.release();
        assert!(port.mem().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn write_counts_one_latched_cycle_per_byte() {
        let mut eeprom = driver(0);
        eeprom.write_byte(1, 0x11).unwrap();
        eeprom.write_byte(2, 0x22).unwrap();
        let port = eeprom.release();
        assert_eq!(port.writes_latched, 2);
    }
}
