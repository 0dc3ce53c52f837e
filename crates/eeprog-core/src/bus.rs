//! Bus transport traits
//!
//! The driver core never performs physical-layer signaling itself.
//! Each driver owns one of these transports, supplied by the caller
//! at construction. Implementations are expected to be blocking; the
//! drivers interleave transactions with `delay_us` calls to satisfy
//! chip timing.

use crate::error::Result;

/// A four-wire (SPI-style) bus with an explicit chip select
///
/// Transactions are framed by the driver: it asserts the select line,
/// issues one or more write/read phases, and releases the line. The
/// transport must not toggle select on its own.
pub trait FourWireBus {
    /// Drive the chip select line active (low)
    fn assert_select(&mut self);

    /// Release the chip select line (high)
    fn release_select(&mut self);

    /// Clock out the given bytes while selected
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Clock in `buf.len()` bytes while selected
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

/// A two-wire (I2C-style) bus with 7-bit device addressing
pub trait TwoWireBus {
    /// Write `payload` to the device at `device_addr`
    ///
    /// When `stop` is false the bus holds the transaction open
    /// (repeated start) so a subsequent read continues from the
    /// address just framed.
    fn write_to(&mut self, device_addr: u8, payload: &[u8], stop: bool) -> Result<()>;

    /// Read `buf.len()` bytes from the device at `device_addr`
    fn read_from(&mut self, device_addr: u8, buf: &mut [u8]) -> Result<()>;

    /// Probe the bus and report which device addresses acknowledge
    ///
    /// Fills `found` from the start and returns the number of devices
    /// seen. Used only for the advisory scan at driver init.
    fn scan(&mut self, found: &mut [u8]) -> usize;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

/// One physical line of a bit-banged parallel memory port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// Address line `A<n>`
    Address(u8),
    /// Data line `IO<n>`
    Data(u8),
    /// Chip enable, active low
    ChipEnable,
    /// Output enable, active low
    OutputEnable,
    /// Write enable, active low
    WriteEnable,
}

/// Direction of a data line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Line is an input (chip drives it)
    Input,
    /// Line is an output (host drives it)
    Output,
}

/// Raw line access for a parallel memory port
///
/// Address and control lines are always outputs; only the data lines
/// change direction, and the driver is responsible for leaving them in
/// a read-safe (input) state between operations.
pub trait ParallelBus {
    /// Drive a line high or low
    fn set_line(&mut self, line: Line, high: bool);

    /// Sample a line
    fn read_line(&mut self, line: Line) -> bool;

    /// Switch a data line between input and output
    fn set_direction(&mut self, line: Line, dir: Direction);

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}
