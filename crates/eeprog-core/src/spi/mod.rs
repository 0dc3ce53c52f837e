//! SPI transaction types for the NOR flash driver
//!
//! Commands are framed by the driver and handed to a
//! [`FourWireBus`](crate::bus::FourWireBus) as raw byte phases.

mod command;
pub mod opcodes;

pub use command::SpiCommand;
