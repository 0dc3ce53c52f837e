//! eeprog-core - Driver core for non-volatile memory programming
//!
//! This crate implements the chip-side protocols for three kinds of
//! memory device:
//!
//! - [`parallel::ParallelEeprom`] - an AT28C-class parallel EEPROM
//!   driven over bit-banged address/data/control lines
//! - [`eeprom::SerialEeprom`] - an AT24C-class serial EEPROM on a
//!   two-wire (I2C) bus
//! - [`nor::SpiNorFlash`] - a W25Q-class NOR flash on a four-wire
//!   (SPI) bus
//!
//! The physical layer is behind the traits in [`bus`]; a driver owns
//! its bus handle exclusively for the duration of a programming
//! session. All operations are blocking and single-threaded.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation for the bulk read/write helpers

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod bus;
pub mod eeprom;
pub mod error;
pub mod nor;
pub mod parallel;
pub mod progress;
pub mod spi;

pub use error::{Error, Result, VerifyFailure};
pub use progress::{NoProgress, Progress};
