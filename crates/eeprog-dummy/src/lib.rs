//! eeprog-dummy - In-memory chip emulators for testing
//!
//! This crate provides behavioral models of the three chips the
//! drivers target, each sitting behind the matching bus trait. They
//! are useful for testing and development without real hardware, and
//! deliberately reproduce the awkward parts of the silicon: page
//! wraparound, busy windows, the write-enable latch, and erase
//! address truncation.

mod eeprom;
mod nor;
mod parallel;

pub use eeprom::SimEepromBus;
pub use nor::{SimNorBus, SimNorConfig};
pub use parallel::{SimParallelPort, SimParallelConfig};
