//! Driver construction over the simulated back ends
//!
//! Each chip family pairs a driver from `eeprog-core` with the matching
//! emulated bus from `eeprog-dummy`. The command implementations work
//! against the [`Chip`] enum so they stay family-agnostic where the
//! operations line up and can match where they do not.

use eeprog_core::eeprom::{EepromConfig, SerialEeprom};
use eeprog_core::nor::{NorChipConfig, SpiNorFlash};
use eeprog_core::parallel::{ParallelConfig, ParallelEeprom};
use eeprog_core::Progress;
use eeprog_dummy::{SimEepromBus, SimNorBus, SimNorConfig, SimParallelConfig, SimParallelPort};

use crate::cli::ChipKind;

/// Command-line usage errors caught before touching a chip
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("write arguments must be address/value pairs")]
    OddPairCount,
    #[error("value {0:#x} does not fit in a byte")]
    ValueTooWide(u32),
    #[error("--sector is only supported for the nor chip")]
    SectorUnsupported,
    #[error("--fill is not supported for the nor chip, erase leaves 0xFF")]
    FillUnsupported,
}

/// An opened driver over its simulated bus
pub enum Chip {
    Parallel(ParallelEeprom<SimParallelPort>),
    Eeprom(SerialEeprom<SimEepromBus>),
    Nor(SpiNorFlash<SimNorBus>),
}

/// Construct and initialize the driver for the selected family
pub fn open(kind: ChipKind) -> Result<Chip, Box<dyn std::error::Error>> {
    match kind {
        ChipKind::Parallel => {
            let port = SimParallelPort::new(SimParallelConfig::default());
            Ok(Chip::Parallel(ParallelEeprom::new(
                port,
                ParallelConfig::default(),
            )))
        }
        ChipKind::Eeprom => {
            let mut eeprom =
                SerialEeprom::new(SimEepromBus::at24c256(), EepromConfig::default());
            eeprom.probe();
            Ok(Chip::Eeprom(eeprom))
        }
        ChipKind::Nor => {
            let mut flash =
                SpiNorFlash::new(SimNorBus::new(SimNorConfig::default()), NorChipConfig::default());
            let id = flash.init()?;
            log::debug!("NOR flash identity {:#08x}", id);
            Ok(Chip::Nor(flash))
        }
    }
}

impl Chip {
    /// Human-readable family name
    pub fn name(&self) -> &'static str {
        match self {
            Chip::Parallel(_) => "parallel EEPROM",
            Chip::Eeprom(_) => "serial EEPROM",
            Chip::Nor(_) => "SPI NOR flash",
        }
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> u32 {
        match self {
            Chip::Parallel(drv) => drv.config().capacity,
            Chip::Eeprom(drv) => drv.config().capacity,
            Chip::Nor(drv) => drv.config().capacity,
        }
    }

    /// Read `len` bytes starting at `start`
    pub fn read<P: Progress>(
        &mut self,
        start: u32,
        len: usize,
        progress: &mut P,
    ) -> eeprog_core::Result<Vec<u8>> {
        match self {
            Chip::Parallel(drv) => drv.bulk_read(start, len, progress),
            Chip::Eeprom(drv) => drv.read_bytes(start, len, progress),
            Chip::Nor(drv) => drv.read_bytes(start, len, progress),
        }
    }

    /// Write and verify a single byte
    pub fn write_byte(&mut self, addr: u32, value: u8) -> eeprog_core::Result<()> {
        match self {
            Chip::Parallel(drv) => {
                let attempts = drv.write_byte(addr, value)?;
                log::debug!("{:#06x} verified after {} attempt(s)", addr, attempts);
                Ok(())
            }
            Chip::Eeprom(drv) => drv.write_byte(addr, value),
            Chip::Nor(drv) => drv.write_byte(addr, value),
        }
    }
}
