//! Erase command
//!
//! The three families disagree on what erasing means: NOR flash has
//! real erase commands that leave 0xFF, the serial EEPROM is filled a
//! page at a time, and the parallel EEPROM is filled byte by byte with
//! per-byte verification.

use eeprog_core::parallel::WritePolicy;

use crate::chips::{Chip, UsageError};
use crate::commands::CliProgress;

const DEFAULT_FILL: u8 = 0xFF;

/// Run the erase command
pub fn run(
    chip: &mut Chip,
    sector: Option<u32>,
    fill: Option<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    if sector.is_some() && !matches!(chip, Chip::Nor(_)) {
        return Err(UsageError::SectorUnsupported.into());
    }

    match chip {
        Chip::Nor(flash) => {
            if fill.is_some() {
                return Err(UsageError::FillUnsupported.into());
            }
            if flash.disable_protection()? {
                log::info!("Cleared block protection bits");
            }
            match sector {
                Some(addr) => {
                    let sector_size = flash.config().sector_size;
                    flash.sector_erase(addr)?;
                    println!(
                        "Erased {} byte sector at {:#08x}",
                        sector_size,
                        addr & !(sector_size - 1)
                    );
                }
                None => {
                    let progress = CliProgress::spinner("erasing chip");
                    flash.chip_erase()?;
                    progress.finish("chip erased");
                }
            }
        }
        Chip::Eeprom(eeprom) => {
            let fill = fill.unwrap_or(DEFAULT_FILL);
            let capacity = eeprom.config().capacity;
            let mut progress = CliProgress::new(0, capacity as u64);
            eeprom.bulk_erase(fill, &mut progress)?;
            progress.finish("fill complete");
            println!("Filled {} bytes with {:#04x}", capacity, fill);
        }
        Chip::Parallel(eeprom) => {
            let fill = fill.unwrap_or(DEFAULT_FILL);
            let capacity = eeprom.config().capacity;
            let mut progress = CliProgress::new(0, capacity as u64);
            let report = eeprom.fill(fill, WritePolicy::AbortOnMismatch, &mut progress)?;
            progress.finish("fill complete");
            println!(
                "Filled {} bytes with {:#04x}, all verified",
                report.bytes_written, fill
            );
        }
    }
    Ok(())
}
