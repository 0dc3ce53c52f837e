//! Probe command: identify the chip and print its parameters

use crate::chips::Chip;

/// Run the probe command
pub fn run(chip: &mut Chip) -> Result<(), Box<dyn std::error::Error>> {
    println!("Chip: {}", chip.name());
    println!(
        "Capacity: {} bytes ({} KiB)",
        chip.capacity(),
        chip.capacity() / 1024
    );
    match chip {
        Chip::Nor(flash) => {
            let id = flash.read_jedec_id()?;
            let sr1 = flash.read_status()?;
            println!("JEDEC id: {:#08x}", id);
            println!("Status register 1: {:#04x}", sr1.bits());
            println!("Page size: {} bytes", flash.config().page_size);
            println!("Sector size: {} bytes", flash.config().sector_size);
        }
        Chip::Eeprom(eeprom) => {
            println!("Bus address: {:#04x}", eeprom.config().device_addr);
            println!("Page size: {} bytes", eeprom.config().page_size);
        }
        Chip::Parallel(eeprom) => {
            println!("Address lines: {}", eeprom.config().address_bits);
            println!("Verify budget: {} attempts", eeprom.config().verify_retry_limit);
        }
    }
    Ok(())
}
