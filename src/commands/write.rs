//! Write command: program individual bytes from address/value pairs

use crate::chips::{Chip, UsageError};

/// Run the write command
///
/// `pairs` alternates addresses and byte values. Every byte is
/// verified by the driver before the next pair is attempted.
pub fn run(chip: &mut Chip, pairs: &[u32]) -> Result<(), Box<dyn std::error::Error>> {
    if pairs.len() % 2 != 0 {
        return Err(UsageError::OddPairCount.into());
    }
    for pair in pairs.chunks_exact(2) {
        let (addr, value) = (pair[0], pair[1]);
        let value = u8::try_from(value).map_err(|_| UsageError::ValueTooWide(value))?;
        chip.write_byte(addr, value)?;
        println!("{:#08x} <- {:#04x}", addr, value);
    }
    println!("Wrote {} byte(s) to {}", pairs.len() / 2, chip.name());
    Ok(())
}
