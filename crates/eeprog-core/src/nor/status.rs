//! NOR flash status register bits
//!
//! The W25Q family exposes three 8-bit status registers. Only the bits
//! the driver acts on are named here; registers are always re-read
//! from the device, never cached, since hardware clears WEL and BUSY
//! on its own.

use bitflags::bitflags;

bitflags! {
    /// Status Register 1
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sr1: u8 {
        /// Write In Progress / busy
        const BUSY = 0x01;
        /// Write Enable Latch
        const WEL = 0x02;
        /// Block Protect bit 0
        const BP0 = 0x04;
        /// Block Protect bit 1
        const BP1 = 0x08;
        /// Block Protect bit 2
        const BP2 = 0x10;
        /// Top/Bottom Protect
        const TB = 0x20;
        /// Sector/Block Protect
        const SEC = 0x40;
        /// Status Register Protect
        const SRP = 0x80;

        /// All block-protection bits
        const BP_MASK = Self::BP0.bits() | Self::BP1.bits() | Self::BP2.bits();
        /// Bits cleared by `disable_protection`
        const PROTECTION = Self::BP_MASK.bits() | Self::SRP.bits();
    }
}

bitflags! {
    /// Status Register 2
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sr2: u8 {
        /// Status Register Lock
        const SRL = 0x01;
        /// Quad Enable
        const QE = 0x02;
        /// Complement Protect - inverts the BP range, cleared along
        /// with the BP bits when protection is disabled
        const CMP = 0x40;
        /// Suspend Status
        const SUS = 0x80;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protection_mask_matches_datasheet() {
        // BP0..BP2 plus SRP
        assert_eq!(Sr1::PROTECTION.bits(), 0x9C);
        assert_eq!(Sr1::BP_MASK.bits(), 0x1C);
    }
}
