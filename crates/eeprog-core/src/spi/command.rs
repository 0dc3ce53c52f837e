//! SPI command structure

/// A single SPI transaction
///
/// Designed to avoid allocation - uses slices for data. The lifetime
/// parameter `'a` ties the command to the buffers it references.
/// Addresses are always 24-bit (3-byte big-endian on the wire), which
/// covers the 16 MiB parts this driver targets.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// 24-bit address (if any)
    pub address: Option<u32>,

    /// Data to write after opcode/address
    pub write_data: &'a [u8],

    /// Buffer to read into (mutable)
    pub read_buf: &'a mut [u8],
}

impl<'a> SpiCommand<'a> {
    /// Create a simple command with no address or data (e.g., WREN, WRDI)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a read register command with no address (e.g., RDSR)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: None,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a write register command with no address (e.g., WRSR)
    pub fn write_reg(opcode: u8, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: None,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create a read command with a 3-byte address (e.g., READ)
    pub fn read(opcode: u8, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a write command with a 3-byte address (e.g., PP)
    pub fn write(opcode: u8, addr: u32, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create an erase command with a 3-byte address
    pub fn erase(opcode: u8, addr: u32) -> Self {
        Self {
            opcode,
            address: Some(addr),
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Number of header bytes (opcode plus address)
    pub fn header_len(&self) -> usize {
        if self.address.is_some() {
            4
        } else {
            1
        }
    }

    /// Encode opcode and big-endian address into `buf`
    ///
    /// `buf` must be at least `header_len()` bytes.
    pub fn encode_header(&self, buf: &mut [u8]) {
        buf[0] = self.opcode;
        if let Some(addr) = self.address {
            buf[1] = (addr >> 16) as u8;
            buf[2] = (addr >> 8) as u8;
            buf[3] = addr as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_encoding_is_big_endian() {
        let cmd = SpiCommand::erase(0x20, 0x123456);
        let mut buf = [0u8; 4];
        cmd.encode_header(&mut buf);
        assert_eq!(buf, [0x20, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn simple_command_has_one_byte_header() {
        let cmd = SpiCommand::simple(0x06);
        assert_eq!(cmd.header_len(), 1);
        let mut buf = [0u8; 1];
        cmd.encode_header(&mut buf);
        assert_eq!(buf, [0x06]);
    }
}
