//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal byte
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u32(s)?;
    u8::try_from(value).map_err(|_| format!("Value {:#x} does not fit in a byte", value))
}

/// Chip family to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChipKind {
    /// Parallel EEPROM over raw address/data/control lines (AT28C16)
    Parallel,
    /// Serial EEPROM on a two-wire bus (AT24C256)
    Eeprom,
    /// SPI NOR flash on a four-wire bus (W25Q128)
    Nor,
}

#[derive(Parser)]
#[command(name = "eeprog")]
#[command(author, version, about = "Memory chip programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Chip family to drive
    #[arg(short, long, value_enum, default_value = "nor", global = true)]
    pub chip: ChipKind,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the chip and print its parameters
    Probe,

    /// Dump a span of memory as a hex listing
    Read {
        /// Start address (hex or decimal)
        #[arg(value_parser = parse_hex_u32)]
        start: u32,

        /// Number of bytes to read
        #[arg(value_parser = parse_hex_u32)]
        length: u32,
    },

    /// Write individual bytes, given as address/value pairs
    Write {
        /// Alternating addresses and byte values (hex or decimal)
        #[arg(value_parser = parse_hex_u32, required = true, num_args = 2..)]
        pairs: Vec<u32>,
    },

    /// Erase the whole chip, one sector, or fill with a byte
    Erase {
        /// Erase only the sector containing this address (NOR only)
        #[arg(long, value_parser = parse_hex_u32)]
        sector: Option<u32>,

        /// Fill value for chips without an erase command [default: 0xFF]
        #[arg(long, value_parser = parse_hex_u8)]
        fill: Option<u8>,
    },
}
