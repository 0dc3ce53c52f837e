//! Read command: dump a span of memory as a hex listing

use crate::chips::Chip;
use crate::commands::CliProgress;

const BYTES_PER_ROW: usize = 16;

/// Run the read command
pub fn run(chip: &mut Chip, start: u32, length: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = CliProgress::new(start, length as u64);
    let data = chip.read(start, length as usize, &mut progress)?;
    progress.finish("read complete");

    hexdump(start, &data);
    println!("Read {} bytes from {}", data.len(), chip.name());
    Ok(())
}

/// Print `data` as addressed rows of 16 hex bytes with an ASCII gutter
fn hexdump(start: u32, data: &[u8]) {
    for (row, chunk) in data.chunks(BYTES_PER_ROW).enumerate() {
        let addr = start as usize + row * BYTES_PER_ROW;
        print!("{:08x}: ", addr);
        for i in 0..BYTES_PER_ROW {
            match chunk.get(i) {
                Some(byte) => print!("{:02x} ", byte),
                None => print!("   "),
            }
        }
        print!(" |");
        for &byte in chunk {
            let c = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            };
            print!("{}", c);
        }
        println!("|");
    }
}
