//! eeprog - A memory chip programmer
//!
//! Drives three chip families through the drivers in `eeprog-core`:
//!
//! - **Parallel EEPROM** (AT28C16) over raw address/data/control lines
//! - **Serial EEPROM** (AT24C256) on a two-wire bus
//! - **SPI NOR flash** (W25Q128) on a four-wire bus
//!
//! The back ends here are the emulated buses from `eeprog-dummy`; the
//! command implementations only see the driver API, so a hardware bus
//! implementation slots in without touching them.

mod chips;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let mut chip = match chips::open(cli.chip) {
        Ok(chip) => chip,
        Err(e) => {
            eprintln!("Failed to open chip: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Probe => commands::probe::run(&mut chip),
        Commands::Read { start, length } => commands::read::run(&mut chip, start, length),
        Commands::Write { pairs } => commands::write::run(&mut chip, &pairs),
        Commands::Erase { sector, fill } => commands::erase::run(&mut chip, sector, fill),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
