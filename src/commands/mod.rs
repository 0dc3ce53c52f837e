//! CLI command implementations
//!
//! Each command works against the [`crate::chips::Chip`] enum so the
//! same code path drives all three chip families where the operations
//! line up; `erase` matches on the family because the chips disagree
//! on what erasing means.

use std::time::Duration;

use eeprog_core::Progress;
use indicatif::{ProgressBar, ProgressStyle};

pub mod erase;
pub mod probe;
pub mod read;
pub mod write;

/// Progress reporter bridging driver callbacks to an indicatif bar
pub struct CliProgress {
    bar: ProgressBar,
    base: u32,
}

impl CliProgress {
    /// Bar for an operation covering `total` bytes starting at `base`
    pub fn new(base: u32, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar, base }
    }

    /// Spinner for operations without a meaningful byte count
    pub fn spinner(message: &'static str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar, base: 0 }
    }

    /// Finish the bar with a closing message
    pub fn finish(self, message: &'static str) {
        self.bar.finish_with_message(message);
    }
}

impl Progress for CliProgress {
    fn report(&mut self, label: &str, addr: u32) {
        if self.bar.message() != label {
            self.bar.set_message(label.to_string());
        }
        self.bar.set_position(addr.saturating_sub(self.base) as u64);
    }
}
