//! Progress reporting during long operations
//!
//! Bulk reads, writes and erases can take a long time on real chips.
//! Drivers report progress through this trait at the cadence set in
//! their config. Implementations must be non-blocking and must not
//! issue bus transactions; the trait cannot fail, so a broken display
//! can never abort a programming operation.

/// Callback for progress events during bulk operations
pub trait Progress {
    /// Report that the operation labelled `label` has reached `addr`
    fn report(&mut self, label: &str, addr: u32);
}

/// A no-op progress reporter
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _label: &str, _addr: u32) {}
}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn report(&mut self, label: &str, addr: u32) {
        (**self).report(label, addr)
    }
}
