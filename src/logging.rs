//! Runtime-configurable log category set.
//!
//! The firmware logs through the `log` crate, but per-subsystem chatter is
//! gated by a process-wide category set so a bench operator can focus the
//! serial console on one subsystem. The calibration procedure uses
//! [`LogCategories::set_only`] to temporarily restrict output to its own
//! messages and restore the previous set when it finishes.

use core::sync::atomic::{AtomicU16, Ordering};

/// One loggable subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum LogCategory {
    Wifi = 1 << 0,
    Server = 1 << 1,
    Vpn = 1 << 2,
    SerialIo = 1 << 3,
    Temperature = 1 << 4,
    Gps = 1 << 5,
    Instrumentation = 1 << 6,
    Auxiliary = 1 << 7,
    Encoder = 1 << 8,
    Diagnostics = 1 << 9,
}

const ALL_CATEGORIES: u16 = 0x03FF;

/// Atomic set of enabled [`LogCategory`] tags.
///
/// Cheap to share between tasks; reads are relaxed because a momentarily
/// stale mask only delays or drops a log line.
pub struct LogCategories {
    mask: AtomicU16,
}

impl LogCategories {
    pub const fn all() -> Self {
        Self {
            mask: AtomicU16::new(ALL_CATEGORIES),
        }
    }

    pub const fn none() -> Self {
        Self {
            mask: AtomicU16::new(0),
        }
    }

    pub fn enabled(&self, category: LogCategory) -> bool {
        self.mask.load(Ordering::Relaxed) & category as u16 != 0
    }

    pub fn enable(&self, category: LogCategory) {
        self.mask.fetch_or(category as u16, Ordering::Relaxed);
    }

    pub fn disable(&self, category: LogCategory) {
        self.mask.fetch_and(!(category as u16), Ordering::Relaxed);
    }

    pub fn enable_all(&self) {
        self.mask.store(ALL_CATEGORIES, Ordering::Relaxed);
    }

    /// Restrict output to a single category, returning a guard that restores
    /// the previous set when dropped.
    pub fn set_only(&self, category: LogCategory) -> CategoryGuard<'_> {
        let previous = self.mask.swap(category as u16, Ordering::Relaxed);
        CategoryGuard {
            categories: self,
            previous,
        }
    }
}

/// Restores the category set captured by [`LogCategories::set_only`].
pub struct CategoryGuard<'a> {
    categories: &'a LogCategories,
    previous: u16,
}

impl Drop for CategoryGuard<'_> {
    fn drop(&mut self) {
        self.categories.mask.store(self.previous, Ordering::Relaxed);
    }
}
