//! # Change Flag
//!
//! A single atomic boolean that says "something was edited since you last
//! looked". The control thread raises it; the audio thread takes it once
//! per block.
//!
//! ## Why not a mutex?
//!
//! The audio thread has a hard deadline. If it waited on a lock held by
//! the UI thread, and the UI thread got descheduled, the audio would drop
//! out (priority inversion). A compare-and-exchange never waits: it either
//! flips the flag from `true` to `false` and reports success, or it sees
//! `false` and reports nothing to do.
//!
//! ## Memory ordering
//!
//! The writer stores the parameter values first and raises the flag with
//! `Release`. The reader takes the flag with `Acquire`, so every value
//! store that happened before the raise is visible once `take()` returns
//! `true`.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single-writer/single-reader "pending change" flag.
#[derive(Debug, Default)]
pub struct ChangeFlag {
    raised: AtomicBool,
}

impl ChangeFlag {
    pub const fn new(raised: bool) -> Self {
        Self {
            raised: AtomicBool::new(raised),
        }
    }

    /// Mark a pending change. Raising an already raised flag is a no-op,
    /// so any number of edits within one audio block collapse into one
    /// update.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Consume the pending change, if any. Returns `true` exactly once per
    /// run of `raise()` calls.
    pub fn take(&self) -> bool {
        self.raised
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
