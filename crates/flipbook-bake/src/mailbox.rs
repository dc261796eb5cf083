//! Hand-off between the baking context and the playback context
//!
//! The two contexts never share mutable state: a finished `Baked` crosses
//! over through a single-slot, last-write-wins mailbox. An unread result is
//! silently replaced when a newer bake lands; stale bakes simply finish
//! and get overwritten unread, which is the whole cancellation story.

use flipbook_core::Baked;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Single-slot, last-write-wins mailbox for finished bakes
#[derive(Debug, Default)]
pub struct ProgramSlot {
    slot: Mutex<Option<Baked>>,
}

impl ProgramSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a finished bake, replacing any unread one
    pub fn publish(&self, baked: Baked) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(baked);
    }

    /// Drain the slot
    pub fn take(&self) -> Option<Baked> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.take()
    }

    /// Check without draining
    pub fn is_pending(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.is_some()
    }
}

/// The bake trigger: a dirty flag plus a "must update now" override
///
/// The editor side raises flags at any rate; the baking context polls at its
/// own cadence. This is a liveness channel only; correctness never depends
/// on how often it is polled.
#[derive(Debug, Default)]
pub struct RebakeSignal {
    dirty: AtomicBool,
    force: AtomicBool,
}

impl RebakeSignal {
    /// Create a signal with nothing requested
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a rebake at the baking context's convenience
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Request an immediate rebake
    pub fn force_update(&self) {
        self.force.store(true, Ordering::Release);
        self.dirty.store(true, Ordering::Release);
    }

    /// Consume the pending request, if any
    ///
    /// Returns `Some(true)` when the request was forced.
    pub fn poll(&self) -> Option<bool> {
        if self.dirty.swap(false, Ordering::AcqRel) {
            Some(self.force.swap(false, Ordering::AcqRel))
        } else {
            None
        }
    }
}
