//! # Concurrency slot admission.
//!
//! [`SlotCounter`] bounds how many calls may be past the admission gate at
//! once. The check-then-increment runs under a lock so the ceiling is never
//! exceeded; the release is a plain atomic decrement performed by the
//! [`SlotPermit`] drop, so every exit path (success, any rejection, panic)
//! gives the slot back exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use crate::error::Rejection;

/// Per-guard counter of admitted calls.
#[derive(Debug)]
pub(super) struct SlotCounter {
    limit: usize,
    active: AtomicUsize,
    gate: Mutex<()>,
}

/// RAII slot reservation. Releases the slot when dropped.
#[derive(Debug)]
pub(super) struct SlotPermit<'a> {
    counter: &'a SlotCounter,
}

impl Drop for SlotPermit<'_> {
    fn drop(&mut self) {
        self.counter.active.fetch_sub(1, Ordering::AcqRel);
    }
}

impl SlotCounter {
    pub(super) fn new(limit: usize) -> Self {
        Self {
            limit,
            active: AtomicUsize::new(0),
            gate: Mutex::new(()),
        }
    }

    /// Reserves a slot, or rejects with [`Rejection::Overload`] without consuming one.
    pub(super) async fn try_acquire(&self) -> Result<SlotPermit<'_>, Rejection> {
        let _gate = self.gate.lock().await;

        let active = self.active.load(Ordering::Acquire);
        if active >= self.limit {
            return Err(Rejection::Overload {
                active,
                limit: self.limit,
            });
        }
        self.active.fetch_add(1, Ordering::AcqRel);
        Ok(SlotPermit { counter: self })
    }

    /// Slots currently held.
    pub(super) fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}
