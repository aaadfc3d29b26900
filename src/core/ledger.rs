//! # Reentrancy and duplicate bookkeeping.
//!
//! The [`Ledger`] holds the seen-event set and the reentrancy flag. It is
//! always accessed under the guard's instance lock, which also covers the
//! depth increment/decrement so commit and rollback are atomic.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Rejection;

#[derive(Debug, Default)]
pub(super) struct Ledger {
    seen: HashSet<Arc<str>>,
    updating: bool,
}

impl Ledger {
    /// Loopback is checked before duplicates; on success the id is recorded
    /// and the flag is raised.
    pub(super) fn commit(&mut self, event_id: &str) -> Result<(), Rejection> {
        if self.updating {
            return Err(Rejection::Loopback);
        }
        if self.seen.contains(event_id) {
            return Err(Rejection::Duplicate);
        }
        self.seen.insert(Arc::from(event_id));
        self.updating = true;
        Ok(())
    }

    pub(super) fn release(&mut self) {
        self.updating = false;
    }

    pub(super) fn clear(&mut self) {
        self.seen.clear();
        self.updating = false;
    }

    pub(super) fn is_updating(&self) -> bool {
        self.updating
    }

    pub(super) fn has_seen(&self, event_id: &str) -> bool {
        self.seen.contains(event_id)
    }

    pub(super) fn seen_len(&self) -> usize {
        self.seen.len()
    }
}
