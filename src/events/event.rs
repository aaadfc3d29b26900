//! # Events emitted by the guard.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Admission events**: a call entered or left the guarded body
//! - **Rejection events**: one per [`Rejection`](crate::Rejection) variant
//! - **Subscriber events**: fan-out overflow and panics
//!
//! The [`Event`] struct carries metadata such as the event id, depth and
//! the worker thread that ran the body.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use boomguard::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::Handled)
//!     .with_event_id("evt0")
//!     .with_depth(1);
//!
//! assert_eq!(ev.kind, EventKind::Handled);
//! assert_eq!(ev.event_id.as_deref(), Some("evt0"));
//! assert_eq!(ev.depth, Some(1));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of guard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Admission events ===
    /// Call was admitted and its body is about to run.
    ///
    /// Sets:
    /// - `event_id`: admitted id
    /// - `depth`: depth after commit
    /// - `thread`: worker thread running the body
    Handled,

    /// Body finished and the commit was rolled back.
    ///
    /// Sets:
    /// - `event_id`: admitted id
    /// - `depth`: depth after rollback
    Completed,

    // === Rejection events ===
    /// Rejected at the slot gate.
    ///
    /// Sets:
    /// - `event_id`
    /// - `reason`: rejection message
    Overload,

    /// Rejected by the recursion-depth check.
    ///
    /// Sets:
    /// - `event_id`
    /// - `depth`: depth observed at check time
    /// - `reason`: rejection message
    RecursionLimit,

    /// Rejected because another call is inside the guarded body.
    ///
    /// Sets:
    /// - `event_id`
    Loopback,

    /// Rejected because the id was already processed since the last reset.
    ///
    /// Sets:
    /// - `event_id`
    Duplicate,

    // === Maintenance ===
    /// Seen-set, depth and reentrancy flag were cleared.
    Reset,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `event_id`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `event_id`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,
}

impl EventKind {
    /// Returns `true` for the four rejection kinds.
    #[inline]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EventKind::Overload
                | EventKind::RecursionLimit
                | EventKind::Loopback
                | EventKind::Duplicate
        )
    }
}

/// Guard event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Id of the guarded event (or subscriber name for subscriber events).
    pub event_id: Option<Arc<str>>,
    /// Recursion depth relevant to this event.
    pub depth: Option<u32>,
    /// Label of the worker thread that ran the body.
    pub thread: Option<Arc<str>>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            event_id: None,
            depth: None,
            thread: None,
            reason: None,
        }
    }

    /// Attaches the guarded event id.
    #[inline]
    pub fn with_event_id(mut self, id: impl Into<Arc<str>>) -> Self {
        self.event_id = Some(id.into());
        self
    }

    /// Attaches a depth (saturated to `u32`).
    #[inline]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(u32::try_from(depth).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a worker thread label.
    #[inline]
    pub fn with_thread(mut self, thread: impl Into<Arc<str>>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_event_id(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_event_id(subscriber)
            .with_reason(info)
    }
}
