//! Rejection outcomes produced by the guard.
//!
//! [`Rejection`] is not a fault: every variant is an expected, recoverable
//! control outcome of [`Guard::try_process`](crate::Guard::try_process).
//! The caller decides whether to retry; the guard never retries on its own.
//!
//! Helper methods (`as_label`, `is_transient`) are provided for logging and
//! caller-side retry decisions.

use thiserror::Error;

use crate::events::EventKind;

/// # Why an event was not admitted.
///
/// | Variant          | Trigger                             | Slot                        |
/// |------------------|-------------------------------------|-----------------------------|
/// | `Overload`       | active slots >= ceiling             | never consumed              |
/// | `RecursionLimit` | depth >= ceiling                    | consumed, then released     |
/// | `Loopback`       | another call is inside the body     | consumed, then released     |
/// | `Duplicate`      | id already in the seen-set          | consumed, then released     |
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// All admission slots were taken.
    #[error("thread overload: {active}/{limit} slots in use")]
    Overload {
        /// Slots observed in use at admission time.
        active: usize,
        /// Configured slot ceiling.
        limit: usize,
    },

    /// The shared recursion depth reached its ceiling.
    #[error("recursion limit: depth {depth} >= {limit}")]
    RecursionLimit {
        /// Depth observed at check time.
        depth: usize,
        /// Configured depth ceiling.
        limit: usize,
    },

    /// The guarded region is already occupied (boomerang).
    #[error("loopback: guarded region already occupied")]
    Loopback,

    /// The id was already processed since the last reset.
    #[error("duplicate event")]
    Duplicate,
}

impl Rejection {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use boomguard::Rejection;
    ///
    /// assert_eq!(Rejection::Loopback.as_label(), "blocked_loopback");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Rejection::Overload { .. } => "blocked_overload",
            Rejection::RecursionLimit { .. } => "blocked_recursion_limit",
            Rejection::Loopback => "blocked_loopback",
            Rejection::Duplicate => "blocked_duplicate",
        }
    }

    /// Indicates whether a later retry of the same id could be admitted
    /// without a [`Guard::reset`](crate::Guard::reset).
    ///
    /// Returns `false` only for [`Rejection::Duplicate`].
    ///
    /// # Example
    /// ```
    /// use boomguard::Rejection;
    ///
    /// assert!(Rejection::Loopback.is_transient());
    /// assert!(!Rejection::Duplicate.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        !matches!(self, Rejection::Duplicate)
    }

    /// Event kind published on the bus for this rejection.
    pub fn event_kind(&self) -> EventKind {
        match self {
            Rejection::Overload { .. } => EventKind::Overload,
            Rejection::RecursionLimit { .. } => EventKind::RecursionLimit,
            Rejection::Loopback => EventKind::Loopback,
            Rejection::Duplicate => EventKind::Duplicate,
        }
    }
}
