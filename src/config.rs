//! # Guard configuration.
//!
//! Provides [`GuardConfig`] and the named limits it defaults to.
//!
//! The limits are fixed for the lifetime of a [`Guard`](crate::Guard): they are
//! read once at construction and never swapped at runtime.
//!
//! | Constant                 | Value     | Meaning                                          |
//! |--------------------------|-----------|--------------------------------------------------|
//! | [`MAX_RECURSION_DEPTH`]  | 10        | Depth at which admission is refused              |
//! | [`MAX_CONCURRENT_SLOTS`] | 16        | Concurrent calls admitted past the slot gate     |
//! | [`NESTED_TRIGGER_DEPTH`] | 3         | Depth below which a body spawns its nested call  |
//! | [`SIMULATED_WORK_DELAY`] | 100ms     | Sleep performed by [`SimulatedWork`](crate::SimulatedWork) |
//! | [`NESTED_SUFFIX`]        | `_nested` | Appended to the id of a nested call              |

use std::borrow::Cow;
use std::time::Duration;

/// Depth at (or above) which new calls are rejected with `RecursionLimit`.
pub const MAX_RECURSION_DEPTH: usize = 10;

/// Number of calls that may hold an admission slot at the same time.
pub const MAX_CONCURRENT_SLOTS: usize = 16;

/// A body spawns its nested call only while the depth is below this value.
pub const NESTED_TRIGGER_DEPTH: usize = 3;

/// Blocking work performed by the default handler.
pub const SIMULATED_WORK_DELAY: Duration = Duration::from_millis(100);

/// Suffix used to derive the id of a nested call.
pub const NESTED_SUFFIX: &str = "_nested";

/// Capacity of the event bus ring buffer.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Configuration for a [`Guard`](crate::Guard).
///
/// ## Field semantics
/// - `max_depth`: recursion ceiling (`0` rejects every call)
/// - `max_concurrent`: slot ceiling (`0` rejects every call as overload)
/// - `nested_trigger_depth`: nested call is attempted while `depth < nested_trigger_depth`
/// - `work_delay`: sleep of the default [`SimulatedWork`](crate::SimulatedWork) handler
/// - `nested_suffix`: appended to the parent id for the nested call
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
#[derive(Clone, Debug)]
pub struct GuardConfig {
    /// Maximum recursion depth.
    pub max_depth: usize,

    /// Maximum number of concurrently admitted calls.
    pub max_concurrent: usize,

    /// Depth threshold for the nested self-call.
    pub nested_trigger_depth: usize,

    /// Delay standing in for real work in the default handler.
    pub work_delay: Duration,

    /// Suffix for derived nested ids.
    pub nested_suffix: Cow<'static, str>,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl GuardConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Builds the id of the nested call spawned by `event_id`.
    #[inline]
    pub fn nested_id(&self, event_id: &str) -> String {
        format!("{event_id}{}", self.nested_suffix)
    }
}

impl Default for GuardConfig {
    /// Default configuration, built from the module constants.
    fn default() -> Self {
        Self {
            max_depth: MAX_RECURSION_DEPTH,
            max_concurrent: MAX_CONCURRENT_SLOTS,
            nested_trigger_depth: NESTED_TRIGGER_DEPTH,
            work_delay: SIMULATED_WORK_DELAY,
            nested_suffix: Cow::Borrowed(NESTED_SUFFIX),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}
