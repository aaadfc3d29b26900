//! Guard events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Guard::try_process` (every outcome), `Guard::reset`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the guard's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained from `Guard::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
