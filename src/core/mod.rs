//! Guard core: admission state machine and its shared state.
//!
//! The only public API from this module is [`Guard`] (with [`GuardBuilder`] and
//! [`GuardSnapshot`]).
//!
//! Internal modules:
//! - [`guard`]: the ordered admission sequence, body execution and rollback;
//! - [`builder`]: wires bus, subscribers and handler;
//! - [`slots`]: slot gate with RAII release;
//! - [`ledger`]: seen-event set and reentrancy flag.

mod builder;
mod guard;
mod ledger;
mod slots;

pub use builder::GuardBuilder;
pub use guard::{Guard, GuardSnapshot};
