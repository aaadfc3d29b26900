//! Handler collaborator: the work a guard wraps.
//!
//! - [`Handler`] async trait invoked for every admitted event;
//! - [`HandlerFn`] closure-backed implementation;
//! - [`SimulatedWork`] default implementation (fixed sleep).

mod handler;
mod handler_fn;
mod simulated;

pub use handler::{EventContext, Handler, HandlerRef};
pub use handler_fn::HandlerFn;
pub use simulated::SimulatedWork;
