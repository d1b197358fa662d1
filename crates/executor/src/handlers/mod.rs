//! Command handlers.
//!
//! Each module implements the handlers for one command group as free
//! functions over the shared store. Handlers own the latch acquisition for
//! their command; the dispatcher has already validated every argument.

pub mod bitfield;
pub mod bitop;
pub mod bits;
