//! # BitVault Executor
//!
//! The command surface of the bitmap engine. This is the crate the wire
//! framing layer talks to:
//!
//! - [`Command`] - parsed, typed, self-contained operations
//! - [`Output`] - one reply shape per command
//! - [`Executor`] - the stateless dispatcher enforcing the per-key locking
//!   discipline
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use bitvault_executor::Executor;
//! use bitvault_storage::ByteStore;
//!
//! let executor = Executor::new(Arc::new(ByteStore::new()));
//!
//! let args: Vec<Vec<u8>> = ["SETBIT", "k", "7", "1"]
//!     .iter()
//!     .map(|s| s.as_bytes().to_vec())
//!     .collect();
//! let reply = executor.execute_args(&args)?;
//! ```
//!
//! Errors carry their wire message as the `Display` rendering, so the
//! framing layer forwards them verbatim.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod executor;
mod handlers;
mod output;

pub use bitvault_core::{Error, Limits, Result};
pub use bitvault_engine::FieldOp;
pub use command::{Command, CountRange};
pub use executor::Executor;
pub use output::Output;
