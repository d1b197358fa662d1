//! The Executor - single entry point to the bitmap engine.
//!
//! The Executor is a stateless dispatcher that routes parsed commands to
//! the appropriate handler and enforces the locking discipline: shared
//! latches for readers, exclusive latches for writers, ordered multi-key
//! acquisition for BITOP. All state lives in the store.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use bitvault_core::{Limits, Result};
use bitvault_storage::ByteStore;

use crate::{Command, Output};

/// The command executor - single entry point to the bitmap engine.
///
/// # Thread Safety
///
/// `Executor` is `Send + Sync` and is shared across worker threads; each
/// worker dispatches one command at a time. Per-key linearization happens
/// in the handlers via the store's latch surface.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use bitvault_executor::{Command, Executor};
/// use bitvault_storage::ByteStore;
///
/// let executor = Executor::new(Arc::new(ByteStore::new()));
/// let out = executor.execute(Command::SetBit {
///     key: b"k".to_vec(),
///     offset: 7,
///     value: true,
/// })?;
/// ```
pub struct Executor {
    store: Arc<ByteStore>,
    limits: Limits,
}

impl Executor {
    /// Create an executor over `store` with default limits.
    pub fn new(store: Arc<ByteStore>) -> Self {
        Self::with_limits(store, Limits::default())
    }

    /// Create an executor with explicit limits.
    pub fn with_limits(store: Arc<ByteStore>, limits: Limits) -> Self {
        Executor { store, limits }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<ByteStore> {
        &self.store
    }

    /// The limits this executor enforces.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Parse and execute a raw argument vector.
    ///
    /// This is the seam the wire framing layer calls into: one argument
    /// vector in, one reply (or one error whose `Display` string is the
    /// wire message) out. Parse errors change no state.
    pub fn execute_args(&self, args: &[Vec<u8>]) -> Result<Output> {
        self.execute(Command::parse(args)?)
    }

    /// Execute a single parsed command.
    pub fn execute(&self, cmd: Command) -> Result<Output> {
        let name = cmd.name();
        let start = Instant::now();

        let result = self.dispatch(cmd);

        match &result {
            Ok(_) => {
                debug!(
                    target: "bitvault::command",
                    command = name,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "executed"
                );
            }
            Err(err) => {
                warn!(
                    target: "bitvault::command",
                    command = name,
                    error = %err,
                    "rejected"
                );
            }
        }
        result
    }

    fn dispatch(&self, cmd: Command) -> Result<Output> {
        match cmd {
            Command::SetBit { key, offset, value } => {
                crate::handlers::bits::set_bit(&self.store, &self.limits, &key, offset, value)
            }
            Command::GetBit { key, offset } => {
                crate::handlers::bits::get_bit(&self.store, &key, offset)
            }
            Command::BitCount { key, range } => {
                crate::handlers::bits::bit_count(&self.store, &key, range.as_ref())
            }
            Command::BitPos {
                key,
                bit,
                start,
                end,
                unit,
            } => crate::handlers::bits::bit_pos(&self.store, &key, bit, start, end, unit),
            Command::BitOp { op, dest, sources } => {
                crate::handlers::bitop::bit_op(&self.store, op, &dest, &sources)
            }
            Command::BitField { key, ops } => {
                crate::handlers::bitfield::bit_field(&self.store, &self.limits, &key, &ops)
            }
            Command::BitFieldRo { key, ops } => {
                crate::handlers::bitfield::bit_field_ro(&self.store, &self.limits, &key, &ops)
            }
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("store", &self.store)
            .finish()
    }
}
