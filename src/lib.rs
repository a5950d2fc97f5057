//! # tempo - deadline scheduling substrate
//!
//! Timeout bookkeeping for an event-driven I/O engine, split the way the
//! engine consumes it:
//!
//! - `tempo_tree` (workspace member) for the comparator-free red-black
//!   index that keeps deadline records ordered
//! - `timeout` for the [`TimerQueue`] keyed by absolute expiry time
//!
//! The event-loop mechanics themselves (readiness polling, dispatch) live
//! outside this crate; they drive the queue through `schedule`,
//! `next_deadline`, `pop_expired`, and `cancel`.

mod error;
mod timeout;

pub use error::{TimerError, TimerResult};
pub use timeout::{TimerHandle, TimerQueue};

pub use tempo_tree::{InOrder, InsertionPoint, NodeId, RBIndex, Side};
