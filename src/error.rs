use crate::sync::token::Role;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("token storage must hold at least one slot")]
    ZeroCapacity,
    /// Every ticket is outstanding. Never retried by the lock, the caller picks the backoff.
    #[error("ticket ring full at capacity {capacity}")]
    Full { capacity: usize },
    #[error("{role} section ended without being begun")]
    NotHeld { role: Role },
    #[error("lock still in use: {reading} reading, {writing} writing, {waiting} waiting")]
    Busy {
        reading: usize,
        writing: usize,
        waiting: usize,
    },
    /// Ticket queue or counters disagree with the scheduler. Fatal unless the lock is lenient.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("lock poisoned by a thread that panicked inside it")]
    Poisoned,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
