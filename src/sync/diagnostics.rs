use std::fmt;

use super::token::Token;

/// Point-in-time copy of a lock's counters and queue, taken under its mutex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub reading: usize,
    pub writing: usize,
    /// Outstanding `(ticket, token)` pairs, head first.
    pub queue: Vec<(usize, Token)>,
}

impl Snapshot {
    pub fn waiting(&self) -> usize {
        self.queue.len()
    }

    pub fn pending(&self) -> usize {
        self.count(Token::is_pending)
    }

    pub fn readers(&self) -> usize {
        self.count(|token| token == Token::ReaderWaiting)
    }

    pub fn writers(&self) -> usize {
        self.count(|token| token == Token::WriterWaiting)
    }

    fn count(&self, f: impl Fn(Token) -> bool) -> usize {
        self.queue.iter().filter(|&&(_, token)| f(token)).count()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}reading {}writing {}waiting {}pending {}readers {}writers",
            self.reading,
            self.writing,
            self.waiting(),
            self.pending(),
            self.readers(),
            self.writers()
        )?;
        for (ticket, token) in &self.queue {
            write!(f, " [{ticket}]{{{token}}}")?;
        }
        Ok(())
    }
}
