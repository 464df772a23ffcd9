use crate::error::{Error, Result};

/// Bounded circular FIFO handing out slot indices ("tickets") in arrival order.
///
/// The ring only does the index arithmetic. What a slot means lives in the
/// token storage next to it, and all calls happen under the owning lock's mutex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    capacity: usize,
    head: usize,
    used: usize,
}

impl Ring {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            head: 0,
            used: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn is_full(&self) -> bool {
        self.used == self.capacity
    }

    /// Ticket following `ticket` in ring order.
    pub fn next(&self, ticket: usize) -> usize {
        (ticket + 1) % self.capacity
    }

    /// Allocates the ticket at the tail, or `None` when every slot is outstanding.
    pub fn request(&mut self) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let ticket = (self.head + self.used) % self.capacity;
        self.used += 1;
        Some(ticket)
    }

    pub fn peek(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.head)
    }

    /// Most recently requested ticket still outstanding.
    pub fn last(&self) -> Option<usize> {
        (!self.is_empty()).then(|| (self.head + self.used - 1) % self.capacity)
    }

    /// Retires `ticket`, which must be the head.
    pub fn dequeue(&mut self, ticket: usize) -> Result<()> {
        match self.peek() {
            Some(head) if head == ticket => {
                self.head = self.next(head);
                self.used -= 1;
                Ok(())
            }
            head => Err(Error::InvariantViolation(format!(
                "dequeue of ticket {ticket} but head is {head:?}"
            ))),
        }
    }

    /// Takes back the most recent [`request`](Ring::request).
    pub fn revoke_last(&mut self) -> Option<usize> {
        let last = self.last()?;
        self.used -= 1;
        Some(last)
    }

    /// Outstanding tickets from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.used).map(move |offset| (self.head + offset) % self.capacity)
    }
}
