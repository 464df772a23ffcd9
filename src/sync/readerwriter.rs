//! Fair reader-writer lock built from one mutex and two condition variables.
//!
//! Threads that cannot be admitted right away take a ticket from a bounded
//! [`Ring`] and park on the condition variable of their role. Releasing a waiter
//! means flipping the token of the ring head from `*Waiting` to `*Pending` and
//! broadcasting on that role's condition variable. Condition variables make no
//! FIFO promise, so every woken thread re-checks that it is both the head and
//! pending, and the others go back to sleep.
//!
//! Whoever releases a waiter also bumps `reading`/`writing` on its behalf while
//! still holding the mutex, so the counters are right the moment the decision is
//! made and not whenever the OS gets around to running the woken thread.
//!
//! Once anybody is queued no newcomer takes the fast path, reader or not. That
//! is what keeps a steady stream of readers from starving a queued writer.

use std::{
    fmt,
    io::Write,
    sync::{Condvar, Mutex, MutexGuard},
};

use tracing::{debug, error, warn};

use super::{
    diagnostics::Snapshot,
    ring::Ring,
    token::{Role, Token, Want},
    ReaderWriter,
};
use crate::{
    config::Config,
    error::{Error, Result},
};

/// Where diagnostic lines go.
pub type Sink = Box<dyn Write + Send>;

struct State<S> {
    reading: usize,
    writing: usize,
    ring: Ring,
    tokens: S,
    sink: Option<Sink>,
}

impl<S> State<S>
where
    S: AsRef<[Token]> + AsMut<[Token]>,
{
    fn token(&self, ticket: usize) -> Token {
        self.tokens.as_ref()[ticket]
    }

    fn set(&mut self, ticket: usize, token: Token) {
        self.tokens.as_mut()[ticket] = token;
    }

    fn is_released(&self, ticket: usize, role: Role) -> bool {
        self.ring.peek() == Some(ticket) && self.token(ticket) == Token::pending(role)
    }

    /// Gives up `ticket` after its thread left the wait abnormally, taking back
    /// any credit a releaser already gave it.
    ///
    /// Abandoned tickets are revoked from the tail only, so one that still has
    /// live tickets behind it stays queued as [`Token::Abandoned`].
    fn abandon(&mut self, ticket: usize) {
        match self.token(ticket) {
            Token::ReaderPending => self.reading = self.reading.saturating_sub(1),
            Token::WriterPending => self.writing = 0,
            _ => {}
        }
        self.set(ticket, Token::Abandoned);
        while let Some(last) = self.ring.last() {
            if self.token(last) != Token::Abandoned {
                break;
            }
            self.ring.revoke_last();
            self.set(last, Token::Vacant);
        }
    }

    fn is_consistent(&self) -> bool {
        let exclusive = (self.reading > 0 && self.writing == 0)
            || (self.reading == 0 && self.writing <= 1);
        // only the head may have been picked for release
        let pending_at_head = self
            .ring
            .iter()
            .skip(1)
            .all(|ticket| !self.token(ticket).is_pending());
        exclusive && pending_at_head
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            reading: self.reading,
            writing: self.writing,
            queue: self
                .ring
                .iter()
                .map(|ticket| (ticket, self.token(ticket)))
                .collect(),
        }
    }
}

/// Reader-writer lock admitting waiters strictly in arrival order.
///
/// `S` is the token storage, one slot per thread that may be queued at once.
/// Its length is the ring capacity. Pass `&mut [Token]` to lend caller-owned
/// storage for the lifetime of the lock, or let
/// [`with_capacity`](FairRwLock::with_capacity) allocate it.
pub struct FairRwLock<S = Vec<Token>> {
    state: Mutex<State<S>>,
    readers: Condvar,
    writers: Condvar,
    capacity: usize,
    config: Config,
}

impl FairRwLock<Vec<Token>> {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(vec![Token::Vacant; capacity])
    }
}

impl<S> FairRwLock<S>
where
    S: AsRef<[Token]> + AsMut<[Token]>,
{
    pub fn new(storage: S) -> Result<Self> {
        Self::with_config(storage, Config::default())
    }

    pub fn with_config(mut storage: S, config: Config) -> Result<Self> {
        let capacity = storage.as_ref().len();
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        storage.as_mut().fill(Token::Vacant);
        Ok(Self {
            state: Mutex::new(State {
                reading: 0,
                writing: 0,
                ring: Ring::new(capacity),
                tokens: storage,
                sink: None,
            }),
            readers: Condvar::new(),
            writers: Condvar::new(),
            capacity,
            config,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tears the lock down and hands back the token storage.
    ///
    /// Fails with [`Error::Busy`] unless nobody is reading, writing or queued.
    pub fn fini(self) -> Result<S> {
        let state = self.state.into_inner().map_err(|_| Error::Poisoned)?;
        if state.reading != 0 || state.writing != 0 || !state.ring.is_empty() {
            return Err(Error::Busy {
                reading: state.reading,
                writing: state.writing,
                waiting: state.ring.len(),
            });
        }
        Ok(state.tokens)
    }

    /// Installs (or with `None`, removes) the sink every entry point dumps its
    /// view of the lock to, returning the previous one.
    pub fn attach_diagnostics(&self, sink: Option<Sink>) -> Result<Option<Sink>> {
        let mut state = self.lock()?;
        Ok(std::mem::replace(&mut state.sink, sink))
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.lock()?.snapshot())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State<S>>> {
        self.state.lock().map_err(|_| {
            error!(lock = %self.config.name, "mutex poisoned");
            self.wake_all();
            Error::Poisoned
        })
    }

    /// Kicks every parked thread so it sees the poisoned mutex and bails out.
    fn wake_all(&self) {
        self.readers.notify_all();
        self.writers.notify_all();
    }

    fn violation(&self, state: &State<S>, op: &str) -> Error {
        let message = format!("{}::{op}: {}", self.config.name, state.snapshot());
        if self.config.strict {
            panic!("invariant violated in {message}");
        }
        error!(lock = %self.config.name, op, "invariant violated: {message}");
        Error::InvariantViolation(message)
    }

    fn condvar(&self, role: Role) -> &Condvar {
        match role {
            Role::Reader => &self.readers,
            Role::Writer => &self.writers,
        }
    }

    /// Queues the caller and blocks until its ticket is released at the head of
    /// the ring. The releaser has already accounted for the caller in the
    /// counters by the time this returns.
    fn suspend<'a>(
        &'a self,
        mut state: MutexGuard<'a, State<S>>,
        role: Role,
    ) -> Result<(MutexGuard<'a, State<S>>, usize)> {
        let op = match role {
            Role::Reader => "begin_read",
            Role::Writer => "begin_write",
        };
        let Some(ticket) = state.ring.request() else {
            warn!(lock = %self.config.name, %role, capacity = self.capacity, "ticket ring full");
            self.dump(&mut state, op);
            return Err(Error::Full {
                capacity: self.capacity,
            });
        };
        state.set(ticket, Token::waiting(role));
        self.log(&state, role, Some(ticket), "waiting");

        let mut state = match self
            .condvar(role)
            .wait_while(state, |state| !state.is_released(ticket, role))
        {
            Ok(state) => state,
            Err(poisoned) => {
                let mut state = poisoned.into_inner();
                state.abandon(ticket);
                error!(lock = %self.config.name, %role, ticket, "wait failed, ticket abandoned");
                drop(state);
                self.wake_all();
                return Err(Error::Poisoned);
            }
        };

        self.retire(&mut state, ticket, op)?;
        self.log(&state, role, Some(ticket), "running");
        Ok((state, ticket))
    }

    /// Dequeues the caller's own released ticket.
    fn retire(&self, state: &mut State<S>, ticket: usize, op: &str) -> Result<()> {
        if state.ring.dequeue(ticket).is_err() {
            state.abandon(ticket);
            return Err(self.violation(state, op));
        }
        state.set(ticket, Token::Vacant);
        Ok(())
    }

    /// Releases the ring head if it is a waiter `want` admits. Never looks past
    /// the head, so at most one ticket is released per call.
    fn resume(&self, state: &mut State<S>, want: Want) -> Option<Role> {
        let ticket = state.ring.peek()?;
        let token = state.token(ticket);
        let role = token
            .role()
            .filter(|&role| token.is_waiting() && want.admits(role))?;
        state.set(ticket, Token::pending(role));
        self.condvar(role).notify_all();
        self.log(state, role, Some(ticket), "signaled");
        Some(role)
    }

    fn log(&self, state: &State<S>, role: Role, ticket: Option<usize>, event: &str) {
        debug!(
            lock = %self.config.name,
            %role,
            ticket = ?ticket,
            reading = state.reading,
            writing = state.writing,
            waiting = state.ring.len(),
            "{event}"
        );
    }

    fn dump(&self, state: &mut State<S>, op: &str) {
        if state.sink.is_none() {
            return;
        }
        let line = format!(
            "{}::{op}({:p}): {}\n",
            self.config.name,
            self,
            state.snapshot()
        );
        if let Some(sink) = state.sink.as_mut() {
            if let Err(err) = sink.write_all(line.as_bytes()).and_then(|()| sink.flush()) {
                warn!(lock = %self.config.name, %err, "diagnostic sink failed");
            }
        }
    }

    /// Exit check of every entry point. `expected` is the op-specific condition.
    fn verify(&self, state: &State<S>, op: &str, expected: bool) -> Result<()> {
        if expected && state.is_consistent() {
            return Ok(());
        }
        Err(self.violation(state, op))
    }
}

impl<S> ReaderWriter for FairRwLock<S>
where
    S: AsRef<[Token]> + AsMut<[Token]>,
{
    fn begin_read(&self) -> Result<()> {
        let mut state = self.lock()?;
        self.log(&state, Role::Reader, None, "begin enter");

        let (mut state, ticket) = if state.writing == 0 && state.ring.is_empty() {
            state.reading += 1;
            (state, None)
        } else {
            let (state, ticket) = self.suspend(state, Role::Reader)?;
            (state, Some(ticket))
        };

        // Cascade: a reader right behind us may run too, and will in turn check
        // the reader behind it.
        if let Some(Role::Reader) = self.resume(&mut state, Want::Reader) {
            state.reading += 1;
        }

        self.log(&state, Role::Reader, ticket, "begin exit");
        self.dump(&mut state, "begin_read");
        let admitted = state.reading > 0 && state.writing == 0;
        self.verify(&state, "begin_read", admitted)
    }

    fn end_read(&self) -> Result<()> {
        let mut state = self.lock()?;
        self.log(&state, Role::Reader, None, "end enter");
        if state.reading == 0 {
            warn!(lock = %self.config.name, "end_read without begin_read");
            self.dump(&mut state, "end_read");
            return Err(Error::NotHeld { role: Role::Reader });
        }

        state.reading -= 1;
        if state.reading == 0 {
            match self.resume(&mut state, Want::Any) {
                Some(Role::Reader) => {
                    warn!(lock = %self.config.name, "reader was queued while no one was writing");
                    state.reading += 1;
                }
                Some(Role::Writer) => state.writing += 1,
                None => {}
            }
        }

        self.log(&state, Role::Reader, None, "end exit");
        self.dump(&mut state, "end_read");
        self.verify(&state, "end_read", true)
    }

    fn begin_write(&self) -> Result<()> {
        let mut state = self.lock()?;
        self.log(&state, Role::Writer, None, "begin enter");

        let (mut state, ticket) =
            if state.reading == 0 && state.writing == 0 && state.ring.is_empty() {
                state.writing = 1;
                (state, None)
            } else {
                let (state, ticket) = self.suspend(state, Role::Writer)?;
                (state, Some(ticket))
            };

        self.log(&state, Role::Writer, ticket, "begin exit");
        self.dump(&mut state, "begin_write");
        let admitted = state.reading == 0 && state.writing == 1;
        self.verify(&state, "begin_write", admitted)
    }

    fn end_write(&self) -> Result<()> {
        let mut state = self.lock()?;
        self.log(&state, Role::Writer, None, "end enter");
        if state.writing != 1 {
            warn!(lock = %self.config.name, "end_write without begin_write");
            self.dump(&mut state, "end_write");
            return Err(Error::NotHeld { role: Role::Writer });
        }

        state.writing = 0;
        match self.resume(&mut state, Want::Any) {
            Some(Role::Reader) => state.reading += 1,
            Some(Role::Writer) => state.writing += 1,
            None => {}
        }

        self.log(&state, Role::Writer, None, "end exit");
        self.dump(&mut state, "end_write");
        self.verify(&state, "end_write", true)
    }
}

impl<S> fmt::Debug for FairRwLock<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FairRwLock")
            .field("name", &self.config.name)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
