use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Reader,
    Writer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Reader => f.write_str("reader"),
            Role::Writer => f.write_str("writer"),
        }
    }
}

/// Which waiter a release is allowed to pick at the head of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Want {
    Reader,
    Writer,
    Any,
}

impl Want {
    pub fn admits(self, role: Role) -> bool {
        matches!(
            (self, role),
            (Want::Any, _) | (Want::Reader, Role::Reader) | (Want::Writer, Role::Writer)
        )
    }
}

/// State of the slot a ticket indexes into.
///
/// A ticket starts `*Waiting`, is flipped exactly once to the matching `*Pending`
/// by whoever releases it, and goes back to `Vacant` when its thread dequeues it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Token {
    #[default]
    Vacant,
    ReaderWaiting,
    ReaderPending,
    WriterWaiting,
    WriterPending,
    /// Outstanding ticket whose thread left its wait abnormally.
    Abandoned,
}

impl Token {
    pub fn waiting(role: Role) -> Self {
        match role {
            Role::Reader => Token::ReaderWaiting,
            Role::Writer => Token::WriterWaiting,
        }
    }

    pub fn pending(role: Role) -> Self {
        match role {
            Role::Reader => Token::ReaderPending,
            Role::Writer => Token::WriterPending,
        }
    }

    pub fn role(self) -> Option<Role> {
        match self {
            Token::ReaderWaiting | Token::ReaderPending => Some(Role::Reader),
            Token::WriterWaiting | Token::WriterPending => Some(Role::Writer),
            Token::Vacant | Token::Abandoned => None,
        }
    }

    pub fn is_waiting(self) -> bool {
        matches!(self, Token::ReaderWaiting | Token::WriterWaiting)
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Token::ReaderPending | Token::WriterPending)
    }

    pub fn as_char(self) -> char {
        match self {
            Token::Vacant => '-',
            Token::ReaderWaiting => 'R',
            Token::ReaderPending => 'r',
            Token::WriterWaiting => 'W',
            Token::WriterPending => 'w',
            Token::Abandoned => 'x',
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
