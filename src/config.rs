use std::borrow::Cow;

/// Knobs for a [`FairRwLock`](crate::FairRwLock). The ring capacity is not one of
/// them, it is the length of the token storage handed to the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix of diagnostic lines and a field on every tracing event.
    pub name: Cow<'static, str>,
    /// Panic on an invariant violation instead of returning it.
    pub strict: bool,
}

impl Config {
    pub const DEFAULT_NAME: &'static str = "readerwriter";

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed(Self::DEFAULT_NAME),
            strict: true,
        }
    }
}
