//! Reader-writer lock with first-come first-served admission, built on a
//! mutex, two condition variables and a bounded ring of waiter tickets.
//!
//! ```
//! use fairrw::{FairRwLock, ReaderWriter};
//!
//! let lock = FairRwLock::with_capacity(8).unwrap();
//! {
//!     let _reading = lock.read().unwrap();
//!     assert_eq!(lock.snapshot().unwrap().reading, 1);
//! }
//! lock.begin_write().unwrap();
//! lock.end_write().unwrap();
//! lock.fini().unwrap();
//! ```

pub mod config;
pub mod error;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
pub use sync::{
    diagnostics::Snapshot,
    readerwriter::{FairRwLock, Sink},
    token::{Role, Token},
    ReadGuard, ReaderWriter, WriteGuard,
};
