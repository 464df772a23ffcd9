pub mod diagnostics;
pub mod readerwriter;
pub mod ring;
pub mod token;

use tracing::error;

use crate::error::Result;

/// Fair Reader Writer lock admits waiters in the order they arrived.
///
/// The requirements for that are
/// 1. Mutual Exclusion - any number of readers, or exactly one writer, are inside at a time.
/// 2. No Starvation - once a writer queues, no reader arriving after it gets in first,
/// however many keep coming.
///
/// `begin_*` blocks until admitted (or fails without being admitted). `end_*` never blocks.
pub trait ReaderWriter {
    fn begin_read(&self) -> Result<()>;
    fn end_read(&self) -> Result<()>;
    fn begin_write(&self) -> Result<()>;
    fn end_write(&self) -> Result<()>;

    // Guards end the section on drop, unwinding included
    fn read(&self) -> Result<ReadGuard<'_, Self>> {
        self.begin_read()?;
        Ok(ReadGuard { lock: self })
    }
    fn write(&self) -> Result<WriteGuard<'_, Self>> {
        self.begin_write()?;
        Ok(WriteGuard { lock: self })
    }

    fn with_read<T>(&self, f: impl FnOnce() -> T) -> Result<T>
    where
        Self: Sized,
    {
        let _guard = self.read()?;
        Ok(f())
    }
    fn with_write<T>(&self, f: impl FnOnce() -> T) -> Result<T>
    where
        Self: Sized,
    {
        let _guard = self.write()?;
        Ok(f())
    }
}

#[must_use = "dropping the guard ends the read section"]
pub struct ReadGuard<'a, L: ReaderWriter + ?Sized> {
    lock: &'a L,
}

impl<L: ReaderWriter + ?Sized> Drop for ReadGuard<'_, L> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.end_read() {
            error!(%err, "failed to end read section");
        }
    }
}

#[must_use = "dropping the guard ends the write section"]
pub struct WriteGuard<'a, L: ReaderWriter + ?Sized> {
    lock: &'a L,
}

impl<L: ReaderWriter + ?Sized> Drop for WriteGuard<'_, L> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.end_write() {
            error!(%err, "failed to end write section");
        }
    }
}
