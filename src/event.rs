//! Counter-backed notification descriptors (eventfd).

use std::os::fd::{AsRawFd, FromRawFd, RawFd};

use crate::error::{cvt, cvt_i, Error, Result};
use crate::fd::Fd;

/// Event open flags, OR-able.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFlags(pub libc::c_int);

impl EventFlags {
    pub const NONE: Self = Self(0);
    pub const CLOSE_ON_EXEC: Self = Self(libc::EFD_CLOEXEC);
    pub const NON_BLOCK: Self = Self(libc::EFD_NONBLOCK);
    pub const SEMAPHORE: Self = Self(libc::EFD_SEMAPHORE);
}

impl std::ops::BitOr for EventFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A kernel counter usable as a flag or semaphore between threads and
/// processes, and watchable by a readiness registry.
#[derive(Debug, Default)]
pub struct Event {
    fd: Fd,
}

impl Event {
    /// New instance with no descriptor attached.
    pub fn new() -> Self {
        Event { fd: Fd::closed() }
    }

    /// Whether a descriptor is attached.
    pub fn is_open(&self) -> bool {
        self.fd.is_open()
    }

    /// Open with `initial` as the starting counter value.
    ///
    /// Fails with [`Error::AlreadyOpen`] while a descriptor is attached.
    pub fn open(&mut self, initial: u32, flags: EventFlags) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let raw = cvt_i(unsafe { libc::eventfd(initial, flags.0) })?;
        self.fd = Fd::adopt(raw);
        Ok(())
    }

    /// Add `value` to the counter, waking any blocked waiter.
    pub fn post(&self, value: u64) -> Result<()> {
        cvt(unsafe {
            libc::write(
                self.fd.raw(),
                (&value as *const u64).cast(),
                std::mem::size_of::<u64>(),
            )
        })?;
        Ok(())
    }

    /// Consume the counter and return the consumed value.
    ///
    /// With a positive counter, regular mode returns the whole counter
    /// and zeroes it; semaphore mode decrements by one and returns 1.
    /// With a zero counter the call blocks, or fails with `EAGAIN` when
    /// the event was opened non-blocking.
    pub fn wait(&self) -> Result<u64> {
        let mut value: u64 = 0;
        cvt(unsafe {
            libc::read(
                self.fd.raw(),
                (&mut value as *mut u64).cast(),
                std::mem::size_of::<u64>(),
            )
        })?;
        Ok(value)
    }

    /// Release the descriptor. Idempotent.
    pub fn close(&mut self) {
        self.fd.close();
    }
}

impl AsRawFd for Event {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw()
    }
}

impl FromRawFd for Event {
    /// Wrap an already-open eventfd descriptor. No validation of the
    /// descriptor's kind is performed.
    unsafe fn from_raw_fd(raw: RawFd) -> Self {
        Event { fd: Fd::adopt(raw) }
    }
}
