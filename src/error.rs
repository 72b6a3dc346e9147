//! Error types shared by all descriptor operations.
//!
//! Every fallible operation either rejects its arguments before touching
//! the kernel ([`Error::InvalidInput`]), refuses to run against the
//! object's current state ([`Error::AlreadyOpen`]), or surfaces a failed
//! syscall with the raw OS code ([`Error::Os`]). Nothing is retried
//! internally — an interrupted call (`EINTR`) comes back to the caller
//! like any other OS error.

use std::fmt;
use std::io;

use thiserror::Error;

/// A raw OS error code, as captured from the calling thread's errno.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Errno(pub i32);

impl Errno {
    /// Capture the current thread's errno.
    pub(crate) fn last() -> Self {
        Errno(io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO))
    }

    /// The positive errno value.
    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", io::Error::from_raw_os_error(self.0))
    }
}

impl std::error::Error for Errno {}

/// Errors returned by descriptor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The object already holds a live descriptor.
    #[error("object already holds an open descriptor")]
    AlreadyOpen,
    /// A caller argument was rejected before any syscall was made.
    #[error("invalid argument: {0}")]
    InvalidInput(&'static str),
    /// A syscall failed with the contained OS error.
    #[error(transparent)]
    Os(#[from] Errno),
}

impl Error {
    /// This error in the `-errno` integer convention used on the wire
    /// with the kernel: `AlreadyOpen` maps to `-EBUSY`, `InvalidInput`
    /// to `-EINVAL`, and OS errors to their negated code.
    pub fn raw_code(&self) -> i32 {
        match self {
            Error::AlreadyOpen => -libc::EBUSY,
            Error::InvalidInput(_) => -libc::EINVAL,
            Error::Os(errno) => -errno.0,
        }
    }

    /// The OS error code, if this error came from a failed syscall.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            Error::Os(errno) => Some(errno.0),
            _ => None,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Translate a byte-count syscall return. Negative means errno is set;
/// any non-negative count, including a short one, is a success.
pub(crate) fn cvt(ret: libc::ssize_t) -> Result<usize> {
    if ret < 0 {
        Err(Errno::last().into())
    } else {
        Ok(ret as usize)
    }
}

/// Translate an integer syscall return.
pub(crate) fn cvt_i(ret: libc::c_int) -> Result<libc::c_int> {
    if ret < 0 {
        Err(Errno::last().into())
    } else {
        Ok(ret)
    }
}
