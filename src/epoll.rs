//! Readiness multiplexing over registered descriptors.

use std::marker::PhantomData;
use std::os::fd::{AsRawFd, RawFd};

use crate::error::{cvt_i, Error, Result};
use crate::fd::Fd;
use crate::metrics;

/// A readiness registry over borrowed pollable objects.
///
/// Registered objects are watched for readability, level-triggered. The
/// kernel stores each object's address as an opaque tag and echoes it
/// back on readiness; [`Epoll::wait`] resolves the tag to the reference
/// that was registered. The `'set` borrow keeps every registered object
/// alive and in place for the registry's lifetime, which is what makes
/// that resolution sound.
///
/// No locking is performed here. Mutating the watch set while another
/// thread is blocked in `wait` is exactly as safe as the kernel makes
/// it, and is the caller's responsibility.
///
/// An `Epoll` is itself pollable, so registries can nest.
pub struct Epoll<'set, T: AsRawFd> {
    fd: Fd,
    // Invariant over 'set: a registered borrow must not shorten.
    _watched: PhantomData<fn(&'set T) -> &'set T>,
}

impl<'set, T: AsRawFd> Epoll<'set, T> {
    /// New instance with no descriptor attached.
    pub fn new() -> Self {
        Epoll {
            fd: Fd::closed(),
            _watched: PhantomData,
        }
    }

    /// Whether a descriptor is attached.
    pub fn is_open(&self) -> bool {
        self.fd.is_open()
    }

    /// Create the kernel multiplexer. Re-opening an open registry is a
    /// caller error, reported as [`Error::AlreadyOpen`].
    pub fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let raw = cvt_i(unsafe { libc::epoll_create1(0) })?;
        self.fd = Fd::adopt(raw);
        Ok(())
    }

    /// Watch `object` for readability.
    ///
    /// The kernel refuses an invalid descriptor (`EBADF`) or one that is
    /// already registered here (`EEXIST`).
    pub fn add_watch(&self, object: &'set T) -> Result<()> {
        let mut event = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: object as *const T as u64,
        };
        cvt_i(unsafe {
            libc::epoll_ctl(
                self.fd.raw(),
                libc::EPOLL_CTL_ADD,
                object.as_raw_fd(),
                &mut event,
            )
        })?;
        Ok(())
    }

    /// Stop watching `object`. Removing a descriptor that was never
    /// registered fails fast with `ENOENT`.
    pub fn remove_watch(&self, object: &T) -> Result<()> {
        cvt_i(unsafe {
            libc::epoll_ctl(
                self.fd.raw(),
                libc::EPOLL_CTL_DEL,
                object.as_raw_fd(),
                std::ptr::null_mut(),
            )
        })?;
        Ok(())
    }

    /// Wait for readiness on up to `N` watched objects.
    ///
    /// A negative `timeout_ms` blocks indefinitely; `0` returns
    /// immediately. Ready slots are filled in kernel-delivery order and
    /// the ready count is returned (`0` on timeout); slots past the
    /// count keep their previous contents. Ready descriptors beyond `N`
    /// stay pending for a subsequent call.
    pub fn wait<const N: usize>(
        &self,
        ready: &mut [Option<&'set T>; N],
        timeout_ms: i32,
    ) -> Result<usize> {
        const { assert!(N > 0, "wait capacity must be positive") };

        let mut events: [libc::epoll_event; N] = unsafe { std::mem::zeroed() };
        let count = cvt_i(unsafe {
            libc::epoll_wait(
                self.fd.raw(),
                events.as_mut_ptr(),
                N as libc::c_int,
                timeout_ms,
            )
        })? as usize;

        for (slot, event) in ready.iter_mut().zip(&events[..count]) {
            let tag = event.u64;
            // Safety: the tag is the address stored by `add_watch`, and
            // the `'set` borrow keeps the referent alive and in place.
            *slot = Some(unsafe { &*(tag as *const T) });
        }

        metrics::READY_EVENTS.add(count as u64);
        Ok(count)
    }

    /// Release the descriptor. The kernel drops the watch set with it.
    /// Idempotent.
    pub fn close(&mut self) {
        self.fd.close();
    }
}

impl<T: AsRawFd> Default for Epoll<'_, T> {
    fn default() -> Self {
        Epoll::new()
    }
}

impl<T: AsRawFd> AsRawFd for Epoll<'_, T> {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw()
    }
}
