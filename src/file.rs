//! Regular-file descriptors and the byte-stream operation set.
//!
//! [`File`] starts with no descriptor attached; [`File::open`] attaches
//! one and a second `open` without an intervening [`File::close`] is
//! refused. Every transfer may legitimately move fewer bytes than
//! requested — short results come back as `Ok(n)` and are never retried
//! here.

use std::ffi::CString;
use std::os::fd::{AsRawFd, FromRawFd, RawFd};

use crate::buffer::{as_iovecs, as_iovecs_mut, ByteView, ByteViewMut};
use crate::error::{cvt, cvt_i, Error, Result};
use crate::fd::Fd;
use crate::metrics;

/// Open flags, passed through to `open(2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags(pub libc::c_int);

impl OpenFlags {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(libc::O_RDONLY);
    pub const WRITE: Self = Self(libc::O_WRONLY);
    pub const READ_WRITE: Self = Self(libc::O_RDWR);
    pub const APPEND: Self = Self(libc::O_APPEND);
    pub const CLOSE_ON_EXEC: Self = Self(libc::O_CLOEXEC);
    pub const CREATE: Self = Self(libc::O_CREAT);
    pub const DIRECT: Self = Self(libc::O_DIRECT);
    pub const DIRECTORY: Self = Self(libc::O_DIRECTORY);
    pub const DATA_SYNC: Self = Self(libc::O_DSYNC);
    pub const EXPECT_CREATION: Self = Self(libc::O_EXCL);
    pub const NO_ACCESS_TIMES: Self = Self(libc::O_NOATIME);
    pub const NO_CONTROLLING_TERMINAL: Self = Self(libc::O_NOCTTY);
    pub const NO_FOLLOW_LINKS: Self = Self(libc::O_NOFOLLOW);
    pub const NON_BLOCK: Self = Self(libc::O_NONBLOCK);
    pub const PATH: Self = Self(libc::O_PATH);
    pub const SYNC: Self = Self(libc::O_SYNC);
    pub const TEMP_FILE: Self = Self(libc::O_TMPFILE);
    pub const TRUNCATE: Self = Self(libc::O_TRUNC);
}

impl std::ops::BitOr for OpenFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Permission bits applied when a file is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode(pub libc::mode_t);

impl Mode {
    pub const USER_ALL: Self = Self(libc::S_IRWXU);
    pub const USER_READ: Self = Self(libc::S_IRUSR);
    pub const USER_WRITE: Self = Self(libc::S_IWUSR);
    pub const USER_EXEC: Self = Self(libc::S_IXUSR);
    pub const GROUP_ALL: Self = Self(libc::S_IRWXG);
    pub const GROUP_READ: Self = Self(libc::S_IRGRP);
    pub const GROUP_WRITE: Self = Self(libc::S_IWGRP);
    pub const GROUP_EXEC: Self = Self(libc::S_IXGRP);
    pub const OTHERS_ALL: Self = Self(libc::S_IRWXO);
    pub const OTHERS_READ: Self = Self(libc::S_IROTH);
    pub const OTHERS_WRITE: Self = Self(libc::S_IWOTH);
    pub const OTHERS_EXEC: Self = Self(libc::S_IXOTH);
    pub const SET_USER_ID: Self = Self(libc::S_ISUID);
    pub const SET_GROUP_ID: Self = Self(libc::S_ISGID);
    pub const STICKY: Self = Self(libc::S_ISVTX);

    /// Owner read/write; group and others read.
    pub const DEFAULT: Self =
        Self(libc::S_IRUSR | libc::S_IWUSR | libc::S_IRGRP | libc::S_IROTH);
}

impl std::ops::BitOr for Mode {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Mode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Byte-stream operations over an open descriptor.
///
/// Provided methods issue the syscall directly against
/// [`AsRawFd::as_raw_fd`]. A short transfer is a valid result, not an
/// error; `Ok(0)` from a read conventionally signals end-of-stream.
pub trait Stream: AsRawFd {
    /// Read up to `buf.len()` bytes into `buf`.
    fn read(&self, buf: ByteViewMut<'_>) -> Result<usize> {
        if buf.as_ptr().is_null() {
            return Err(Error::InvalidInput("null buffer"));
        }
        let n = cvt(unsafe { libc::read(self.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) })?;
        metrics::BYTES_READ.add(n as u64);
        Ok(n)
    }

    /// Write up to `buf.len()` bytes from `buf`.
    fn write(&self, buf: ByteView<'_>) -> Result<usize> {
        if buf.as_ptr().is_null() {
            return Err(Error::InvalidInput("null buffer"));
        }
        let n = cvt(unsafe { libc::write(self.as_raw_fd(), buf.as_ptr().cast(), buf.len()) })?;
        metrics::BYTES_WRITTEN.add(n as u64);
        Ok(n)
    }

    /// Scatter-read into `bufs`, in order, with a single syscall.
    /// Returns the aggregate byte count.
    fn read_vectored(&self, bufs: &[ByteViewMut<'_>]) -> Result<usize> {
        let iov = as_iovecs_mut(bufs);
        let n = cvt(unsafe {
            libc::readv(self.as_raw_fd(), iov.as_ptr(), iov.len() as libc::c_int)
        })?;
        metrics::BYTES_READ.add(n as u64);
        Ok(n)
    }

    /// Gather-write from `bufs`, in order, with a single syscall.
    /// Returns the aggregate byte count.
    fn write_vectored(&self, bufs: &[ByteView<'_>]) -> Result<usize> {
        let iov = as_iovecs(bufs);
        let n = cvt(unsafe {
            libc::writev(self.as_raw_fd(), iov.as_ptr(), iov.len() as libc::c_int)
        })?;
        metrics::BYTES_WRITTEN.add(n as u64);
        Ok(n)
    }
}

/// A POSIX regular-file descriptor.
#[derive(Debug, Default)]
pub struct File {
    fd: Fd,
}

impl File {
    /// New instance with no descriptor attached.
    pub fn new() -> Self {
        File { fd: Fd::closed() }
    }

    /// Whether a descriptor is attached. Handle `0` counts as open.
    pub fn is_open(&self) -> bool {
        self.fd.is_open()
    }

    /// Open `path`. `mode` only matters when `flags` asks for creation.
    ///
    /// Fails with [`Error::AlreadyOpen`] while a descriptor is attached.
    pub fn open(&mut self, path: &str, flags: OpenFlags, mode: Mode) -> Result<()> {
        let path =
            CString::new(path).map_err(|_| Error::InvalidInput("path contains interior NUL"))?;
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let raw = cvt_i(unsafe {
            libc::open(path.as_ptr(), flags.0, mode.0 as libc::c_uint)
        })?;
        self.fd = Fd::adopt(raw);
        Ok(())
    }

    /// Positional read at `offset`. The implicit file cursor is left
    /// untouched.
    pub fn read_at(&self, buf: ByteViewMut<'_>, offset: u64) -> Result<usize> {
        if buf.as_ptr().is_null() {
            return Err(Error::InvalidInput("null buffer"));
        }
        let n = cvt(unsafe {
            libc::pread(
                self.fd.raw(),
                buf.as_mut_ptr().cast(),
                buf.len(),
                offset as libc::off_t,
            )
        })?;
        metrics::BYTES_READ.add(n as u64);
        Ok(n)
    }

    /// Positional write at `offset`. The implicit file cursor is left
    /// untouched.
    pub fn write_at(&self, buf: ByteView<'_>, offset: u64) -> Result<usize> {
        if buf.as_ptr().is_null() {
            return Err(Error::InvalidInput("null buffer"));
        }
        let n = cvt(unsafe {
            libc::pwrite(
                self.fd.raw(),
                buf.as_ptr().cast(),
                buf.len(),
                offset as libc::off_t,
            )
        })?;
        metrics::BYTES_WRITTEN.add(n as u64);
        Ok(n)
    }

    /// Positional scatter-read at `offset`.
    pub fn read_vectored_at(&self, bufs: &[ByteViewMut<'_>], offset: u64) -> Result<usize> {
        let iov = as_iovecs_mut(bufs);
        let n = cvt(unsafe {
            libc::preadv(
                self.fd.raw(),
                iov.as_ptr(),
                iov.len() as libc::c_int,
                offset as libc::off_t,
            )
        })?;
        metrics::BYTES_READ.add(n as u64);
        Ok(n)
    }

    /// Positional gather-write at `offset`.
    pub fn write_vectored_at(&self, bufs: &[ByteView<'_>], offset: u64) -> Result<usize> {
        let iov = as_iovecs(bufs);
        let n = cvt(unsafe {
            libc::pwritev(
                self.fd.raw(),
                iov.as_ptr(),
                iov.len() as libc::c_int,
                offset as libc::off_t,
            )
        })?;
        metrics::BYTES_WRITTEN.add(n as u64);
        Ok(n)
    }

    /// Device-specific control command, passed through untouched.
    /// Returns the command's non-negative result.
    ///
    /// # Safety
    ///
    /// `arg` must match what the driver expects for `command`.
    pub unsafe fn io_control(
        &self,
        command: libc::c_ulong,
        arg: *mut libc::c_void,
    ) -> Result<libc::c_int> {
        cvt_i(libc::ioctl(self.fd.raw(), command, arg))
    }

    /// Release the descriptor. Idempotent; close errors never reach the
    /// caller.
    pub fn close(&mut self) {
        self.fd.close();
    }

    /// Create a unidirectional pipe, placing the read end in `read_end`
    /// and the write end in `write_end`. Both endpoints are populated,
    /// or neither.
    ///
    /// Fails with [`Error::AlreadyOpen`] if either endpoint already
    /// holds a descriptor. `flags` accepts `CLOSE_ON_EXEC`, `DIRECT`,
    /// and `NON_BLOCK`.
    pub fn pipe(read_end: &mut File, write_end: &mut File, flags: OpenFlags) -> Result<()> {
        if read_end.is_open() || write_end.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let mut fds: [libc::c_int; 2] = [0; 2];
        cvt_i(unsafe { libc::pipe2(fds.as_mut_ptr(), flags.0) })?;
        read_end.fd = Fd::adopt(fds[0]);
        write_end.fd = Fd::adopt(fds[1]);
        Ok(())
    }
}

impl AsRawFd for File {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw()
    }
}

impl FromRawFd for File {
    /// Wrap an already-open descriptor. The new instance owns it and
    /// will close it on drop.
    unsafe fn from_raw_fd(raw: RawFd) -> Self {
        File { fd: Fd::adopt(raw) }
    }
}

impl Stream for File {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        assert!(!File::new().is_open());
    }

    #[test]
    fn default_mode_bits() {
        assert_eq!(Mode::DEFAULT.0, 0o644);
        assert_eq!(
            (Mode::USER_READ | Mode::USER_WRITE | Mode::GROUP_READ | Mode::OTHERS_READ).0,
            Mode::DEFAULT.0
        );
    }

    #[test]
    fn flags_compose() {
        let flags = OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE;
        assert_eq!(flags.0, libc::O_RDWR | libc::O_CREAT | libc::O_TRUNC);
    }

    #[test]
    fn open_rejects_interior_nul() {
        let mut file = File::new();
        assert!(matches!(
            file.open("bad\0path", OpenFlags::READ, Mode::DEFAULT),
            Err(Error::InvalidInput(_))
        ));
        assert!(!file.is_open());
    }
}
