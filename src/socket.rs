//! Domain-typed sockets.
//!
//! [`Socket<D>`] fixes its address domain at compile time through the
//! [`Domain`] marker, so bind/connect/accept/send_to/recv_from all
//! agree on one address representation and cross-domain mixups fail to
//! compile. A socket is a byte stream with connection semantics layered
//! on top: it implements [`Stream`] and adds the connection-oriented
//! and datagram operation sets.

use std::marker::PhantomData;
use std::os::fd::{AsRawFd, FromRawFd, RawFd};

use crate::addr::{Inet4Addr, Inet6Addr, SockAddr, UnixAddr};
use crate::buffer::{ByteView, ByteViewMut};
use crate::error::{cvt, cvt_i, Error, Result};
use crate::fd::Fd;
use crate::file::Stream;
use crate::metrics;

/// A socket communication domain, binding an address type at compile
/// time.
pub trait Domain {
    /// Kernel domain constant (`AF_*`).
    const RAW: libc::c_int;
    /// Native address representation for this domain.
    type Addr: SockAddr;
}

/// Unix (local) domain marker.
pub enum Unix {}

impl Domain for Unix {
    const RAW: libc::c_int = libc::AF_UNIX;
    type Addr = UnixAddr;
}

/// IPv4 domain marker.
pub enum Inet4 {}

impl Domain for Inet4 {
    const RAW: libc::c_int = libc::AF_INET;
    type Addr = Inet4Addr;
}

/// IPv6 domain marker.
pub enum Inet6 {}

impl Domain for Inet6 {
    const RAW: libc::c_int = libc::AF_INET6;
    type Addr = Inet6Addr;
}

/// Socket communication styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SocketType {
    Stream = libc::SOCK_STREAM,
    Datagram = libc::SOCK_DGRAM,
    SeqPacket = libc::SOCK_SEQPACKET,
}

/// Flags for send operations, OR-able.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendFlags(pub libc::c_int);

impl SendFlags {
    pub const NONE: Self = Self(0);
    pub const CONFIRM: Self = Self(libc::MSG_CONFIRM);
    pub const DONT_ROUTE: Self = Self(libc::MSG_DONTROUTE);
    pub const DONT_WAIT: Self = Self(libc::MSG_DONTWAIT);
    pub const END_OF_RECORD: Self = Self(libc::MSG_EOR);
    pub const MORE: Self = Self(libc::MSG_MORE);
    pub const NO_SIGNAL: Self = Self(libc::MSG_NOSIGNAL);
    pub const OUT_OF_BAND: Self = Self(libc::MSG_OOB);
}

impl std::ops::BitOr for SendFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Flags for receive operations, OR-able. Each flag carries its own
/// kernel bit value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecvFlags(pub libc::c_int);

impl RecvFlags {
    pub const NONE: Self = Self(0);
    pub const DONT_WAIT: Self = Self(libc::MSG_DONTWAIT);
    pub const ERROR_QUEUE: Self = Self(libc::MSG_ERRQUEUE);
    pub const OUT_OF_BAND: Self = Self(libc::MSG_OOB);
    pub const PEEK: Self = Self(libc::MSG_PEEK);
    pub const TRUNCATE: Self = Self(libc::MSG_TRUNC);
    pub const WAIT_ALL: Self = Self(libc::MSG_WAITALL);
}

impl std::ops::BitOr for RecvFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A descriptor-backed socket, typed by its address domain.
pub struct Socket<D: Domain> {
    fd: Fd,
    _domain: PhantomData<D>,
}

impl<D: Domain> Socket<D> {
    /// New instance with no descriptor attached.
    pub fn new() -> Self {
        Socket {
            fd: Fd::closed(),
            _domain: PhantomData,
        }
    }

    /// Whether a descriptor is attached. Handle `0` counts as open.
    pub fn is_open(&self) -> bool {
        self.fd.is_open()
    }

    /// Create the kernel socket.
    ///
    /// Fails with [`Error::AlreadyOpen`] while a descriptor is attached.
    pub fn open(&mut self, type_: SocketType) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let raw = cvt_i(unsafe { libc::socket(D::RAW, type_ as libc::c_int, 0) })?;
        self.fd = Fd::adopt(raw);
        metrics::SOCKETS_OPENED.increment();
        Ok(())
    }

    /// Bind to `local`. An address that never initialized (or failed
    /// to) is rejected before the syscall.
    pub fn bind(&self, local: &D::Addr) -> Result<()> {
        if !local.is_valid() {
            return Err(Error::InvalidInput("invalid bind address"));
        }
        cvt_i(unsafe { libc::bind(self.fd.raw(), local.as_sockaddr(), local.len()) })?;
        Ok(())
    }

    /// Turn the socket passive, with a pending-connection queue of
    /// `backlog`.
    pub fn listen(&self, backlog: i32) -> Result<()> {
        cvt_i(unsafe { libc::listen(self.fd.raw(), backlog) })?;
        Ok(())
    }

    /// Connect to `remote`. Exact semantics depend on the socket type.
    pub fn connect(&self, remote: &D::Addr) -> Result<()> {
        cvt_i(unsafe { libc::connect(self.fd.raw(), remote.as_sockaddr(), remote.len()) })?;
        Ok(())
    }

    /// Accept a pending connection into `client`.
    ///
    /// `client` must not hold an open descriptor; otherwise
    /// [`Error::AlreadyOpen`] is returned and `client` is untouched.
    /// When `peer` is supplied it is filled with the connection source
    /// and its logical length is updated from the kernel-reported size.
    pub fn accept_into(
        &self,
        client: &mut Socket<D>,
        peer: Option<&mut D::Addr>,
    ) -> Result<()> {
        if client.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let raw = match peer {
            Some(addr) => {
                let mut len: libc::socklen_t = D::Addr::MAX_LEN;
                let raw =
                    cvt_i(unsafe { libc::accept(self.fd.raw(), addr.as_sockaddr_mut(), &mut len) })?;
                addr.set_len(len);
                raw
            }
            None => cvt_i(unsafe {
                libc::accept(self.fd.raw(), std::ptr::null_mut(), std::ptr::null_mut())
            })?,
        };

        client.fd = Fd::adopt(raw);
        metrics::CONNECTIONS_ACCEPTED.increment();
        Ok(())
    }

    /// Accept a pending connection, returning it with its source
    /// address.
    pub fn accept(&self) -> Result<(Socket<D>, D::Addr)> {
        let mut client = Socket::new();
        let mut peer = D::Addr::default();
        self.accept_into(&mut client, Some(&mut peer))?;
        Ok((client, peer))
    }

    /// Send on a connected socket. Returns the number of bytes sent,
    /// which may be short.
    pub fn send(&self, buf: ByteView<'_>, flags: SendFlags) -> Result<usize> {
        if buf.as_ptr().is_null() {
            return Err(Error::InvalidInput("null buffer"));
        }
        let n = cvt(unsafe {
            libc::send(self.fd.raw(), buf.as_ptr().cast(), buf.len(), flags.0)
        })?;
        metrics::BYTES_SENT.add(n as u64);
        Ok(n)
    }

    /// Send to `dest`, with or without a prior connect.
    pub fn send_to(&self, buf: ByteView<'_>, dest: &D::Addr, flags: SendFlags) -> Result<usize> {
        if buf.as_ptr().is_null() {
            return Err(Error::InvalidInput("null buffer"));
        }
        let n = cvt(unsafe {
            libc::sendto(
                self.fd.raw(),
                buf.as_ptr().cast(),
                buf.len(),
                flags.0,
                dest.as_sockaddr(),
                dest.len(),
            )
        })?;
        metrics::BYTES_SENT.add(n as u64);
        Ok(n)
    }

    /// Receive into `buf`. Returns the number of bytes received.
    pub fn recv(&self, buf: ByteViewMut<'_>, flags: RecvFlags) -> Result<usize> {
        if buf.as_ptr().is_null() {
            return Err(Error::InvalidInput("null buffer"));
        }
        let n = cvt(unsafe {
            libc::recv(self.fd.raw(), buf.as_mut_ptr().cast(), buf.len(), flags.0)
        })?;
        metrics::BYTES_RECEIVED.add(n as u64);
        Ok(n)
    }

    /// Receive into `buf` and report the sender's address in `sender`,
    /// updating its logical length from the kernel-reported size.
    pub fn recv_from(
        &self,
        buf: ByteViewMut<'_>,
        sender: &mut D::Addr,
        flags: RecvFlags,
    ) -> Result<usize> {
        if buf.as_ptr().is_null() {
            return Err(Error::InvalidInput("null buffer"));
        }

        let mut len: libc::socklen_t = D::Addr::MAX_LEN;
        let n = cvt(unsafe {
            libc::recvfrom(
                self.fd.raw(),
                buf.as_mut_ptr().cast(),
                buf.len(),
                flags.0,
                sender.as_sockaddr_mut(),
                &mut len,
            )
        })?;
        sender.set_len(len);
        metrics::BYTES_RECEIVED.add(n as u64);
        Ok(n)
    }

    /// Best-effort bidirectional shutdown, then close. A shutdown
    /// failure is not propagated; the close always proceeds.
    pub fn shutdown(&mut self) {
        if self.fd.is_open() {
            unsafe { libc::shutdown(self.fd.raw(), libc::SHUT_RDWR) };
        }
        self.fd.close();
    }

    /// Release the descriptor without the shutdown handshake.
    /// Idempotent.
    pub fn close(&mut self) {
        self.fd.close();
    }
}

impl Socket<Unix> {
    /// Create a connected pair, populating `a` and `b` atomically:
    /// both become open, or neither does.
    ///
    /// Fails with [`Error::AlreadyOpen`] if either output already holds
    /// a descriptor.
    pub fn pair(type_: SocketType, a: &mut Socket<Unix>, b: &mut Socket<Unix>) -> Result<()> {
        if a.is_open() || b.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let mut fds: [libc::c_int; 2] = [0; 2];
        cvt_i(unsafe {
            libc::socketpair(libc::AF_UNIX, type_ as libc::c_int, 0, fds.as_mut_ptr())
        })?;
        a.fd = Fd::adopt(fds[0]);
        b.fd = Fd::adopt(fds[1]);
        metrics::SOCKETS_OPENED.add(2);
        Ok(())
    }
}

impl<D: Domain> Default for Socket<D> {
    fn default() -> Self {
        Socket::new()
    }
}

impl<D: Domain> Drop for Socket<D> {
    fn drop(&mut self) {
        // Orderly teardown even when the socket just falls out of scope;
        // the descriptor itself closes with the Fd.
        if self.fd.is_open() {
            unsafe { libc::shutdown(self.fd.raw(), libc::SHUT_RDWR) };
        }
    }
}

impl<D: Domain> std::fmt::Debug for Socket<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket").field("fd", &self.fd).finish()
    }
}

impl<D: Domain> AsRawFd for Socket<D> {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw()
    }
}

impl<D: Domain> FromRawFd for Socket<D> {
    /// Wrap an already-open socket descriptor. The new instance owns it
    /// and will shut it down and close it on drop.
    unsafe fn from_raw_fd(raw: RawFd) -> Self {
        Socket {
            fd: Fd::adopt(raw),
            _domain: PhantomData,
        }
    }
}

impl<D: Domain> Stream for Socket<D> {}
