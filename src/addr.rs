//! Socket endpoint addresses, one representation per domain.
//!
//! Each address type wraps the kernel's native record for its domain and
//! exposes the raw pointer/length pair that bind/connect/accept expect.
//! A default-constructed address is *invalid*: its family field holds
//! the bitwise inverse of the domain's family constant until a
//! constructor or a kernel fill-in puts a real record there. This is the
//! state handed to `accept`/`recv_from` as an out-parameter.
//!
//! Unix-domain records are variable-length. Abstract names (leading NUL,
//! not NUL-terminated) are shorter than the full record, so the logical
//! length travels with the address and [`SockAddr::set_len`] clamps
//! kernel-reported values into `[BASE_LEN, MAX_LEN]`. The IP domains are
//! fixed-size and ignore length updates.

use std::mem::{offset_of, size_of};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};

use crate::error::{Error, Result};

/// A socket address in the kernel's native encoding.
pub trait SockAddr: Default {
    /// Size of the full native record; upper bound for kernel-reported
    /// lengths.
    const MAX_LEN: libc::socklen_t;

    /// Base pointer of the native record, for passing to syscalls.
    fn as_sockaddr(&self) -> *const libc::sockaddr;

    /// Mutable base pointer, for kernel-filled out-parameters.
    fn as_sockaddr_mut(&mut self) -> *mut libc::sockaddr;

    /// Length of the significant part of the record.
    fn len(&self) -> libc::socklen_t;

    /// Record a kernel-reported length. Fixed-size domains ignore it.
    fn set_len(&mut self, len: libc::socklen_t);

    /// Whether the record carries the domain's own family tag.
    fn is_valid(&self) -> bool;
}

/// Bytes available for the path portion of a Unix record.
const SUN_PATH_LEN: usize =
    size_of::<libc::sockaddr_un>() - offset_of!(libc::sockaddr_un, sun_path);

/// A Unix-domain (local) socket address: filesystem path or abstract
/// name.
pub struct UnixAddr {
    len: libc::socklen_t,
    raw: libc::sockaddr_un,
}

impl UnixAddr {
    /// Shortest valid record: the family field with an empty path.
    pub const BASE_LEN: libc::socklen_t =
        offset_of!(libc::sockaddr_un, sun_path) as libc::socklen_t;

    /// Maximum path length, in bytes.
    pub const MAX_PATH_LEN: usize = SUN_PATH_LEN;

    /// Address for a filesystem path.
    pub fn new(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidInput("empty socket path"));
        }
        Self::from_path_bytes(path.as_bytes())
    }

    /// Address from raw path bytes. A leading NUL names an abstract
    /// address; the name is not NUL-terminated in that case.
    pub fn from_path_bytes(path: &[u8]) -> Result<Self> {
        if path.len() >= SUN_PATH_LEN {
            return Err(Error::InvalidInput("socket path too long"));
        }

        let mut addr = UnixAddr::default();
        for (dst, src) in addr.raw.sun_path.iter_mut().zip(path) {
            *dst = *src as libc::c_char;
        }
        addr.raw.sun_family = libc::AF_UNIX as libc::sa_family_t;
        addr.len = Self::BASE_LEN + path.len() as libc::socklen_t;
        Ok(addr)
    }

    /// The path bytes covered by the recorded length. Abstract names
    /// come back with their leading NUL.
    pub fn path_bytes(&self) -> &[u8] {
        let len = (self.len.saturating_sub(Self::BASE_LEN) as usize).min(SUN_PATH_LEN);
        // Safety: sun_path is in-bounds for SUN_PATH_LEN bytes and
        // c_char bytes reinterpret as u8.
        unsafe { std::slice::from_raw_parts(self.raw.sun_path.as_ptr().cast(), len) }
    }

    /// The filesystem path as a string, up to the first NUL. `None` for
    /// abstract names and non-UTF-8 paths. Kernel-reported lengths
    /// include the terminating NUL for pathname addresses; this strips
    /// it.
    pub fn path(&self) -> Option<&str> {
        let bytes = self.path_bytes();
        if bytes.first() == Some(&0) {
            return None;
        }
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        std::str::from_utf8(&bytes[..end]).ok()
    }
}

impl Default for UnixAddr {
    fn default() -> Self {
        let mut raw: libc::sockaddr_un = unsafe { std::mem::zeroed() };
        raw.sun_family = !(libc::AF_UNIX as libc::sa_family_t);
        UnixAddr { len: 0, raw }
    }
}

impl SockAddr for UnixAddr {
    const MAX_LEN: libc::socklen_t = size_of::<libc::sockaddr_un>() as libc::socklen_t;

    fn as_sockaddr(&self) -> *const libc::sockaddr {
        (&self.raw as *const libc::sockaddr_un).cast()
    }

    fn as_sockaddr_mut(&mut self) -> *mut libc::sockaddr {
        (&mut self.raw as *mut libc::sockaddr_un).cast()
    }

    fn len(&self) -> libc::socklen_t {
        self.len
    }

    fn set_len(&mut self, len: libc::socklen_t) {
        // Saturating, not failing: abstract names are legitimately
        // shorter than the full record.
        self.len = len.clamp(Self::BASE_LEN, Self::MAX_LEN);
    }

    fn is_valid(&self) -> bool {
        self.raw.sun_family == libc::AF_UNIX as libc::sa_family_t
    }
}

/// An IPv4 socket address.
pub struct Inet4Addr {
    raw: libc::sockaddr_in,
}

impl Inet4Addr {
    /// Address from a dotted-quad string and a host-order port.
    pub fn new(addr: &str, port: u16) -> Result<Self> {
        let ip: Ipv4Addr = addr
            .parse()
            .map_err(|_| Error::InvalidInput("unparseable IPv4 address"))?;
        Ok(Self::from_std(SocketAddrV4::new(ip, port)))
    }

    pub fn from_std(addr: SocketAddrV4) -> Self {
        let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        raw.sin_family = libc::AF_INET as libc::sa_family_t;
        raw.sin_port = addr.port().to_be();
        raw.sin_addr = libc::in_addr {
            s_addr: u32::from(*addr.ip()).to_be(),
        };
        Inet4Addr { raw }
    }

    /// Decode to the std representation; `None` while invalid.
    pub fn to_std(&self) -> Option<SocketAddrV4> {
        self.is_valid().then(|| {
            SocketAddrV4::new(
                Ipv4Addr::from(u32::from_be(self.raw.sin_addr.s_addr)),
                u16::from_be(self.raw.sin_port),
            )
        })
    }

    /// The port in host order.
    pub fn port(&self) -> u16 {
        u16::from_be(self.raw.sin_port)
    }
}

impl Default for Inet4Addr {
    fn default() -> Self {
        let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        raw.sin_family = !(libc::AF_INET as libc::sa_family_t);
        Inet4Addr { raw }
    }
}

impl From<SocketAddrV4> for Inet4Addr {
    fn from(addr: SocketAddrV4) -> Self {
        Self::from_std(addr)
    }
}

impl SockAddr for Inet4Addr {
    const MAX_LEN: libc::socklen_t = size_of::<libc::sockaddr_in>() as libc::socklen_t;

    fn as_sockaddr(&self) -> *const libc::sockaddr {
        (&self.raw as *const libc::sockaddr_in).cast()
    }

    fn as_sockaddr_mut(&mut self) -> *mut libc::sockaddr {
        (&mut self.raw as *mut libc::sockaddr_in).cast()
    }

    fn len(&self) -> libc::socklen_t {
        Self::MAX_LEN
    }

    fn set_len(&mut self, _len: libc::socklen_t) {
        // Fixed-size record.
    }

    fn is_valid(&self) -> bool {
        self.raw.sin_family == libc::AF_INET as libc::sa_family_t
    }
}

/// An IPv6 socket address.
pub struct Inet6Addr {
    raw: libc::sockaddr_in6,
}

impl Inet6Addr {
    /// Address from a textual IPv6 address and a host-order port.
    pub fn new(addr: &str, port: u16) -> Result<Self> {
        let ip: Ipv6Addr = addr
            .parse()
            .map_err(|_| Error::InvalidInput("unparseable IPv6 address"))?;
        Ok(Self::from_std(SocketAddrV6::new(ip, port, 0, 0)))
    }

    pub fn from_std(addr: SocketAddrV6) -> Self {
        let mut raw: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
        raw.sin6_family = libc::AF_INET6 as libc::sa_family_t;
        raw.sin6_port = addr.port().to_be();
        raw.sin6_flowinfo = addr.flowinfo();
        raw.sin6_addr = libc::in6_addr {
            s6_addr: addr.ip().octets(),
        };
        raw.sin6_scope_id = addr.scope_id();
        Inet6Addr { raw }
    }

    /// Decode to the std representation; `None` while invalid.
    pub fn to_std(&self) -> Option<SocketAddrV6> {
        self.is_valid().then(|| {
            SocketAddrV6::new(
                Ipv6Addr::from(self.raw.sin6_addr.s6_addr),
                u16::from_be(self.raw.sin6_port),
                self.raw.sin6_flowinfo,
                self.raw.sin6_scope_id,
            )
        })
    }

    /// The port in host order.
    pub fn port(&self) -> u16 {
        u16::from_be(self.raw.sin6_port)
    }
}

impl Default for Inet6Addr {
    fn default() -> Self {
        let mut raw: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
        raw.sin6_family = !(libc::AF_INET6 as libc::sa_family_t);
        Inet6Addr { raw }
    }
}

impl From<SocketAddrV6> for Inet6Addr {
    fn from(addr: SocketAddrV6) -> Self {
        Self::from_std(addr)
    }
}

impl SockAddr for Inet6Addr {
    const MAX_LEN: libc::socklen_t = size_of::<libc::sockaddr_in6>() as libc::socklen_t;

    fn as_sockaddr(&self) -> *const libc::sockaddr {
        (&self.raw as *const libc::sockaddr_in6).cast()
    }

    fn as_sockaddr_mut(&mut self) -> *mut libc::sockaddr {
        (&mut self.raw as *mut libc::sockaddr_in6).cast()
    }

    fn len(&self) -> libc::socklen_t {
        Self::MAX_LEN
    }

    fn set_len(&mut self, _len: libc::socklen_t) {
        // Fixed-size record.
    }

    fn is_valid(&self) -> bool {
        self.raw.sin6_family == libc::AF_INET6 as libc::sa_family_t
    }
}
