//! lowline — typed synchronous I/O over POSIX descriptors.
//!
//! lowline wraps the descriptor-based Linux I/O surface — regular
//! files, Unix/IPv4/IPv6 sockets, eventfd counters, timerfd timers, and
//! epoll readiness multiplexing — in small owning types with a uniform
//! contract: operations either succeed with a byte count (possibly
//! short), or fail with a typed [`Error`] that preserves the raw OS
//! code. Buffers travel as zero-copy [`ByteView`]s that reinterpret
//! in place as the kernel's scatter/gather format.
//!
//! # Quick Start
//!
//! ```rust
//! use lowline::{ByteView, ByteViewMut, File, OpenFlags, Stream};
//!
//! fn main() -> Result<(), lowline::Error> {
//!     let mut read_end = File::new();
//!     let mut write_end = File::new();
//!     File::pipe(&mut read_end, &mut write_end, OpenFlags::NONE)?;
//!
//!     let payload = [0u8, 1, 2, 3, 4, 5, 6, 7];
//!     write_end.write(ByteView::new(&payload))?;
//!
//!     let mut storage = [0u8; 8];
//!     let n = read_end.read(ByteViewMut::new(&mut storage))?;
//!     assert_eq!(&storage[..n], &payload);
//!     Ok(())
//! }
//! ```
//!
//! # Contract
//!
//! - Short transfers are results, not errors: callers loop if they need
//!   full completion. `Ok(0)` from a read means end-of-stream.
//! - Nothing is retried internally, `EINTR` included.
//! - Every object owns at most one descriptor, releases it when
//!   dropped, and treats handle `0` as open.
//! - All calls are synchronous on the calling thread; non-blocking
//!   behavior comes from open flags plus [`Epoll`].
//!
//! # Platform
//!
//! Linux only: eventfd, timerfd, and epoll have no portable
//! counterpart here.

pub mod addr;
pub mod buffer;
pub mod epoll;
pub mod error;
pub mod event;
pub mod fd;
pub mod file;
pub mod metrics;
pub mod socket;
pub mod timer;

// ── Re-exports: buffers ────────────────────────────────────────────────

/// Adapter for types describable as an immutable byte view.
pub use buffer::AsByteView;
/// Adapter for types describable as a mutable byte view.
pub use buffer::AsByteViewMut;
/// Immutable zero-copy view over caller-owned bytes.
pub use buffer::ByteView;
/// Mutable zero-copy view over caller-owned bytes.
pub use buffer::ByteViewMut;
/// Marker for types whose bytes may be viewed directly.
pub use buffer::Pod;
/// Reinterpret views as a kernel scatter/gather array.
pub use buffer::{as_iovecs, as_iovecs_mut};

// ── Re-exports: descriptors and errors ─────────────────────────────────

/// Raw OS error code.
pub use error::Errno;
/// Errors returned by descriptor operations.
pub use error::Error;
/// Crate-wide result alias.
pub use error::Result;
/// Owned kernel descriptor handle.
pub use fd::Fd;

// ── Re-exports: addresses ──────────────────────────────────────────────

/// IPv4 socket address.
pub use addr::Inet4Addr;
/// IPv6 socket address.
pub use addr::Inet6Addr;
/// Kernel-native socket address encoding.
pub use addr::SockAddr;
/// Unix-domain socket address (path or abstract name).
pub use addr::UnixAddr;

// ── Re-exports: files and sockets ──────────────────────────────────────

/// POSIX regular-file descriptor.
pub use file::File;
/// File permission bits.
pub use file::Mode;
/// `open(2)` flag set.
pub use file::OpenFlags;
/// Byte-stream operations over an open descriptor.
pub use file::Stream;
/// Socket communication domain marker.
pub use socket::Domain;
/// IPv4 domain marker.
pub use socket::Inet4;
/// IPv6 domain marker.
pub use socket::Inet6;
/// Receive flag set.
pub use socket::RecvFlags;
/// Send flag set.
pub use socket::SendFlags;
/// Domain-typed socket.
pub use socket::Socket;
/// Socket communication styles.
pub use socket::SocketType;
/// Unix domain marker.
pub use socket::Unix;

// ── Re-exports: events, timers, readiness ──────────────────────────────

/// Readiness registry over pollable objects.
pub use epoll::Epoll;
/// Counter-backed notification descriptor.
pub use event::Event;
/// eventfd open flags.
pub use event::EventFlags;
/// Timer clock selection.
pub use timer::Clock;
/// Timer tick units.
pub use timer::Resolution;
/// Expiration-counting kernel timer.
pub use timer::Timer;
/// timerfd open flags.
pub use timer::TimerFlags;
