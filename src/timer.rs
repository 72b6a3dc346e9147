//! Expiration-counting timers (timerfd).

use std::os::fd::{AsRawFd, FromRawFd, RawFd};

use crate::error::{cvt, cvt_i, Errno, Error, Result};
use crate::fd::Fd;

/// Tick units for arming and querying timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum Resolution {
    Seconds = 1,
    Millis = 1_000,
    Micros = 1_000_000,
    Nanos = 1_000_000_000,
}

/// The clock a timer measures against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Clock {
    Realtime = libc::CLOCK_REALTIME,
    Monotonic = libc::CLOCK_MONOTONIC,
}

/// Timer open flags, OR-able.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerFlags(pub libc::c_int);

impl TimerFlags {
    pub const NONE: Self = Self(0);
    pub const NON_BLOCK: Self = Self(libc::TFD_NONBLOCK);
    pub const CLOSE_ON_EXEC: Self = Self(libc::TFD_CLOEXEC);
}

impl std::ops::BitOr for TimerFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

fn timespec_from(ticks: u64, res: Resolution) -> libc::timespec {
    let unit = res as u64;
    let nanos_per_tick = Resolution::Nanos as u64 / unit;
    libc::timespec {
        tv_sec: (ticks / unit) as libc::time_t,
        tv_nsec: ((ticks % unit) * nanos_per_tick) as libc::c_long,
    }
}

fn ticks_from(spec: libc::timespec, res: Resolution) -> u64 {
    let unit = res as u64;
    spec.tv_sec as u64 * unit + (spec.tv_nsec as u64 * unit) / Resolution::Nanos as u64
}

/// A kernel timer whose expirations are read through its descriptor,
/// and which a readiness registry can watch.
#[derive(Debug, Default)]
pub struct Timer {
    fd: Fd,
}

impl Timer {
    /// New instance with no descriptor attached.
    pub fn new() -> Self {
        Timer { fd: Fd::closed() }
    }

    /// Whether a descriptor is attached.
    pub fn is_open(&self) -> bool {
        self.fd.is_open()
    }

    /// Create the kernel timer against `clock`.
    ///
    /// Fails with [`Error::AlreadyOpen`] while a descriptor is attached.
    pub fn init(&mut self, clock: Clock, flags: TimerFlags) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let raw = cvt_i(unsafe { libc::timerfd_create(clock as libc::c_int, flags.0) })?;
        self.fd = Fd::adopt(raw);
        Ok(())
    }

    /// Arm with `first` ticks until the first expiration and `interval`
    /// ticks between subsequent ones, both in `res` units.
    ///
    /// `first == 0` disarms the timer. `interval == 0` makes it expire
    /// once; it can always be re-armed. Nanosecond accuracy depends on
    /// the underlying clock.
    pub fn arm(&self, first: u64, interval: u64, res: Resolution) -> Result<()> {
        let spec = libc::itimerspec {
            it_value: timespec_from(first, res),
            it_interval: timespec_from(interval, res),
        };
        cvt_i(unsafe { libc::timerfd_settime(self.fd.raw(), 0, &spec, std::ptr::null_mut()) })?;
        Ok(())
    }

    /// Stop the timer.
    pub fn disarm(&self) -> Result<()> {
        self.arm(0, 0, Resolution::Millis)
    }

    /// Approximate time left until the next expiration, in `res` units.
    pub fn next_expiration(&self, res: Resolution) -> Result<u64> {
        let mut spec: libc::itimerspec = unsafe { std::mem::zeroed() };
        cvt_i(unsafe { libc::timerfd_gettime(self.fd.raw(), &mut spec) })?;
        Ok(ticks_from(spec.it_value, res))
    }

    /// Number of expirations since the last successful read, or since
    /// arming. Blocks until the first expiration unless the timer was
    /// opened non-blocking.
    pub fn read_expirations(&self) -> Result<u64> {
        let mut count: u64 = 0;
        let n = cvt(unsafe {
            libc::read(
                self.fd.raw(),
                (&mut count as *mut u64).cast(),
                std::mem::size_of::<u64>(),
            )
        })?;
        if n != std::mem::size_of::<u64>() {
            return Err(Errno(libc::EIO).into());
        }
        Ok(count)
    }

    /// Discard any accumulated expirations.
    pub fn clear(&self) -> Result<()> {
        self.read_expirations().map(|_| ())
    }

    /// Release the descriptor. Idempotent.
    pub fn close(&mut self) {
        self.fd.close();
    }
}

impl AsRawFd for Timer {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw()
    }
}

impl FromRawFd for Timer {
    /// Wrap an already-open timerfd descriptor. No validation of the
    /// descriptor's kind is performed.
    unsafe fn from_raw_fd(raw: RawFd) -> Self {
        Timer { fd: Fd::adopt(raw) }
    }
}
