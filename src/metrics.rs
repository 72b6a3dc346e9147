//! Crate metrics.
//!
//! Static metriken counters for traffic and readiness activity. The
//! embedding application decides whether and how to expose them; the
//! counters are always maintained.

use metriken::{metric, Counter};

#[metric(
    name = "lowline/bytes/read",
    description = "Total bytes read from descriptors"
)]
pub static BYTES_READ: Counter = Counter::new();

#[metric(
    name = "lowline/bytes/written",
    description = "Total bytes written to descriptors"
)]
pub static BYTES_WRITTEN: Counter = Counter::new();

#[metric(
    name = "lowline/bytes/sent",
    description = "Total bytes sent on sockets"
)]
pub static BYTES_SENT: Counter = Counter::new();

#[metric(
    name = "lowline/bytes/received",
    description = "Total bytes received on sockets"
)]
pub static BYTES_RECEIVED: Counter = Counter::new();

#[metric(
    name = "lowline/sockets/opened",
    description = "Total sockets created"
)]
pub static SOCKETS_OPENED: Counter = Counter::new();

#[metric(
    name = "lowline/connections/accepted",
    description = "Total connections accepted"
)]
pub static CONNECTIONS_ACCEPTED: Counter = Counter::new();

#[metric(
    name = "lowline/epoll/ready_events",
    description = "Ready events delivered by wait"
)]
pub static READY_EVENTS: Counter = Counter::new();
