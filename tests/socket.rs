//! Integration tests: domain-typed sockets over Unix and IP transports.

use std::path::PathBuf;

use lowline::{
    ByteView, ByteViewMut, Error, Inet4, Inet4Addr, Inet6, Inet6Addr, RecvFlags, SendFlags,
    SockAddr, Socket, SocketType, Stream, Unix, UnixAddr,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Per-process socket path, removed before use.
fn socket_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("lowline_{}_{name}", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn unix_addr(path: &PathBuf) -> UnixAddr {
    UnixAddr::new(path.to_str().unwrap()).unwrap()
}

/// Per-process port, distinct per `slot`, away from the ephemeral range.
fn test_port(slot: u16) -> u16 {
    20000 + (std::process::id() % 10000) as u16 + slot
}

// ── Open-state machine ──────────────────────────────────────────────

#[test]
fn open_twice_is_busy() {
    let mut sock = Socket::<Unix>::new();
    assert!(!sock.is_open());

    sock.open(SocketType::Datagram).unwrap();
    let err = sock.open(SocketType::Datagram).unwrap_err();
    assert!(matches!(err, Error::AlreadyOpen));
    assert_eq!(err.raw_code(), -libc::EBUSY);

    sock.close();
    sock.open(SocketType::SeqPacket).unwrap();
}

// ── Unix datagram ───────────────────────────────────────────────────

#[test]
fn datagram_payload_round_trip() {
    let path = socket_path("test.sock");
    let mut sender = Socket::<Unix>::new();
    let mut receiver = Socket::<Unix>::new();

    sender.open(SocketType::Datagram).unwrap();
    receiver.open(SocketType::Datagram).unwrap();

    receiver.bind(&unix_addr(&path)).unwrap();
    sender.connect(&unix_addr(&path)).unwrap();

    let payload = [0u8, 1, 2, 3, 4, 5, 6, 7];
    assert_eq!(
        sender
            .send(ByteView::new(&payload[..]), SendFlags::NONE)
            .unwrap(),
        8
    );

    let mut storage = [0u8; 8];
    assert_eq!(
        receiver
            .recv(ByteViewMut::new(&mut storage), RecvFlags::NONE)
            .unwrap(),
        8
    );
    assert_eq!(storage, payload);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn connect_to_missing_bind_point_fails() {
    let path = socket_path("nobody_home.sock");
    let mut sender = Socket::<Unix>::new();
    sender.open(SocketType::Datagram).unwrap();

    let err = sender.connect(&unix_addr(&path)).unwrap_err();
    assert_eq!(err.os_error(), Some(libc::ENOENT));
}

#[test]
fn sender_address_travels_with_the_datagram() {
    let recv_path = socket_path("addressed_recv.sock");
    let send_path = socket_path("addressed_send.sock");

    let mut sender = Socket::<Unix>::new();
    let mut receiver = Socket::<Unix>::new();
    sender.open(SocketType::Datagram).unwrap();
    receiver.open(SocketType::Datagram).unwrap();

    receiver.bind(&unix_addr(&recv_path)).unwrap();
    sender.bind(&unix_addr(&send_path)).unwrap();

    let payload = [0u8, 1, 2, 3, 4, 5, 6, 7];
    assert_eq!(
        sender
            .send_to(
                ByteView::new(&payload[..]),
                &unix_addr(&recv_path),
                SendFlags::NONE
            )
            .unwrap(),
        8
    );

    let mut storage = [0u8; 8];
    let mut from = UnixAddr::default();
    assert_eq!(
        receiver
            .recv_from(ByteViewMut::new(&mut storage), &mut from, RecvFlags::NONE)
            .unwrap(),
        8
    );
    assert_eq!(storage, payload);
    assert!(from.is_valid());
    assert_eq!(from.path(), send_path.to_str());

    let _ = std::fs::remove_file(&recv_path);
    let _ = std::fs::remove_file(&send_path);
}

// ── Accept ──────────────────────────────────────────────────────────

#[test]
fn seqpacket_accept() {
    let path = socket_path("seqpacket.sock");
    let mut server = Socket::<Unix>::new();
    let mut remote = Socket::<Unix>::new();

    server.open(SocketType::SeqPacket).unwrap();
    remote.open(SocketType::SeqPacket).unwrap();

    server.bind(&unix_addr(&path)).unwrap();
    server.listen(1).unwrap();
    remote.connect(&unix_addr(&path)).unwrap();

    let mut client = Socket::<Unix>::new();
    server.accept_into(&mut client, None).unwrap();
    assert!(client.is_open());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn accept_into_open_target_is_busy_and_leaves_it_alone() {
    use std::os::fd::AsRawFd;

    let path = socket_path("busy_accept.sock");
    let mut server = Socket::<Unix>::new();
    let mut remote = Socket::<Unix>::new();

    server.open(SocketType::Stream).unwrap();
    remote.open(SocketType::Stream).unwrap();

    server.bind(&unix_addr(&path)).unwrap();
    server.listen(1).unwrap();
    remote.connect(&unix_addr(&path)).unwrap();

    let mut target = Socket::<Unix>::new();
    target.open(SocketType::Datagram).unwrap();
    let original_fd = target.as_raw_fd();

    assert!(matches!(
        server.accept_into(&mut target, None),
        Err(Error::AlreadyOpen)
    ));
    assert!(target.is_open());
    assert_eq!(target.as_raw_fd(), original_fd);

    // The pending connection is still there for a proper accept.
    let (client, peer) = server.accept().unwrap();
    assert!(client.is_open());
    // An unbound Unix peer reports the unnamed address: family only.
    assert!(peer.is_valid());
    assert_eq!(peer.len(), UnixAddr::BASE_LEN);

    let _ = std::fs::remove_file(&path);
}

// ── Connected pairs and shutdown ────────────────────────────────────

#[test]
fn pair_is_connected_both_ways() {
    let mut a = Socket::<Unix>::new();
    let mut b = Socket::<Unix>::new();
    Socket::pair(SocketType::Stream, &mut a, &mut b).unwrap();
    assert!(a.is_open());
    assert!(b.is_open());

    a.send(ByteView::new(&b"ping"[..]), SendFlags::NONE).unwrap();
    let mut storage = [0u8; 4];
    b.recv(ByteViewMut::new(&mut storage), RecvFlags::NONE)
        .unwrap();
    assert_eq!(&storage, b"ping");

    b.send(ByteView::new(&b"pong"[..]), SendFlags::NONE).unwrap();
    a.recv(ByteViewMut::new(&mut storage), RecvFlags::NONE)
        .unwrap();
    assert_eq!(&storage, b"pong");
}

#[test]
fn pair_into_open_socket_is_busy() {
    let mut a = Socket::<Unix>::new();
    let mut b = Socket::<Unix>::new();
    a.open(SocketType::Datagram).unwrap();

    assert!(matches!(
        Socket::pair(SocketType::Stream, &mut a, &mut b),
        Err(Error::AlreadyOpen)
    ));
    assert!(!b.is_open());
}

#[test]
fn shutdown_wakes_the_peer_with_end_of_stream() {
    let mut a = Socket::<Unix>::new();
    let mut b = Socket::<Unix>::new();
    Socket::pair(SocketType::Stream, &mut a, &mut b).unwrap();

    a.shutdown();
    assert!(!a.is_open());

    let mut storage = [0u8; 8];
    assert_eq!(
        b.recv(ByteViewMut::new(&mut storage), RecvFlags::NONE)
            .unwrap(),
        0
    );
}

#[test]
fn sockets_are_streams() {
    let mut a = Socket::<Unix>::new();
    let mut b = Socket::<Unix>::new();
    Socket::pair(SocketType::Stream, &mut a, &mut b).unwrap();

    a.write(ByteView::new(&b"via stream"[..])).unwrap();
    let mut storage = [0u8; 10];
    assert_eq!(b.read(ByteViewMut::new(&mut storage)).unwrap(), 10);
    assert_eq!(&storage, b"via stream");
}

// ── IP domains ──────────────────────────────────────────────────────

#[test]
fn ipv4_datagram_round_trip() {
    let port = test_port(0);
    let mut sender = Socket::<Inet4>::new();
    let mut receiver = Socket::<Inet4>::new();

    sender.open(SocketType::Datagram).unwrap();
    receiver.open(SocketType::Datagram).unwrap();

    let local = Inet4Addr::new("127.0.0.1", port).unwrap();
    receiver.bind(&local).unwrap();

    let payload = [42u8; 32];
    assert_eq!(
        sender
            .send_to(ByteView::new(&payload[..]), &local, SendFlags::NONE)
            .unwrap(),
        32
    );

    let mut storage = [0u8; 32];
    let mut from = Inet4Addr::default();
    assert_eq!(
        receiver
            .recv_from(ByteViewMut::new(&mut storage), &mut from, RecvFlags::NONE)
            .unwrap(),
        32
    );
    assert_eq!(storage, payload);
    assert!(from.is_valid());
    assert_eq!(from.to_std().unwrap().ip().octets(), [127, 0, 0, 1]);
}

#[test]
fn ipv6_datagram_round_trip() {
    let port = test_port(1);
    let mut sender = Socket::<Inet6>::new();
    let mut receiver = Socket::<Inet6>::new();

    sender.open(SocketType::Datagram).unwrap();
    receiver.open(SocketType::Datagram).unwrap();

    let local = Inet6Addr::new("::1", port).unwrap();
    if receiver.bind(&local).is_err() {
        // No IPv6 loopback in this environment.
        return;
    }

    let payload = [7u8; 16];
    assert_eq!(
        sender
            .send_to(ByteView::new(&payload[..]), &local, SendFlags::NONE)
            .unwrap(),
        16
    );

    let mut storage = [0u8; 16];
    assert_eq!(
        receiver
            .recv(ByteViewMut::new(&mut storage), RecvFlags::NONE)
            .unwrap(),
        16
    );
    assert_eq!(storage, payload);
}

#[test]
fn null_buffers_are_rejected() {
    let mut a = Socket::<Unix>::new();
    let mut b = Socket::<Unix>::new();
    Socket::pair(SocketType::Datagram, &mut a, &mut b).unwrap();

    let null_view = unsafe { ByteView::from_raw(std::ptr::null(), 4) };
    assert!(matches!(
        a.send(null_view, SendFlags::NONE),
        Err(Error::InvalidInput(_))
    ));

    let null_view = unsafe { ByteViewMut::from_raw(std::ptr::null_mut(), 4) };
    assert!(matches!(
        b.recv(null_view, RecvFlags::DONT_WAIT),
        Err(Error::InvalidInput(_))
    ));
}
