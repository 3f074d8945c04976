#![cfg(target_os = "linux")]

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};
use tickloop::socket::{Event, Interest, PollSockets};
use tickloop::{DefaultLoop, ReadinessSource, WakeReason};

fn deadline(ms: u64) -> Option<Instant> {
    Some(Instant::now() + Duration::from_millis(ms))
}

#[test]
fn test_readable_socket_runs_handler() {
    let mut sockets = PollSockets::new().unwrap();
    sockets.initialize().unwrap();
    let (mut writer, reader) = UnixStream::pair().unwrap();

    let (sender, receiver) = mpsc::channel();
    let token = sockets
        .handle()
        .register(&reader, Interest::READABLE, move |event: Event| {
            let _ = sender.send(event);
        });

    writer.write_all(b"ping").unwrap();

    // The registration wakes the poller, so the first wait may only apply it.
    let mut reason = sockets.wait(deadline(500)).unwrap();
    if reason == WakeReason::Woken {
        reason = sockets.wait(deadline(500)).unwrap();
    }

    assert_eq!(reason, WakeReason::Ready(1));

    let event = receiver.try_recv().unwrap();
    assert_eq!(event.token, token);
    assert!(event.readable);
    assert!(!event.writable);
}

#[test]
fn test_idle_socket_times_out() {
    let mut sockets = PollSockets::new().unwrap();
    sockets.initialize().unwrap();
    let (_writer, reader) = UnixStream::pair().unwrap();

    sockets
        .handle()
        .register(&reader, Interest::READABLE, |_| panic!("nothing to read"));

    // Consume the wake sent by the registration.
    assert_eq!(sockets.wait(deadline(10)).unwrap(), WakeReason::Woken);

    let start = Instant::now();
    assert_eq!(sockets.wait(deadline(30)).unwrap(), WakeReason::Timeout);
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(sockets.registered(), 1);
}

#[test]
fn test_deregistered_socket_is_not_dispatched() {
    let mut sockets = PollSockets::new().unwrap();
    sockets.initialize().unwrap();
    let (mut writer, reader) = UnixStream::pair().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handle = sockets.handle();
    let token = handle.register(&reader, Interest::READABLE, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    sockets.wait(deadline(10)).unwrap();
    assert_eq!(sockets.registered(), 1);

    handle.deregister(token);
    writer.write_all(b"ping").unwrap();

    sockets.wait(deadline(10)).unwrap();
    assert_eq!(sockets.registered(), 0);
    assert_eq!(sockets.wait(deadline(10)).unwrap(), WakeReason::Timeout);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_panicking_handler_drops_registration() {
    let mut sockets = PollSockets::new().unwrap();
    sockets.initialize().unwrap();
    let (mut writer, reader) = UnixStream::pair().unwrap();

    sockets
        .handle()
        .register(&reader, Interest::READABLE, |_| panic!("handler exploded"));
    writer.write_all(b"ping").unwrap();

    let mut reason = sockets.wait(deadline(500)).unwrap();
    if reason == WakeReason::Woken {
        reason = sockets.wait(deadline(500)).unwrap();
    }

    assert_eq!(reason, WakeReason::Ready(1));
    assert_eq!(sockets.registered(), 0);

    // Data is still pending but nobody is listening any more.
    assert_eq!(sockets.wait(deadline(10)).unwrap(), WakeReason::Timeout);
}

#[test]
fn test_reregister_switches_interest() {
    let mut sockets = PollSockets::new().unwrap();
    sockets.initialize().unwrap();
    let (_writer, reader) = UnixStream::pair().unwrap();

    let (sender, receiver) = mpsc::channel();
    let handle = sockets.handle();
    let token = handle.register(&reader, Interest::READABLE, move |event: Event| {
        let _ = sender.send(event);
    });

    sockets.wait(deadline(10)).unwrap();
    assert!(receiver.try_recv().is_err(), "nothing to read yet");

    // An empty socket buffer is immediately writable.
    handle.reregister(token, Interest::WRITABLE);
    sockets.wait(deadline(10)).unwrap();

    let mut reason = sockets.wait(deadline(500)).unwrap();
    while reason == WakeReason::Woken {
        reason = sockets.wait(deadline(500)).unwrap();
    }
    assert!(matches!(reason, WakeReason::Ready(_)));

    let event = receiver.try_recv().unwrap();
    assert_eq!(event.token, token);
    assert!(event.writable);
}

#[test]
fn test_shutdown_releases_registrations() {
    let mut sockets = PollSockets::new().unwrap();
    sockets.initialize().unwrap();
    let (_a, b) = UnixStream::pair().unwrap();
    let (_c, d) = UnixStream::pair().unwrap();

    let handle = sockets.handle();
    handle.register(&b, Interest::READABLE, |_| {});
    sockets.wait(deadline(10)).unwrap();

    // Still queued when the source shuts down.
    handle.register(&d, Interest::READABLE, |_| {});

    sockets.shutdown().unwrap();
    assert_eq!(sockets.registered(), 0);

    sockets.initialize().unwrap();
    assert_eq!(sockets.wait(deadline(10)).unwrap(), WakeReason::Timeout);
    assert_eq!(sockets.registered(), 0);
}

#[tickloop::test]
fn test_echo_through_running_loop(event_loop: &DefaultLoop) {
    let (mut client, server) = UnixStream::pair().unwrap();
    server.set_nonblocking(true).unwrap();

    let mut server_side = server.try_clone().unwrap();
    let token = event_loop
        .sockets()
        .register(&server, Interest::READABLE, move |_| {
            let mut buf = [0u8; 64];
            match server_side.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => server_side.write_all(&buf[..n]).unwrap(),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => panic!("read failed: {e}"),
            }
        });

    client
        .set_read_timeout(Some(Duration::from_secs(1)))
        .unwrap();
    client.write_all(b"hello").unwrap();

    let mut reply = [0u8; 5];
    client.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"hello");

    event_loop.sockets().deregister(token);
}
