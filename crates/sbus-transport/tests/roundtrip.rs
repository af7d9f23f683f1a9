#![cfg(unix)]

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::OwnedFd;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;

use sbus_frame::{HEADER_SIZE, MAX_MSG_LENGTH};
use sbus_transport::{send, Channel, ErrorKind, LogContext, LogLevel, Sender};

const NO_FDS: &[OwnedFd] = &[];

fn unique_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "sbus-it-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn file_with(dir: &std::path::Path, name: &str, content: &str) -> File {
    let path = dir.join(name);
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file
}

fn read_all(fd: OwnedFd) -> String {
    let mut file = File::from(fd);
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}

#[test]
fn command_with_one_descriptor_round_trips() {
    let dir = unique_dir("one-fd");
    let sock_path = dir.join("test.sbus");
    let log = LogContext::start(LogLevel::Debug, "it");
    let mut channel = Channel::create(&sock_path, log.clone()).unwrap();

    let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o777);

    let file = file_with(&dir, "data.txt", "hello through the bus");
    Sender::new(log)
        .send(&sock_path, &[&file], br#"{"a":1}"#, br#"{"cmd":"run"}"#)
        .unwrap();

    channel.wait_readable().unwrap();
    let message = channel.recv().unwrap();
    assert_eq!(message.n_files(), 1);
    assert_eq!(message.metadata.as_ref(), br#"{"a":1}"#);
    assert_eq!(message.payload.as_ref(), br#"{"cmd":"run"}"#);

    let (fds, _, _) = message.into_parts();
    let fd = fds.into_iter().next().unwrap();
    assert_eq!(read_all(fd), "hello through the bus");

    assert!(channel.remove().unwrap());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn descriptor_order_is_preserved() {
    let dir = unique_dir("order");
    let sock_path = dir.join("order.sbus");
    let mut channel = Channel::create(&sock_path, LogContext::disabled()).unwrap();

    let files: Vec<File> = (0..5)
        .map(|i| file_with(&dir, &format!("f{i}"), &format!("file-{i}")))
        .collect();
    let refs: Vec<&File> = files.iter().collect();
    send(&sock_path, refs.as_slice(), b"{}", b"{}").unwrap();

    let message = channel.recv().unwrap();
    assert_eq!(message.n_files(), 5);
    for (i, fd) in message.descriptors.into_iter().enumerate() {
        assert_eq!(read_all(fd), format!("file-{i}"));
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn messages_without_descriptors_round_trip() {
    let dir = unique_dir("no-fd");
    let sock_path = dir.join("nofd.sbus");
    let mut channel = Channel::create(&sock_path, LogContext::disabled()).unwrap();

    send(&sock_path, NO_FDS, br#"{"kind":"ping"}"#, b"").unwrap();

    let message = channel.recv().unwrap();
    assert!(message.descriptors.is_empty());
    assert_eq!(message.metadata.as_ref(), br#"{"kind":"ping"}"#);
    assert!(message.payload.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn oversized_message_is_truncation_and_channel_recovers() {
    let dir = unique_dir("trunc");
    let sock_path = dir.join("trunc.sbus");
    let mut channel = Channel::create(&sock_path, LogContext::disabled()).unwrap();

    let big = vec![b'x'; 5000];
    send(&sock_path, NO_FDS, b"{}", &big).unwrap();
    send(&sock_path, NO_FDS, b"{}", b"after").unwrap();

    let err = channel.recv().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncation);

    let message = channel.recv().unwrap();
    assert_eq!(message.payload.as_ref(), b"after");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn frame_of_exactly_max_length_is_accepted() {
    let dir = unique_dir("edge");
    let sock_path = dir.join("edge.sbus");
    let mut channel = Channel::create(&sock_path, LogContext::disabled()).unwrap();

    // 12-byte header + 2 bytes of metadata + payload.
    let fits = vec![b'x'; MAX_MSG_LENGTH - HEADER_SIZE - 2];
    let over = vec![b'x'; MAX_MSG_LENGTH - HEADER_SIZE - 1];
    send(&sock_path, NO_FDS, b"{}", &fits).unwrap();
    send(&sock_path, NO_FDS, b"{}", &over).unwrap();

    let message = channel.recv().unwrap();
    assert_eq!(message.payload.len(), 4082);

    let err = channel.recv().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncation);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn raw_garbage_is_protocol_violation() {
    let dir = unique_dir("garbage");
    let sock_path = dir.join("garbage.sbus");
    let mut channel = Channel::create(&sock_path, LogContext::disabled()).unwrap();

    let raw = UnixDatagram::unbound().unwrap();
    let mut header = Vec::new();
    header.extend_from_slice(&(-1i32).to_ne_bytes());
    header.extend_from_slice(&0i32.to_ne_bytes());
    header.extend_from_slice(&0i32.to_ne_bytes());
    raw.send_to(&header, &sock_path).unwrap();

    let err = channel.recv().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn concurrent_senders_deliver_every_message_once() {
    let dir = unique_dir("concurrent");
    let sock_path = dir.join("many.sbus");
    let mut channel = Channel::create(&sock_path, LogContext::disabled()).unwrap();

    const SENDERS: usize = 16;
    let handles: Vec<_> = (0..SENDERS)
        .map(|i| {
            let path = sock_path.clone();
            std::thread::spawn(move || {
                let payload = format!(r#"{{"sender":{i}}}"#);
                send(&path, NO_FDS, b"{}", payload.as_bytes()).unwrap();
            })
        })
        .collect();

    // The kernel datagram queue is short; senders block until we drain it.
    let mut seen = HashSet::new();
    for _ in 0..SENDERS {
        let message = channel.recv().unwrap();
        let payload = String::from_utf8(message.payload.to_vec()).unwrap();
        assert!(seen.insert(payload), "message delivered twice");
    }
    for handle in handles {
        handle.join().unwrap();
    }
    let expected: HashSet<String> = (0..SENDERS)
        .map(|i| format!(r#"{{"sender":{i}}}"#))
        .collect();
    assert_eq!(seen, expected);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_after_channel_removed_fails() {
    let dir = unique_dir("gone");
    let sock_path = dir.join("gone.sbus");
    let channel = Channel::create(&sock_path, LogContext::disabled()).unwrap();
    assert!(channel.remove().unwrap());

    let err = send(&sock_path, NO_FDS, b"{}", b"{}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn dropped_channel_leaves_file_but_refuses_sends() {
    let dir = unique_dir("dropped");
    let sock_path = dir.join("dropped.sbus");
    drop(Channel::create(&sock_path, LogContext::disabled()).unwrap());
    assert!(sock_path.exists());

    let err = send(&sock_path, NO_FDS, b"{}", b"{}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);

    let _ = std::fs::remove_dir_all(&dir);
}
