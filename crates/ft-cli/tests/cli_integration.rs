//! CLI integration tests
//!
//! Tests the fantail CLI using assert_cmd. The remote-tail mode is
//! exercised end to end over real process stdio.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

use ft_protocol::{Message, MessageCodec, SeekWhence, TailRequest};

fn fantail() -> Command {
    Command::cargo_bin("fantail")
        .expect("Failed to locate fantail binary - ensure it's built before running tests")
}

#[test]
fn test_cli_help() {
    fantail()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fantail"))
        .stdout(predicate::str::contains("Distributed tail over SSH"));
}

#[test]
fn test_cli_version() {
    fantail()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fantail"));
}

#[test]
fn test_cli_requires_path() {
    fantail()
        .args(["--host", "h1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--path"));
}

#[test]
fn test_cli_host_and_hosts_stdin_conflict() {
    fantail()
        .args(["--host", "h1", "--hosts-stdin", "--path", "/var/log/a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_cli_rejects_bad_seek_whence() {
    fantail()
        .args(["--path", "/var/log/a", "--seek-whence", "middle"])
        .assert()
        .failure();
}

#[test]
fn test_cli_missing_explicit_config_fails() {
    fantail()
        .args([
            "--path",
            "/var/log/a",
            "--config",
            "/nonexistent/fantail.toml",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

/// Encode a request frame the way the controller does
fn request_frame(request: TailRequest) -> Vec<u8> {
    use tokio_util::codec::Encoder;

    let mut codec = MessageCodec::new();
    let mut buf = bytes::BytesMut::new();
    codec
        .encode(Message::Request(request), &mut buf)
        .expect("encode request");
    buf.to_vec()
}

#[test]
fn test_remote_tail_streams_file_over_stdio() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "one\ntwo\n").unwrap();
    file.flush().unwrap();

    let mut request = TailRequest::new(vec![file.path().to_path_buf()]);
    request.seek_whence = SeekWhence::Start;
    request.follow = false;

    let output = fantail()
        .arg("remote-tail")
        .write_stdin(request_frame(request))
        .assert()
        .success()
        .get_output()
        .clone();

    // Decode the framed stdout and check the records
    use tokio_util::codec::Decoder;
    let mut codec = MessageCodec::new();
    let mut buf = bytes::BytesMut::from(&output.stdout[..]);

    let mut payloads = Vec::new();
    while let Some(message) = codec.decode(&mut buf).expect("decode event") {
        match message {
            Message::Line(record) => payloads.push(record.payload),
            other => panic!("unexpected event: {:?}", other),
        }
    }
    assert_eq!(payloads, vec![&b"one\n"[..], &b"two\n"[..]]);
}

#[test]
fn test_remote_tail_without_request_fails() {
    fantail()
        .arg("remote-tail")
        .write_stdin(Vec::new())
        .assert()
        .failure()
        .stderr(predicate::str::contains("request"));
}
